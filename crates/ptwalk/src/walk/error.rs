//! Error types for address translation.

use thiserror::Error;

use super::walker::TranslationTrace;
use super::Level;
use crate::target::TargetError;

/// Why a translation stopped.
///
/// Every variant is terminal for the current call; nothing is retried.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The argument is neither `0x`-prefixed hex nor decimal.
    #[error("invalid address '{0}': expected a hexadecimal (0x...) or decimal value")]
    InvalidAddress(String),

    /// The table-base register could not be read from the target.
    #[error("failed to read the {name} register: {source}")]
    RegisterUnavailable {
        name: &'static str,
        #[source]
        source: TargetError,
    },

    /// A physical memory read failed at some level of the walk.
    #[error("failed to read the {level} entry at {address:#x}: {source}")]
    ReadFailed {
        level: Level,
        address: u64,
        #[source]
        source: TargetError,
    },

    /// The entry at some level has its present bit clear.
    #[error("{level} entry at {address:#x} is not present (raw entry {entry:#x})")]
    NotPresent { level: Level, address: u64, entry: u64 },
}

/// A failed translation, carrying whatever trace was accumulated before
/// the walk aborted so callers can render what was observed.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct TranslationFailure {
    #[source]
    pub error: TranslateError,
    pub trace: TranslationTrace,
}
