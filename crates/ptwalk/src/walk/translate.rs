//! Top-level translation entry point.
//!
//! `translate` owns the collaborator choreography around the walk: the
//! scoped physical-addressing-mode toggle, the CR3 read and argument
//! parsing. The core never prints; failures carry the partial trace back
//! to the caller for rendering.

use super::error::{TranslateError, TranslationFailure};
use super::walker::{walk, Translation, TranslationTrace};
use crate::target::Target;

/// Parse a virtual address argument: `0x`-prefixed hex or decimal.
///
/// Non-canonical addresses are accepted as ordinary input; the walk
/// simply ignores bits 63:48.
pub fn parse_address(raw: &str) -> Result<u64, TranslateError> {
    let trimmed = raw.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| TranslateError::InvalidAddress(raw.to_string()))
}

/// Scoped physical-addressing-mode acquisition.
///
/// The mode is enabled on construction and reverted on drop, so every
/// exit path of `translate` — early huge-page success, absent entry,
/// failed read, invalid argument — restores the target's state. Toggle
/// failures are logged, not propagated: a target that does not need the
/// mode (a raw dump) reports success, and a stub that rejects it would
/// fail the subsequent reads anyway.
struct PhysMemModeGuard<'a> {
    target: &'a dyn Target,
}

impl<'a> PhysMemModeGuard<'a> {
    fn enable(target: &'a dyn Target) -> Self {
        if let Err(e) = target.set_physical_addressing_mode(true) {
            tracing::warn!("failed to enable physical addressing mode: {e}");
        }
        PhysMemModeGuard { target }
    }
}

impl Drop for PhysMemModeGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.target.set_physical_addressing_mode(false) {
            tracing::warn!("failed to revert physical addressing mode: {e}");
        }
    }
}

/// Translate a textual virtual address against the target's current
/// address space.
///
/// On failure the partial trace accumulated before the abort rides along
/// in the [`TranslationFailure`].
pub fn translate(target: &dyn Target, raw_argument: &str) -> Result<Translation, TranslationFailure> {
    let _mode = PhysMemModeGuard::enable(target);

    let vaddr = parse_address(raw_argument).map_err(|error| TranslationFailure {
        error,
        trace: TranslationTrace::default(),
    })?;

    let cr3 = target.read_register("cr3").map_err(|source| TranslationFailure {
        error: TranslateError::RegisterUnavailable { name: "cr3", source },
        trace: TranslationTrace::default(),
    })?;
    tracing::debug!(cr3 = %format_args!("{cr3:#x}"), vaddr = %format_args!("{vaddr:#x}"), "starting walk");

    walk(target, cr3, vaddr)
}
