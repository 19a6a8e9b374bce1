//! Target abstraction: where registers and physical memory come from.
//!
//! The walk core only ever sees this trait. Implementations cover a live
//! gdbstub ([`gdb::GdbTarget`]) and a raw memory dump ([`dump::DumpTarget`]).

use thiserror::Error;

pub mod dump;
pub mod gdb;

pub use dump::DumpTarget;
pub use gdb::GdbTarget;

/// Faults raised by a target while servicing collaborator calls.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A remote-protocol failure from the gdbstub.
    #[error(transparent)]
    Remote(#[from] gdbrsp::RspError),

    /// The target does not expose the requested register.
    #[error("register '{0}' is not exposed by this target")]
    UnknownRegister(String),

    /// A physical read fell outside the target's memory.
    #[error("physical read of {length} bytes at {address:#x} is outside the {size:#x}-byte image")]
    OutOfRange { address: u64, length: usize, size: u64 },
}

/// A machine whose translation state can be inspected.
///
/// All methods take `&self`; implementations use interior mutability where
/// a connection has to be driven. Reads are blocking and are not retried
/// by callers — any failure aborts the walk in progress.
pub trait Target {
    /// Read a register by name (e.g. `cr3`) as a 64-bit value.
    fn read_register(&self, name: &str) -> Result<u64, TargetError>;

    /// Read `length` bytes of physical memory at `address`.
    fn read_physical(&self, address: u64, length: usize) -> Result<Vec<u8>, TargetError>;

    /// Switch the target's memory accessor between virtual and physical
    /// addressing. Targets that are natively physical treat this as a
    /// no-op and report success.
    fn set_physical_addressing_mode(&self, enabled: bool) -> Result<(), TargetError>;
}
