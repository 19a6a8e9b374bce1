//! Minimal GDB Remote Serial Protocol (RSP) client.
//!
//! Speaks to any gdbstub over a `Read + Write` transport (typically a TCP
//! connection to QEMU's `-s` endpoint) and covers the operations a memory
//! inspector needs:
//!
//! - `m` memory reads and `p` single-register reads
//! - `qXfer:features:read` target description fetches, plus a scanner that
//!   resolves register names to `p`-packet numbers
//! - QEMU's `Qqemu.PhyMemMode` toggle, which switches `m` packets from
//!   virtual to physical addressing
//! - `$...#ck` framing with escaping, run-length-encoded replies and
//!   `QStartNoAckMode` negotiation
//!
//! # Example
//!
//! ```rust,ignore
//! use gdbrsp::Client;
//!
//! let mut client = Client::connect("localhost:1234")?;
//! client.set_qemu_phys_mem_mode(true)?;
//! let entry = client.read_memory(0x1ad000, 8)?;
//! client.set_qemu_phys_mem_mode(false)?;
//! ```

pub mod client;
pub mod error;
pub mod features;
pub mod packet;

// Re-export key types at crate root.
pub use client::Client;
pub use error::{RspError, RspResult};
pub use features::{include_hrefs, scan_registers, RegisterInfo};
