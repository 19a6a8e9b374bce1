//! Live target: a gdbstub reached over TCP (QEMU's `-s` endpoint).
//!
//! Physical memory reads go through `m` packets while QEMU's
//! `Qqemu.PhyMemMode` is enabled; registers are resolved by name against
//! the stub's target description and read with `p` packets.

use gdbrsp::{features, Client, RegisterInfo};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;

use super::{Target, TargetError};

/// A connected gdbstub target.
pub struct GdbTarget<T: Read + Write = TcpStream> {
    client: Mutex<Client<T>>,
    /// Register table from the stub's target description, keyed by name.
    registers: HashMap<String, RegisterInfo>,
}

impl GdbTarget<TcpStream> {
    /// Connect to a gdbstub endpoint such as `localhost:1234`.
    pub fn connect(addr: &str) -> Result<Self, TargetError> {
        let client = Client::connect(addr).map_err(TargetError::Remote)?;
        let target = Self::with_client(client);
        tracing::info!(
            addr,
            registers = target.registers.len(),
            "connected to gdbstub"
        );
        Ok(target)
    }
}

impl<T: Read + Write> GdbTarget<T> {
    /// Wrap an already-negotiated client and load its register table.
    pub fn with_client(mut client: Client<T>) -> Self {
        let registers = load_registers(&mut client);
        GdbTarget {
            client: Mutex::new(client),
            registers,
        }
    }
}

/// Fetch `target.xml` plus its includes and scan the register table.
///
/// A stub without target descriptions yields an empty table; register
/// reads against it fail with `UnknownRegister` rather than guessed
/// numbers.
fn load_registers<T: Read + Write>(client: &mut Client<T>) -> HashMap<String, RegisterInfo> {
    let mut document = match client.read_features("target.xml") {
        Ok(xml) => xml,
        Err(e) => {
            tracing::warn!("target description unavailable: {e}");
            return HashMap::new();
        }
    };
    for href in features::include_hrefs(&document) {
        match client.read_features(&href) {
            Ok(included) => document.push_str(&included),
            Err(e) => tracing::warn!(href, "included description unavailable: {e}"),
        }
    }

    features::scan_registers(&document)
        .into_iter()
        .map(|reg| (reg.name.clone(), reg))
        .collect()
}

impl<T: Read + Write> Target for GdbTarget<T> {
    fn read_register(&self, name: &str) -> Result<u64, TargetError> {
        let reg = self
            .registers
            .get(name)
            .ok_or_else(|| TargetError::UnknownRegister(name.to_string()))?;
        let bytes = self.client.lock().read_register(reg.number)?;
        let mut word = [0u8; 8];
        let n = bytes.len().min(8);
        word[..n].copy_from_slice(&bytes[..n]);
        Ok(u64::from_le_bytes(word))
    }

    fn read_physical(&self, address: u64, length: usize) -> Result<Vec<u8>, TargetError> {
        Ok(self.client.lock().read_memory(address, length)?)
    }

    fn set_physical_addressing_mode(&self, enabled: bool) -> Result<(), TargetError> {
        Ok(self.client.lock().set_qemu_phys_mem_mode(enabled)?)
    }
}
