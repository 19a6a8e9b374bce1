//! Synchronous RSP client over any `Read + Write` transport.
//!
//! The client speaks the subset of the protocol a memory inspector needs:
//! memory reads (`m`), single-register reads (`p`), target description
//! fetches (`qXfer:features:read`) and QEMU's physical-memory-mode set
//! packet. `QStartNoAckMode` is negotiated at connect time when the stub
//! supports it.

use crate::error::{RspError, RspResult};
use crate::packet;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

/// Chunk size requested per `qXfer` read.
const XFER_CHUNK: usize = 0xfff;

/// Retransmit attempts before giving up on a NAK-ing stub.
const MAX_RETRANSMITS: usize = 5;

/// A connected RSP client.
pub struct Client<T: Read + Write> {
    transport: T,
    /// True once `QStartNoAckMode` has been accepted by the stub.
    no_ack: bool,
    rx: Vec<u8>,
    rx_pos: usize,
}

impl Client<TcpStream> {
    /// Connect to a gdbstub over TCP (e.g. QEMU's `-s` endpoint).
    pub fn connect<A: ToSocketAddrs>(addr: A) -> RspResult<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Self::new(stream)
    }
}

impl<T: Read + Write> Client<T> {
    /// Wrap an established transport and negotiate no-ack mode.
    pub fn new(transport: T) -> RspResult<Self> {
        let mut client = Client {
            transport,
            no_ack: false,
            rx: Vec::new(),
            rx_pos: 0,
        };
        match client.query(b"QStartNoAckMode") {
            Ok(reply) if reply == b"OK" => {
                client.no_ack = true;
                tracing::debug!("no-ack mode negotiated");
            }
            Ok(_) | Err(RspError::Unsupported(_)) => {
                tracing::debug!("stub kept ack mode");
            }
            Err(e) => return Err(e),
        }
        Ok(client)
    }

    /// Read `length` bytes of memory starting at `address`.
    ///
    /// Bytes are returned in target memory order; callers assemble
    /// multi-byte values themselves (x86-64 entries are little-endian).
    pub fn read_memory(&mut self, address: u64, length: usize) -> RspResult<Vec<u8>> {
        let reply = self.query(format!("m{address:x},{length:x}").as_bytes())?;
        let bytes = packet::decode_hex(&reply)?;
        if bytes.len() != length {
            return Err(RspError::Protocol(format!(
                "short memory reply at {address:#x}: wanted {length} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    /// Read a single register by number. The reply is the register's raw
    /// bytes in target byte order.
    pub fn read_register(&mut self, regnum: u32) -> RspResult<Vec<u8>> {
        let reply = self.query(format!("p{regnum:x}").as_bytes())?;
        packet::decode_hex(&reply)
    }

    /// Fetch a `qXfer:features:read` annex (e.g. `target.xml`) in full.
    pub fn read_features(&mut self, annex: &str) -> RspResult<String> {
        let mut document = Vec::new();
        loop {
            let request =
                format!("qXfer:features:read:{annex}:{:x},{XFER_CHUNK:x}", document.len());
            let reply = self.query(request.as_bytes())?;
            match reply.split_first() {
                Some((b'm', data)) => document.extend_from_slice(data),
                Some((b'l', data)) => {
                    document.extend_from_slice(data);
                    break;
                }
                _ => {
                    return Err(RspError::Protocol(format!(
                        "unexpected qXfer reply for annex '{annex}'"
                    )))
                }
            }
        }
        String::from_utf8(document)
            .map_err(|_| RspError::Protocol(format!("annex '{annex}' is not valid UTF-8")))
    }

    /// Toggle QEMU's physical memory addressing mode
    /// (`Qqemu.PhyMemMode:1|0`). While enabled, `m` packets read physical
    /// rather than virtual memory.
    pub fn set_qemu_phys_mem_mode(&mut self, enabled: bool) -> RspResult<()> {
        let request = format!("Qqemu.PhyMemMode:{}", u8::from(enabled));
        let reply = self.query(request.as_bytes())?;
        if reply == b"OK" {
            Ok(())
        } else {
            Err(RspError::Protocol(format!(
                "unexpected reply '{}' to {request}",
                String::from_utf8_lossy(&reply)
            )))
        }
    }

    /// Recover the underlying transport, dropping any buffered input.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send a request and return the decoded reply body.
    ///
    /// Empty replies become [`RspError::Unsupported`]; `E NN` replies become
    /// [`RspError::ErrorReply`].
    pub fn query(&mut self, payload: &[u8]) -> RspResult<Vec<u8>> {
        tracing::trace!(request = %String::from_utf8_lossy(payload), "rsp send");
        self.send_packet(payload)?;
        let reply = self.recv_packet()?;
        tracing::trace!(reply = %String::from_utf8_lossy(&reply), "rsp recv");

        if reply.is_empty() {
            return Err(RspError::Unsupported(
                String::from_utf8_lossy(payload).into_owned(),
            ));
        }
        if reply.len() == 3 && reply[0] == b'E' && reply[1..].iter().all(u8::is_ascii_hexdigit) {
            let code = (packet::hex_value(reply[1])? << 4) | packet::hex_value(reply[2])?;
            return Err(RspError::ErrorReply(code));
        }
        Ok(reply)
    }

    fn send_packet(&mut self, payload: &[u8]) -> RspResult<()> {
        let framed = packet::frame(payload);
        for _ in 0..MAX_RETRANSMITS {
            self.transport.write_all(&framed)?;
            self.transport.flush()?;
            if self.no_ack {
                return Ok(());
            }
            match self.read_byte()? {
                b'+' => return Ok(()),
                b'-' => continue,
                _ => {
                    // Stub skipped the ack (already in no-ack mode); the
                    // byte belongs to the reply.
                    self.rx_pos -= 1;
                    return Ok(());
                }
            }
        }
        Err(RspError::Protocol(format!(
            "stub rejected packet {} times",
            MAX_RETRANSMITS
        )))
    }

    fn recv_packet(&mut self) -> RspResult<Vec<u8>> {
        loop {
            // Sync to the packet start, skipping stray acks/notifications.
            while self.read_byte()? != b'$' {}

            let mut body = Vec::new();
            loop {
                match self.read_byte()? {
                    b'#' => break,
                    b => body.push(b),
                }
            }
            let expected =
                (packet::hex_value(self.read_byte()?)? << 4) | packet::hex_value(self.read_byte()?)?;
            let computed = packet::checksum(&body);

            if computed != expected {
                if self.no_ack {
                    return Err(RspError::Checksum { expected, computed });
                }
                // NAK and wait for the retransmission.
                self.transport.write_all(b"-")?;
                self.transport.flush()?;
                continue;
            }
            if !self.no_ack {
                self.transport.write_all(b"+")?;
                self.transport.flush()?;
            }
            return packet::decode_body(&body);
        }
    }

    fn read_byte(&mut self) -> RspResult<u8> {
        if self.rx_pos >= self.rx.len() {
            let mut buf = [0u8; 4096];
            let n = self.transport.read(&mut buf)?;
            if n == 0 {
                return Err(RspError::Disconnected);
            }
            self.rx.clear();
            self.rx.extend_from_slice(&buf[..n]);
            self.rx_pos = 0;
        }
        let b = self.rx[self.rx_pos];
        self.rx_pos += 1;
        Ok(b)
    }
}
