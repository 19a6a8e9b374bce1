//! RSP wire format: `$payload#ck` framing, escaping, run-length encoding
//! and the hex codec used by memory/register replies.

use crate::error::{RspError, RspResult};

/// Modulo-256 sum of the transmitted payload bytes (the escaped form).
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Frame a payload as `$payload#ck`, escaping `$`, `#` and `}`.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(payload.len());
    for &b in payload {
        if matches!(b, b'$' | b'#' | b'}') {
            escaped.push(b'}');
            escaped.push(b ^ 0x20);
        } else {
            escaped.push(b);
        }
    }

    let mut out = Vec::with_capacity(escaped.len() + 4);
    out.push(b'$');
    out.extend_from_slice(&escaped);
    out.push(b'#');
    let ck = checksum(&escaped);
    out.push(to_hex_digit(ck >> 4));
    out.push(to_hex_digit(ck & 0xf));
    out
}

/// Undo `}`-escaping and `*` run-length encoding in a received packet body.
///
/// RLE: `c*N` stands for `c` followed by `N - 29` further copies of `c`,
/// so `0* ` (space = 0x20) expands to `0000`.
pub fn decode_body(raw: &[u8]) -> RspResult<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'}' => {
                let escaped = raw
                    .get(i + 1)
                    .ok_or_else(|| RspError::Protocol("truncated escape sequence".into()))?;
                out.push(escaped ^ 0x20);
                i += 2;
            }
            b'*' => {
                let count = raw
                    .get(i + 1)
                    .ok_or_else(|| RspError::Protocol("truncated run-length sequence".into()))?;
                let repeated = *out
                    .last()
                    .ok_or_else(|| RspError::Protocol("run-length with no preceding byte".into()))?;
                let extra = count
                    .checked_sub(29)
                    .ok_or_else(|| RspError::Protocol("run-length count below 29".into()))?;
                out.extend(std::iter::repeat(repeated).take(extra as usize));
                i += 2;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Value of a single ASCII hex digit.
pub fn hex_value(digit: u8) -> RspResult<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => Err(RspError::InvalidHex(other)),
    }
}

/// Decode a hex string into raw bytes. Byte order is preserved as
/// transmitted (memory replies arrive in target memory order).
pub fn decode_hex(data: &[u8]) -> RspResult<Vec<u8>> {
    if data.len() % 2 != 0 {
        return Err(RspError::Protocol(format!(
            "odd-length hex reply ({} digits)",
            data.len()
        )));
    }
    data.chunks_exact(2)
        .map(|pair| Ok((hex_value(pair[0])? << 4) | hex_value(pair[1])?))
        .collect()
}

fn to_hex_digit(value: u8) -> u8 {
    match value {
        0..=9 => b'0' + value,
        _ => b'a' + value - 10,
    }
}
