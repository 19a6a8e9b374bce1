//! Target description scanning.
//!
//! Stubs describe their register file in `target.xml` (fetched via
//! `qXfer:features:read`). This module extracts the `<reg .../>` table —
//! enough to resolve a register name like `cr3` to the number used by `p`
//! packets — without pulling in a full XML parser.

/// One register advertised by the target description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInfo {
    pub name: String,
    /// Register number for `p`/`P` packets.
    pub number: u32,
    pub bitsize: u32,
}

/// Scan a target description document for `<reg>` elements.
///
/// Register numbers follow GDB's rules: an explicit `regnum` attribute
/// resets the counter, otherwise each register takes the next number.
/// Feeding the concatenation of `target.xml` and its included documents
/// (in order) therefore yields the stub's numbering.
pub fn scan_registers(xml: &str) -> Vec<RegisterInfo> {
    let mut registers = Vec::new();
    let mut next_number = 0u32;
    let mut rest = xml;

    while let Some(pos) = rest.find("<reg ") {
        rest = &rest[pos..];
        let Some(end) = rest.find('>') else { break };
        let tag = &rest[..end];

        if let Some(explicit) = attribute(tag, "regnum").and_then(|v| v.parse().ok()) {
            next_number = explicit;
        }
        if let Some(name) = attribute(tag, "name") {
            let bitsize = attribute(tag, "bitsize")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            registers.push(RegisterInfo {
                name: name.to_string(),
                number: next_number,
                bitsize,
            });
        }
        next_number += 1;
        rest = &rest[end..];
    }
    registers
}

/// `href` values of `<xi:include>` elements, in document order.
pub fn include_hrefs(xml: &str) -> Vec<String> {
    let mut hrefs = Vec::new();
    let mut rest = xml;
    while let Some(pos) = rest.find("<xi:include") {
        rest = &rest[pos..];
        let Some(end) = rest.find('>') else { break };
        if let Some(href) = attribute(&rest[..end], "href") {
            hrefs.push(href.to_string());
        }
        rest = &rest[end..];
    }
    hrefs
}

/// Value of a double-quoted attribute inside a single tag.
fn attribute<'a>(tag: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!(" {key}=\"");
    let start = tag.find(&pattern)? + pattern.len();
    let rest = &tag[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}
