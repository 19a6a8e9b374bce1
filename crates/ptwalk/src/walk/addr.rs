//! Virtual address decomposition.

use serde::Serialize;

use super::Level;

/// The four 9-bit table indices and 12-bit page offset of a virtual
/// address under 4-level paging.
///
/// Bit layout: pml4 = 47:39, pdpt = 38:30, pd = 29:21, pt = 20:12,
/// offset = 11:0. Bits 63:48 are ignored; canonicality is not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagingIndices {
    pub pml4: u16,
    pub pdpt: u16,
    pub pd: u16,
    pub pt: u16,
    pub offset: u16,
}

impl PagingIndices {
    /// Decompose a virtual address. Pure and total.
    pub fn decompose(vaddr: u64) -> Self {
        PagingIndices {
            pml4: ((vaddr >> 39) & 0x1ff) as u16,
            pdpt: ((vaddr >> 30) & 0x1ff) as u16,
            pd: ((vaddr >> 21) & 0x1ff) as u16,
            pt: ((vaddr >> 12) & 0x1ff) as u16,
            offset: (vaddr & 0xfff) as u16,
        }
    }

    /// The table index used at a given level.
    pub fn index(&self, level: Level) -> u64 {
        let index = match level {
            Level::Pml4 => self.pml4,
            Level::Pdpt => self.pdpt,
            Level::Pd => self.pd,
            Level::Pt => self.pt,
        };
        u64::from(index)
    }
}
