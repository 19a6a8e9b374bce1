//! Page-table entry interpretation.

use serde::Serialize;
use std::fmt;

/// Page table entry flags.
pub const PTE_PRESENT: u64 = 1 << 0;
pub const PTE_PS: u64 = 1 << 7; // page size (huge page) bit

/// Base-address masks, bits 51 down to the alignment of the mapped unit.
const BASE_MASK_4K: u64 = 0x000f_ffff_ffff_f000; // bits 51:12
const BASE_MASK_2M: u64 = 0x000f_ffff_ffe0_0000; // bits 51:21
const BASE_MASK_1G: u64 = 0x000f_ffff_c000_0000; // bits 51:30

/// The four translation levels, in walk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Pml4,
    Pdpt,
    Pd,
    Pt,
}

impl Level {
    /// Walk order, PML4 first.
    pub const ALL: [Level; 4] = [Level::Pml4, Level::Pdpt, Level::Pd, Level::Pt];

    /// The page size a set PS bit maps at this level, if any. Only the
    /// PDPT (1 GiB) and PD (2 MiB) levels can map huge pages.
    pub fn huge_page_size(self) -> Option<super::PageSize> {
        match self {
            Level::Pdpt => Some(super::PageSize::Size1G),
            Level::Pd => Some(super::PageSize::Size2M),
            Level::Pml4 | Level::Pt => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Pml4 => "PML4",
            Level::Pdpt => "PDPT",
            Level::Pd => "PD",
            Level::Pt => "PT",
        };
        f.write_str(label)
    }
}

/// A raw 8-byte table entry, interpreted.
///
/// When `present` is clear no other field is meaningful. `base_address`
/// is the next table's base for a non-huge entry, or the page frame base
/// (1 GiB / 2 MiB aligned) when `huge_page` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedEntry {
    pub present: bool,
    pub huge_page: bool,
    pub base_address: u64,
}

impl DecodedEntry {
    /// Interpret a raw entry read at the given level.
    ///
    /// The PS bit is honored only where the hardware honors it: PDPT and
    /// PD. At PML4 it is reserved and at PT it is the PAT bit, so both
    /// are ignored here.
    pub fn interpret(raw: u64, level: Level) -> DecodedEntry {
        let present = raw & PTE_PRESENT != 0;
        let huge_page = level.huge_page_size().is_some() && raw & PTE_PS != 0;
        let base_address = match level {
            Level::Pdpt if huge_page => raw & BASE_MASK_1G,
            Level::Pd if huge_page => raw & BASE_MASK_2M,
            _ => raw & BASE_MASK_4K,
        };
        DecodedEntry { present, huge_page, base_address }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::PageSize;

    #[test]
    fn test_present_bit() {
        assert!(DecodedEntry::interpret(0x1, Level::Pml4).present);
        assert!(!DecodedEntry::interpret(0x0, Level::Pml4).present);
        // Bit 12 set, bit 0 clear: still not present.
        assert!(!DecodedEntry::interpret(0x1000, Level::Pt).present);
    }

    #[test]
    fn test_base_round_trip() {
        // A present entry pointing at a 4 KiB-aligned frame decodes back
        // to that frame at every level.
        let frame = 0x1234_5600_0000u64;
        for level in Level::ALL {
            let decoded = DecodedEntry::interpret(frame | PTE_PRESENT, level);
            assert!(decoded.present);
            assert_eq!(decoded.base_address, frame, "{level}");
        }
    }

    #[test]
    fn test_base_mask_strips_flag_bits() {
        // Accessed/dirty/NX and friends never leak into the base address.
        let raw = 0x8000_0000_0005_f067u64; // NX + flags + frame 0x5f000
        let decoded = DecodedEntry::interpret(raw, Level::Pt);
        assert_eq!(decoded.base_address, 0x5f000);
    }

    #[test]
    fn test_huge_bit_only_at_pdpt_and_pd() {
        let raw = PTE_PRESENT | PTE_PS;
        assert!(!DecodedEntry::interpret(raw, Level::Pml4).huge_page);
        assert!(DecodedEntry::interpret(raw, Level::Pdpt).huge_page);
        assert!(DecodedEntry::interpret(raw, Level::Pd).huge_page);
        assert!(!DecodedEntry::interpret(raw, Level::Pt).huge_page);
    }

    #[test]
    fn test_1g_base_mask() {
        let raw = 0x0000_0040_1234_5067u64 | PTE_PS | PTE_PRESENT;
        let decoded = DecodedEntry::interpret(raw, Level::Pdpt);
        assert!(decoded.huge_page);
        // Low 30 bits cleared.
        assert_eq!(decoded.base_address, 0x0000_0040_0000_0000);
    }

    #[test]
    fn test_2m_base_mask() {
        let raw = 0x0000_0000_401f_5067u64 | PTE_PS | PTE_PRESENT;
        let decoded = DecodedEntry::interpret(raw, Level::Pd);
        assert!(decoded.huge_page);
        // Low 21 bits cleared.
        assert_eq!(decoded.base_address, 0x0000_0000_4000_0000);
    }

    #[test]
    fn test_huge_page_size_per_level() {
        assert_eq!(Level::Pml4.huge_page_size(), None);
        assert_eq!(Level::Pdpt.huge_page_size(), Some(PageSize::Size1G));
        assert_eq!(Level::Pd.huge_page_size(), Some(PageSize::Size2M));
        assert_eq!(Level::Pt.huge_page_size(), None);
    }

    #[test]
    fn test_level_labels() {
        let labels: Vec<String> = Level::ALL.iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, ["PML4", "PDPT", "PD", "PT"]);
    }
}
