//! The 4-level page-table walk.
//!
//! Linear control flow per request: PML4 -> PDPT -> PD -> PT, reading one
//! 8-byte entry per level from the target's physical memory. A set PS bit
//! at the PDPT or PD level terminates the walk early with a 1 GiB or
//! 2 MiB mapping; an absent entry or a failed read aborts it. Every level
//! actually visited leaves exactly one record in the trace, including the
//! level at which the walk failed.

use serde::Serialize;
use std::fmt;

use super::addr::PagingIndices;
use super::entry::{DecodedEntry, Level};
use super::error::{TranslateError, TranslationFailure};
use crate::target::Target;

/// Table entries are 8 bytes under 4-level paging.
const ENTRY_SIZE: u64 = 8;

/// CR3 carries the PML4 base in bits 51:12; the low bits hold flags.
const TABLE_BASE_MASK: u64 = 0x000f_ffff_ffff_f000;

/// Size of the page a translation resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageSize {
    #[serde(rename = "4kib")]
    Size4K,
    #[serde(rename = "2mib")]
    Size2M,
    #[serde(rename = "1gib")]
    Size1G,
}

impl PageSize {
    pub fn bytes(self) -> u64 {
        match self {
            PageSize::Size4K => 0x1000,
            PageSize::Size2M => 0x20_0000,
            PageSize::Size1G => 0x4000_0000,
        }
    }

    /// Mask selecting the offset-within-page bits of a virtual address.
    pub fn offset_mask(self) -> u64 {
        self.bytes() - 1
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PageSize::Size4K => "4 KiB",
            PageSize::Size2M => "2 MiB",
            PageSize::Size1G => "1 GiB",
        };
        f.write_str(label)
    }
}

/// One visited level of a walk.
///
/// `raw_entry` is `None` only when the read itself failed; the record
/// still pins down which table and slot were being dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    pub level: Level,
    pub table_base: u64,
    pub entry_address: u64,
    pub raw_entry: Option<u64>,
}

/// Append-only record of the levels a walk visited, in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranslationTrace(Vec<TraceRecord>);

impl TranslationTrace {
    pub fn records(&self) -> &[TraceRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, record: TraceRecord) {
        self.0.push(record);
    }
}

/// A completed translation.
#[derive(Debug, Clone, Serialize)]
pub struct Translation {
    pub cr3: u64,
    pub virtual_address: u64,
    pub indices: PagingIndices,
    pub physical_address: u64,
    pub page_size: PageSize,
    pub trace: TranslationTrace,
}

/// Walk the page tables rooted at `cr3` for `vaddr`.
///
/// Reads physical memory through `target`; performs no other collaborator
/// calls. The caller is responsible for having the target in physical
/// addressing mode.
pub fn walk(
    target: &dyn Target,
    cr3: u64,
    vaddr: u64,
) -> Result<Translation, TranslationFailure> {
    let indices = PagingIndices::decompose(vaddr);
    let mut trace = TranslationTrace::default();
    let mut table_base = cr3 & TABLE_BASE_MASK;

    for level in Level::ALL {
        let entry_address = table_base + indices.index(level) * ENTRY_SIZE;

        let raw = match read_entry(target, entry_address) {
            Ok(raw) => raw,
            Err(source) => {
                trace.push(TraceRecord {
                    level,
                    table_base,
                    entry_address,
                    raw_entry: None,
                });
                return Err(TranslationFailure {
                    error: TranslateError::ReadFailed { level, address: entry_address, source },
                    trace,
                });
            }
        };
        trace.push(TraceRecord {
            level,
            table_base,
            entry_address,
            raw_entry: Some(raw),
        });

        let decoded = DecodedEntry::interpret(raw, level);
        if !decoded.present {
            return Err(TranslationFailure {
                error: TranslateError::NotPresent { level, address: entry_address, entry: raw },
                trace,
            });
        }

        if decoded.huge_page {
            if let Some(page_size) = level.huge_page_size() {
                // Remaining levels are never visited.
                let physical_address = decoded.base_address + (vaddr & page_size.offset_mask());
                return Ok(Translation {
                    cr3,
                    virtual_address: vaddr,
                    indices,
                    physical_address,
                    page_size,
                    trace,
                });
            }
        }

        if level == Level::Pt {
            let physical_address = decoded.base_address + u64::from(indices.offset);
            return Ok(Translation {
                cr3,
                virtual_address: vaddr,
                indices,
                physical_address,
                page_size: PageSize::Size4K,
                trace,
            });
        }

        table_base = decoded.base_address;
    }

    // Level::ALL ends at Pt, which always returns above.
    unreachable!("walk fell through all four levels")
}

/// Read an 8-byte little-endian entry from physical memory.
fn read_entry(target: &dyn Target, address: u64) -> Result<u64, crate::target::TargetError> {
    let bytes = target.read_physical(address, ENTRY_SIZE as usize)?;
    let mut word = [0u8; 8];
    let n = bytes.len().min(8);
    word[..n].copy_from_slice(&bytes[..n]);
    Ok(u64::from_le_bytes(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::tests::MockTarget;
    use crate::walk::entry::{PTE_PRESENT, PTE_PS};

    /// vaddr with indices pml4=1, pdpt=2, pd=3, pt=4, offset=0x123.
    const VADDR: u64 = (1 << 39) | (2 << 30) | (3 << 21) | (4 << 12) | 0x123;
    const CR3: u64 = 0x1000;

    /// Tables at 0x2000/0x3000/0x4000, data frame at 0x5000.
    fn mapped_target() -> MockTarget {
        let target = MockTarget::new(0x10000);
        target.write_u64(0x1000 + 1 * 8, 0x2000 | PTE_PRESENT);
        target.write_u64(0x2000 + 2 * 8, 0x3000 | PTE_PRESENT);
        target.write_u64(0x3000 + 3 * 8, 0x4000 | PTE_PRESENT);
        target.write_u64(0x4000 + 4 * 8, 0x5000 | PTE_PRESENT);
        target
    }

    #[test]
    fn test_full_4k_walk() {
        let target = mapped_target();
        let translation = walk(&target, CR3, VADDR).unwrap();

        assert_eq!(translation.physical_address, 0x5123);
        assert_eq!(translation.page_size, PageSize::Size4K);
        assert_eq!(translation.trace.len(), 4);

        let records = translation.trace.records();
        assert_eq!(records[0].level, Level::Pml4);
        assert_eq!(records[0].table_base, 0x1000);
        assert_eq!(records[0].entry_address, 0x1008);
        assert_eq!(records[0].raw_entry, Some(0x2001));
        assert_eq!(records[3].level, Level::Pt);
        assert_eq!(records[3].entry_address, 0x4020);
    }

    #[test]
    fn test_cr3_low_bits_masked() {
        let target = mapped_target();
        // PCID/flag bits in CR3 must not shift the PML4 base.
        let translation = walk(&target, CR3 | 0x19, VADDR).unwrap();
        assert_eq!(translation.physical_address, 0x5123);
        assert_eq!(translation.trace.records()[0].table_base, 0x1000);
    }

    #[test]
    fn test_1g_huge_page_short_circuits() {
        let target = MockTarget::new(0x10000);
        target.write_u64(0x1000 + 1 * 8, 0x2000 | PTE_PRESENT);
        // Frame base 1 GiB-aligned; on a 1 GiB page the PD index bits of
        // the vaddr land inside the page offset.
        target.write_u64(0x2000 + 2 * 8, 0x4000_0000 | PTE_PS | PTE_PRESENT);

        let translation = walk(&target, CR3, VADDR).unwrap();
        assert_eq!(translation.page_size, PageSize::Size1G);
        assert_eq!(
            translation.physical_address,
            0x4000_0000 + (VADDR & 0x3fff_ffff)
        );
        assert_eq!(translation.trace.len(), 2);
        // PD and PT were never queried.
        assert_eq!(target.reads_at(0x3000..0x4000), 0);
        assert_eq!(target.reads_at(0x4000..0x5000), 0);
    }

    #[test]
    fn test_1g_offset_within_gigabyte() {
        let target = MockTarget::new(0x10000);
        let vaddr = (1u64 << 39) | (2 << 30) | 0x1234_5678;
        target.write_u64(0x1000 + 1 * 8, 0x2000 | PTE_PRESENT);
        target.write_u64(0x2000 + 2 * 8, 0x8000_0000 | PTE_PS | PTE_PRESENT);

        let translation = walk(&target, CR3, vaddr).unwrap();
        assert_eq!(translation.physical_address, 0x8000_0000 + 0x1234_5678);
    }

    #[test]
    fn test_2m_huge_page_short_circuits() {
        let target = MockTarget::new(0x10000);
        target.write_u64(0x1000 + 1 * 8, 0x2000 | PTE_PRESENT);
        target.write_u64(0x2000 + 2 * 8, 0x3000 | PTE_PRESENT);
        target.write_u64(0x3000 + 3 * 8, 0x20_0000 | PTE_PS | PTE_PRESENT);

        let translation = walk(&target, CR3, VADDR).unwrap();
        assert_eq!(translation.page_size, PageSize::Size2M);
        assert_eq!(
            translation.physical_address,
            0x20_0000 + (VADDR & 0x1f_ffff)
        );
        assert_eq!(translation.trace.len(), 3);
        // PT was never queried.
        assert_eq!(target.reads_at(0x4000..0x5000), 0);
    }

    #[test]
    fn test_absent_pd_aborts_with_partial_trace() {
        let target = MockTarget::new(0x10000);
        target.write_u64(0x1000 + 1 * 8, 0x2000 | PTE_PRESENT);
        target.write_u64(0x2000 + 2 * 8, 0x3000 | PTE_PRESENT);
        // PD entry left absent (zero).

        let failure = walk(&target, CR3, VADDR).unwrap_err();
        match failure.error {
            TranslateError::NotPresent { level, address, entry } => {
                assert_eq!(level, Level::Pd);
                assert_eq!(address, 0x3018);
                assert_eq!(entry, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(failure.trace.len(), 3);
        assert_eq!(target.reads_at(0x4000..0x5000), 0);
    }

    #[test]
    fn test_ps_bit_at_pt_is_not_huge() {
        let target = mapped_target();
        // PS at PT level is the PAT bit; the walk must still produce a
        // 4 KiB mapping with the low 12 bits masked off.
        target.write_u64(0x4000 + 4 * 8, 0x5000 | PTE_PS | PTE_PRESENT);
        let translation = walk(&target, CR3, VADDR).unwrap();
        assert_eq!(translation.page_size, PageSize::Size4K);
        assert_eq!(translation.physical_address, 0x5123);
    }

    #[test]
    fn test_read_failure_traced() {
        // CR3 points past the end of memory: the very first read fails.
        let target = MockTarget::new(0x10000);
        let failure = walk(&target, 0x100000, VADDR).unwrap_err();
        match &failure.error {
            TranslateError::ReadFailed { level, address, .. } => {
                assert_eq!(*level, Level::Pml4);
                assert_eq!(*address, 0x100008);
            }
            other => panic!("unexpected error: {other}"),
        }
        // The failed level is still traced, with no raw entry.
        assert_eq!(failure.trace.len(), 1);
        assert_eq!(failure.trace.records()[0].raw_entry, None);
        assert_eq!(failure.trace.records()[0].entry_address, 0x100008);
    }

    #[test]
    fn test_page_size_bytes() {
        assert_eq!(PageSize::Size4K.bytes(), 0x1000);
        assert_eq!(PageSize::Size2M.bytes(), 0x20_0000);
        assert_eq!(PageSize::Size1G.bytes(), 0x4000_0000);
        assert_eq!(PageSize::Size2M.offset_mask(), 0x1f_ffff);
    }
}
