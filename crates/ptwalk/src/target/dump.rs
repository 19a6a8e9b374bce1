//! Snapshot target: a raw physical memory dump on disk.
//!
//! The dump is memory-mapped for random access. A dump carries no
//! register file, so the CR3 value is supplied by the operator at open
//! time and served back through `read_register`.

use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::{Target, TargetError};

/// A memory-mapped raw dump of a machine's physical memory.
pub struct DumpTarget {
    /// `None` for a zero-length file, which cannot be mapped.
    mmap: Option<Mmap>,
    cr3: u64,
    #[allow(dead_code)]
    path: PathBuf,
}

impl DumpTarget {
    /// Map a dump file read-only.
    pub fn open(path: &Path, cr3: u64) -> Result<Self, TargetError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let mmap = if size == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().map(&file)? })
        };
        tracing::info!(
            path = %path.display(),
            size,
            cr3 = %format_args!("{cr3:#x}"),
            "mapped physical memory dump"
        );
        Ok(DumpTarget {
            mmap,
            cr3,
            path: path.to_path_buf(),
        })
    }

    fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

impl Target for DumpTarget {
    fn read_register(&self, name: &str) -> Result<u64, TargetError> {
        if name == "cr3" {
            Ok(self.cr3)
        } else {
            Err(TargetError::UnknownRegister(name.to_string()))
        }
    }

    fn read_physical(&self, address: u64, length: usize) -> Result<Vec<u8>, TargetError> {
        let data = self.data();
        let end = address
            .checked_add(length as u64)
            .filter(|&e| e <= data.len() as u64)
            .ok_or(TargetError::OutOfRange {
                address,
                length,
                size: data.len() as u64,
            })?;
        Ok(data[address as usize..end as usize].to_vec())
    }

    fn set_physical_addressing_mode(&self, _enabled: bool) -> Result<(), TargetError> {
        // A dump is physical memory already.
        Ok(())
    }
}
