//! x86-64 4-level page-table walk.
//!
//! - [`addr`] — virtual address decomposition into table indices
//! - [`entry`] — raw entry interpretation (present/huge/base)
//! - [`walker`] — the level-by-level walk over a [`crate::target::Target`]
//! - [`translate`] — the top-level entry point with scoped mode handling

pub mod addr;
pub mod entry;
pub mod error;
pub mod translate;
pub mod walker;

pub use addr::PagingIndices;
pub use entry::{DecodedEntry, Level};
pub use error::{TranslateError, TranslationFailure};
pub use translate::translate;
pub use walker::{PageSize, TraceRecord, Translation, TranslationTrace};
