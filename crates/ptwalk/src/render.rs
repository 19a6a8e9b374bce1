//! Presentation of translation results.
//!
//! The walk core returns values and never prints; everything user-visible
//! is assembled here, either as the human-readable report or as JSON.

use serde::Serialize;
use std::fmt::Write as _;

use crate::walk::{Translation, TranslationFailure, TranslationTrace};

/// The human-readable success report.
pub fn report(translation: &Translation) -> String {
    let mut out = String::new();
    let i = &translation.indices;
    let _ = writeln!(out, "CR3              = {:#x}", translation.cr3);
    let _ = writeln!(out, "Virtual address  = {:#x}", translation.virtual_address);
    let _ = writeln!(out, "PML4 index  = {:#x}", i.pml4);
    let _ = writeln!(out, "PDPT index  = {:#x}", i.pdpt);
    let _ = writeln!(out, "PD index    = {:#x}", i.pd);
    let _ = writeln!(out, "PT index    = {:#x}", i.pt);
    let _ = writeln!(out, "Page offset = {:#x}", i.offset);
    trace_lines(&mut out, &translation.trace);
    let _ = writeln!(out, "Page size        = {}", translation.page_size);
    let _ = writeln!(out, "Physical address = {:#x}", translation.physical_address);
    out
}

/// The human-readable failure report: partial trace, then the cause.
pub fn failure_report(failure: &TranslationFailure) -> String {
    let mut out = String::new();
    trace_lines(&mut out, &failure.trace);
    let _ = writeln!(out, "error: {}", failure.error);
    out
}

fn trace_lines(out: &mut String, trace: &TranslationTrace) {
    for record in trace.records() {
        match record.raw_entry {
            Some(raw) => {
                let _ = writeln!(
                    out,
                    "{} entry @ {:#x} = {:#x}",
                    record.level, record.entry_address, raw
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "{} entry @ {:#x} = <read failed>",
                    record.level, record.entry_address
                );
            }
        }
    }
}

/// JSON rendering of a success.
pub fn json_report(translation: &Translation) -> serde_json::Result<String> {
    serde_json::to_string_pretty(translation)
}

#[derive(Serialize)]
struct FailureReport<'a> {
    error: String,
    trace: &'a TranslationTrace,
}

/// JSON rendering of a failure, with the partial trace.
pub fn json_failure(failure: &TranslationFailure) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&FailureReport {
        error: failure.error.to_string(),
        trace: &failure.trace,
    })
}
