//! Run reports
//!
//! [`ImportTally`] is what callers get back; [`ImportReport`] adds why records
//! were skipped and what extraction saw, for the CLI and logs.

use std::fmt::Write as _;

use serde::Serialize;
use th_common::{ImportTally, KindTally, RecordKind};

use crate::dump::{ExtractionSummary, KindInspection};

/// Why a record was not imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// The tuple text could not be tokenized
    Parse,
    /// A field value could not be converted
    Normalize,
    /// A referenced legacy member id has no destination id
    Unresolved,
    /// The store refused the insert
    Rejected,
}

/// Skip counts broken down by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub parse: u64,
    pub normalize: u64,
    pub unresolved: u64,
    pub rejected: u64,
}

impl SkipCounts {
    pub fn add(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Parse => self.parse += 1,
            SkipReason::Normalize => self.normalize += 1,
            SkipReason::Unresolved => self.unresolved += 1,
            SkipReason::Rejected => self.rejected += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.parse + self.normalize + self.unresolved + self.rejected
    }
}

/// Final state of one record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindReport {
    pub kind: RecordKind,
    pub tally: KindTally,
    pub skips: SkipCounts,
    pub extraction: ExtractionSummary,
}

/// Everything known about one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub tally: ImportTally,
    pub kinds: Vec<KindReport>,
}

impl ImportReport {
    pub fn push(&mut self, report: KindReport) {
        *self.tally.get_mut(report.kind) = report.tally;
        self.kinds.push(report);
    }

    pub fn kind(&self, kind: RecordKind) -> Option<&KindReport> {
        self.kinds.iter().find(|k| k.kind == kind)
    }

    /// Human-readable summary
    pub fn summarize(&self) -> String {
        let mut out = String::from("Import Summary:\n");

        for report in &self.kinds {
            let _ = writeln!(
                out,
                "- {}: {} imported, {} skipped",
                report.kind, report.tally.imported, report.tally.skipped
            );
            if report.skips.total() > 0 {
                let _ = writeln!(
                    out,
                    "    parse: {}, normalize: {}, unresolved: {}, rejected: {}",
                    report.skips.parse,
                    report.skips.normalize,
                    report.skips.unresolved,
                    report.skips.rejected
                );
            }
        }

        let _ = write!(
            out,
            "- Total: {} imported, {} skipped",
            self.tally.total_imported(),
            self.tally.total_skipped()
        );
        out
    }
}

/// Human-readable dump inspection
pub fn summarize_inspection(report: &[KindInspection]) -> String {
    let mut out = String::from("Dump Inspection:\n");
    for entry in report {
        let _ = writeln!(
            out,
            "- {} ({}): {} statements, {} tuples, {} malformed, {} skipped statements",
            entry.kind,
            entry.kind.table(),
            entry.summary.statements,
            entry.summary.tuples,
            entry.malformed,
            entry.summary.skipped_statements
        );
    }
    out
}
