//! Legacy MySQL dump reading
//!
//! - [`extractor`]: finds the INSERT statements for a table and cuts out tuples
//! - [`tokenizer`]: splits one tuple into positional fields

pub mod extractor;
pub mod tokenizer;

use serde::Serialize;
use th_common::RecordKind;

pub use extractor::{extract, Extraction, ExtractionSummary};
pub use tokenizer::{split, tokenize, ParseFailure};

/// Extraction statistics for one record kind, without touching a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindInspection {
    pub kind: RecordKind,
    #[serde(flatten)]
    pub summary: ExtractionSummary,
    /// Tuples the tokenizer rejects
    pub malformed: usize,
}

/// Inspect every record kind of a dump
pub fn inspect(dump: &str) -> Vec<KindInspection> {
    RecordKind::ALL
        .iter()
        .map(|&kind| {
            let extraction = extract(dump, kind.table());
            let malformed = extraction
                .tuples
                .iter()
                .filter(|tuple| tokenize(tuple).is_err())
                .count();
            KindInspection {
                kind,
                summary: extraction.summary,
                malformed,
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_counts_malformed() {
        let dump = "INSERT INTO `members` VALUES (1,'Ann'),(2,'B'x');\n\
                    INSERT INTO `img_links` VALUES (1,'a.jpg',1);";
        let report = inspect(dump);

        assert_eq!(report.len(), 4);
        assert_eq!(report[0].kind, RecordKind::Members);
        assert_eq!(report[0].summary.tuples, 2);
        assert_eq!(report[0].malformed, 1);
        assert_eq!(report[1].summary.tuples, 1);
        assert_eq!(report[1].malformed, 0);
        assert_eq!(report[3].summary.statements, 0);
    }
}
