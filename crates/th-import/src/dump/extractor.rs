//! Statement extractor
//!
//! Finds every ``INSERT INTO `<table>` [(<columns>)] VALUES (...), (...);``
//! statement for one table and returns the text of each top-level tuple (the
//! part between the outer parentheses) in source order.
//!
//! Tuples are delimited by balanced parentheses with quote awareness, so
//! values such as `'A, (test)'` stay inside their tuple. A tuple whose quoting
//! is broken is cut at the next raw `),(` or `);` boundary and returned as its
//! own unit; the tokenizer then rejects it and the rest of the statement is
//! unaffected.

use serde::Serialize;
use tracing::{debug, warn};

/// Tuples found for one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction<'a> {
    pub tuples: Vec<&'a str>,
    pub summary: ExtractionSummary,
}

/// Counters describing one extraction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionSummary {
    /// Statements whose `VALUES` clause was read
    pub statements: usize,
    /// Statements dropped because they did not match the INSERT grammar
    pub skipped_statements: usize,
    /// Tuples returned, including malformed ones
    pub tuples: usize,
    /// Tuples that had to be cut at a raw boundary
    pub resyncs: usize,
}

/// Extract all tuples for `table` from `dump`
///
/// Finding no statements is not an error; the result is simply empty.
pub fn extract<'a>(dump: &'a str, table: &str) -> Extraction<'a> {
    let needle = format!("INSERT INTO `{table}`");
    let bytes = dump.as_bytes();
    let mut extraction = Extraction::default();
    let mut cursor = 0;

    while let Some(found) = dump[cursor..].find(&needle) {
        let start = cursor + found;
        let mut pos = skip_ws(bytes, start + needle.len());

        // Optional column list
        if bytes.get(pos) == Some(&b'(') {
            match dump[pos..].find(')') {
                Some(close) => pos = skip_ws(bytes, pos + close + 1),
                None => {
                    warn!(table = %table, offset = start, "Unclosed column list, skipping statement");
                    extraction.summary.skipped_statements += 1;
                    break;
                },
            }
        }

        if !dump
            .get(pos..pos + 6)
            .is_some_and(|kw| kw.eq_ignore_ascii_case("VALUES"))
        {
            warn!(table = %table, offset = start, "INSERT without VALUES clause, skipping statement");
            extraction.summary.skipped_statements += 1;
            cursor = skip_statement(bytes, pos);
            continue;
        }

        extraction.summary.statements += 1;
        cursor = read_values(dump, table, pos + 6, &mut extraction);
    }

    debug!(
        table = %table,
        statements = extraction.summary.statements,
        tuples = extraction.summary.tuples,
        resyncs = extraction.summary.resyncs,
        "Extraction finished"
    );

    extraction
}

/// Read the tuple list of one statement, returning the offset after it
fn read_values<'a>(dump: &'a str, table: &str, from: usize, out: &mut Extraction<'a>) -> usize {
    let bytes = dump.as_bytes();
    let mut pos = skip_ws(bytes, from);

    loop {
        if bytes.get(pos) != Some(&b'(') {
            warn!(table = %table, offset = pos, "Expected a tuple, skipping rest of statement");
            return skip_statement(bytes, pos);
        }

        let next = match scan_tuple(bytes, pos) {
            Some(close) => {
                out.push(&dump[pos + 1..close], false);
                skip_ws(bytes, close + 1)
            },
            None => match find_boundary(bytes, pos + 1) {
                Some((close, after)) => {
                    out.push(&dump[pos + 1..close], true);
                    match after {
                        Boundary::Next(open) => {
                            pos = open;
                            continue;
                        },
                        Boundary::End(end) => return end,
                    }
                },
                None => {
                    out.push(&dump[pos + 1..], true);
                    return dump.len();
                },
            },
        };

        match bytes.get(next) {
            Some(b',') => pos = skip_ws(bytes, next + 1),
            Some(b';') => return next + 1,
            Some(_) => {
                warn!(table = %table, offset = next, "Unexpected text between tuples, skipping rest of statement");
                return skip_statement(bytes, next);
            },
            None => return next,
        }
    }
}

impl<'a> Extraction<'a> {
    fn push(&mut self, tuple: &'a str, resynced: bool) {
        self.tuples.push(tuple);
        self.summary.tuples += 1;
        if resynced {
            self.summary.resyncs += 1;
        }
    }
}

/// Find the `)` balancing the `(` at `open`
///
/// Returns `None` when the tuple's quoting is broken: a quote that does not
/// start a field, content after a closing quote, or no balancing `)`.
fn scan_tuple(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut closed = false;
    let mut last = b'(';
    let mut i = open;

    while i < bytes.len() {
        let c = bytes[i];

        if let Some(q) = quote {
            if c == q {
                if bytes.get(i + 1) == Some(&q) {
                    i += 1;
                } else {
                    quote = None;
                    closed = true;
                }
            }
            i += 1;
            continue;
        }

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if closed && c != b',' && c != b')' {
            return None;
        }
        closed = false;

        match c {
            b'\'' | b'"' => {
                if last != b'(' && last != b',' {
                    return None;
                }
                quote = Some(c);
            },
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            },
            _ => {},
        }

        last = c;
        i += 1;
    }

    None
}

enum Boundary {
    /// Offset of the next tuple's `(`
    Next(usize),
    /// Offset just past the statement's `;`
    End(usize),
}

/// Find the first raw `)`ws`,`ws`(` or `)`ws`;` at or after `from`
fn find_boundary(bytes: &[u8], from: usize) -> Option<(usize, Boundary)> {
    (from..bytes.len())
        .filter(|&i| bytes[i] == b')')
        .find_map(|close| {
            let after = skip_ws(bytes, close + 1);
            match bytes.get(after) {
                Some(b';') => Some((close, Boundary::End(after + 1))),
                Some(b',') => {
                    let open = skip_ws(bytes, after + 1);
                    (bytes.get(open) == Some(&b'(')).then_some((close, Boundary::Next(open)))
                },
                _ => None,
            }
        })
}

/// Offset just past the next `;` outside any quoted string
fn skip_statement(bytes: &[u8], from: usize) -> usize {
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) if c == q => {
                if bytes.get(i + 1) == Some(&q) {
                    i += 1;
                } else {
                    quote = None;
                }
            },
            Some(_) => {},
            None => match c {
                b'\'' | b'"' => quote = Some(c),
                b';' => return i + 1,
                _ => {},
            },
        }
        i += 1;
    }

    bytes.len()
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    pos
}
