//! Value tokenizer for a single dump tuple
//!
//! Input is the text between a tuple's `(` and its balancing `)`:
//!
//! ```text
//! 5, 'O''Brien', "say ""hi""", NULL, 'A, (test)'
//! ```
//!
//! Fields are split on commas outside quoted spans. Both `'` and `"` open a
//! quoted span, and a doubled delimiter inside a span is a literal delimiter.
//! An unquoted field whose trimmed text is empty or `NULL` is SQL null; a
//! quoted field keeps its content verbatim (so `''` is an empty string and
//! `'NULL'` is the text `NULL`).

use thiserror::Error;

use crate::models::RawRecord;

/// Why a tuple could not be tokenized cleanly
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("unterminated {quote} quote")]
    UnterminatedQuote { quote: char },

    #[error("unexpected quote at offset {offset}")]
    UnexpectedQuote { offset: usize },

    #[error("unexpected content after closing quote at offset {offset}")]
    TrailingContent { offset: usize },
}

/// Outcome of a best-effort split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenized {
    pub fields: Vec<Option<String>>,
    /// First problem encountered, if any
    pub failure: Option<ParseFailure>,
}

/// Tokenize a tuple, rejecting malformed text
pub fn tokenize(tuple: &str) -> Result<RawRecord, ParseFailure> {
    let Tokenized { fields, failure } = split(tuple);
    match failure {
        Some(failure) => Err(failure),
        None => Ok(RawRecord::new(fields)),
    }
}

/// Split a tuple into fields, never failing
///
/// Malformed text still yields a best-effort field list; the first problem
/// seen is reported alongside it.
pub fn split(tuple: &str) -> Tokenized {
    let mut splitter = Splitter::default();
    let mut chars = tuple.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if let Some(quote) = splitter.quote {
            if c == quote {
                if chars.peek().map(|&(_, next)| next) == Some(quote) {
                    chars.next();
                    splitter.current.push(quote);
                } else {
                    splitter.quote = None;
                    splitter.closed = true;
                }
            } else {
                splitter.current.push(c);
            }
            continue;
        }

        match c {
            ',' => splitter.end_field(),
            '\'' | '"' => {
                if splitter.closed || !splitter.current.trim().is_empty() {
                    splitter.fail(ParseFailure::UnexpectedQuote { offset });
                } else {
                    splitter.current.clear();
                }
                splitter.quote = Some(c);
                splitter.quoted = true;
                splitter.closed = false;
            },
            c if splitter.closed => {
                if !c.is_whitespace() {
                    splitter.fail(ParseFailure::TrailingContent { offset });
                    splitter.current.push(c);
                }
            },
            c => splitter.current.push(c),
        }
    }

    if let Some(quote) = splitter.quote {
        splitter.fail(ParseFailure::UnterminatedQuote { quote });
    }

    // `()` has no fields; anything else ends with a final (possibly null) field
    if !tuple.trim().is_empty() {
        splitter.end_field();
    }

    Tokenized {
        fields: splitter.fields,
        failure: splitter.failure,
    }
}

#[derive(Default)]
struct Splitter {
    fields: Vec<Option<String>>,
    current: String,
    quote: Option<char>,
    quoted: bool,
    closed: bool,
    failure: Option<ParseFailure>,
}

impl Splitter {
    fn end_field(&mut self) {
        let text = std::mem::take(&mut self.current);
        let value = if self.quoted {
            Some(text)
        } else {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed == "NULL" {
                None
            } else {
                Some(trimmed.to_string())
            }
        };
        self.fields.push(value);
        self.quote = None;
        self.quoted = false;
        self.closed = false;
    }

    fn fail(&mut self, failure: ParseFailure) {
        self.failure.get_or_insert(failure);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn fields(tuple: &str) -> Vec<Option<String>> {
        tokenize(tuple).unwrap().into_fields()
    }

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_embedded_commas_and_parens() {
        assert_eq!(fields("'A, (test)', 5"), vec![s("A, (test)"), s("5")]);
    }

    #[test]
    fn test_doubled_delimiters_collapse() {
        assert_eq!(fields("'O''Brien'"), vec![s("O'Brien")]);
        assert_eq!(fields(r#""say ""hi""""#), vec![s(r#"say "hi""#)]);
        assert_eq!(fields(r#"'it"s', "it's""#), vec![s(r#"it"s"#), s("it's")]);
    }

    #[test]
    fn test_null_and_empty() {
        assert_eq!(
            fields("NULL, , 'NULL', '', 3"),
            vec![None, None, s("NULL"), s(""), s("3")]
        );
        assert_eq!(fields("1,"), vec![s("1"), None]);
    }

    #[test]
    fn test_unquoted_values_are_trimmed() {
        assert_eq!(fields("  12 ,\n 'x'  "), vec![s("12"), s("x")]);
    }

    #[test]
    fn test_empty_tuple_has_no_fields() {
        assert!(fields("").is_empty());
        assert!(fields("   ").is_empty());
    }

    #[test]
    fn test_unterminated_quote_is_reported_with_best_effort_split() {
        let result = split("1, 'Ann, 2");
        assert_eq!(
            result.failure,
            Some(ParseFailure::UnterminatedQuote { quote: '\'' })
        );
        assert_eq!(result.fields, vec![s("1"), s("Ann, 2")]);
        assert!(tokenize("1, 'Ann, 2").is_err());
    }

    #[test]
    fn test_quote_inside_unquoted_field() {
        assert!(matches!(
            tokenize("ab'c', 1"),
            Err(ParseFailure::UnexpectedQuote { offset: 2 })
        ));
    }

    #[test]
    fn test_content_after_closing_quote() {
        assert!(matches!(
            tokenize("'a' b, 1"),
            Err(ParseFailure::TrailingContent { .. })
        ));
        assert_eq!(fields("'a'   , 1"), vec![s("a"), s("1")]);
    }
}
