//! Field normalizer
//!
//! Turns a positional [`RawRecord`] into a [`NormalizedRecord`] following a
//! kind's [`Schema`]. Legacy MySQL zero dates are repaired to the current
//! date or instant, read through an injectable [`Clock`] so tests can pin it.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::config::{EmailTransform, ImportConfig};
use crate::models::{FieldValue, NormalizedRecord, RawRecord};
use crate::schema::{FieldSource, Rule, Schema};

/// MySQL zero date
pub const ZERO_DATE: &str = "0000-00-00";

/// MySQL zero timestamp
pub const ZERO_TIMESTAMP: &str = "0000-00-00 00:00:00";

/// Source of "now"
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Clock frozen at `instant`
pub fn fixed_clock(instant: DateTime<Utc>) -> Clock {
    Arc::new(move || instant)
}

/// A field value the normalizer cannot convert; the record is skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("field '{field}': '{value}' is not an integer identifier")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("field '{field}': '{value}' is out of range once offset")]
    IdentifierOutOfRange { field: &'static str, value: String },

    #[error("field '{field}': '{value}' is not a recognizable timestamp")]
    InvalidTimestamp { field: &'static str, value: String },
}

pub struct Normalizer {
    clock: Clock,
    member_id_offset: i64,
    email: EmailTransform,
}

impl Normalizer {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            clock: system_clock(),
            member_id_offset: config.member_id_offset(),
            email: config.email_transform.clone(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Normalize every schema field of `raw`
    ///
    /// Positions beyond the end of the tuple read as null.
    pub fn normalize(
        &self,
        schema: &Schema,
        raw: &RawRecord,
    ) -> Result<NormalizedRecord, NormalizeError> {
        let mut record = NormalizedRecord::new();

        for spec in schema.fields {
            let value = match spec.source {
                FieldSource::Column { index, rule } => {
                    self.apply(spec.name, rule, raw.get(index))?
                },
                FieldSource::Constant(text) => FieldValue::text(text),
                FieldSource::Null => FieldValue::Null,
            };
            record.set(spec.name, value);
        }

        Ok(record)
    }

    /// Apply one conversion rule
    pub fn apply(
        &self,
        field: &'static str,
        rule: Rule,
        value: Option<&str>,
    ) -> Result<FieldValue, NormalizeError> {
        let value = match rule {
            Rule::Passthrough | Rule::MemberReference => FieldValue::text_or_null(value),
            Rule::Date => self.date(value),
            Rule::Timestamp => self.timestamp(field, value)?,
            Rule::TimestampOrNull => match value {
                None | Some("") => FieldValue::Null,
                Some(_) => self.timestamp(field, value)?,
            },
            Rule::BooleanFlag => FieldValue::Boolean(matches!(value, Some("1" | "true"))),
            Rule::Confirmed => {
                let confirmed = matches!(value, Some("Yes" | "yes"));
                FieldValue::text(if confirmed { "yes" } else { "no" })
            },
            Rule::EnumDefault(default) => match value {
                Some(v) if !v.is_empty() => FieldValue::text(v),
                _ => FieldValue::text(default),
            },
            Rule::OffsetIdentifier => match value {
                None => FieldValue::Null,
                Some(v) => {
                    let id: i64 =
                        v.trim()
                            .parse()
                            .map_err(|_| NormalizeError::InvalidIdentifier {
                                field,
                                value: v.to_string(),
                            })?;
                    let offset = id.checked_add(self.member_id_offset).ok_or_else(|| {
                        NormalizeError::IdentifierOutOfRange {
                            field,
                            value: v.to_string(),
                        }
                    })?;
                    FieldValue::Integer(offset)
                },
            },
            Rule::Email => match value {
                None => FieldValue::Null,
                Some(v) => FieldValue::Text(self.email.apply(v)),
            },
        };

        Ok(value)
    }

    fn date(&self, value: Option<&str>) -> FieldValue {
        match value {
            None | Some("") | Some(ZERO_DATE) => {
                FieldValue::Date((self.clock)().date_naive().format("%Y-%m-%d").to_string())
            },
            Some(v) => FieldValue::Date(v.to_string()),
        }
    }

    fn timestamp(
        &self,
        field: &'static str,
        value: Option<&str>,
    ) -> Result<FieldValue, NormalizeError> {
        match value {
            None | Some("") | Some(ZERO_TIMESTAMP) => Ok(FieldValue::Timestamp((self.clock)())),
            Some(v) => parse_timestamp(v)
                .map(FieldValue::Timestamp)
                .ok_or_else(|| NormalizeError::InvalidTimestamp {
                    field,
                    value: v.to_string(),
                }),
        }
    }
}

/// Parse a dump timestamp, treating zone-less values as UTC
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::IdentifierPolicy;
    use crate::schema::{LIKES, MEMBERS, MESSAGES};
    use chrono::TimeZone;

    fn pinned() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 0).unwrap()
    }

    fn normalizer(config: &ImportConfig) -> Normalizer {
        Normalizer::new(config).with_clock(fixed_clock(pinned()))
    }

    fn raw(fields: &[Option<&str>]) -> RawRecord {
        RawRecord::new(fields.iter().map(|f| f.map(String::from)).collect())
    }

    #[test]
    fn test_date_rule() {
        let n = normalizer(&ImportConfig::default());
        let today = FieldValue::Date("2025-03-09".into());

        assert_eq!(n.apply("d", Rule::Date, None).unwrap(), today);
        assert_eq!(n.apply("d", Rule::Date, Some(ZERO_DATE)).unwrap(), today);
        let once = n.apply("d", Rule::Date, Some("1990-05-01")).unwrap();
        assert_eq!(once, FieldValue::Date("1990-05-01".into()));
        let twice = n.apply("d", Rule::Date, once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_timestamp_rule() {
        let n = normalizer(&ImportConfig::default());

        assert_eq!(
            n.apply("t", Rule::Timestamp, Some(ZERO_TIMESTAMP)).unwrap(),
            FieldValue::Timestamp(pinned())
        );
        assert_eq!(
            n.apply("t", Rule::Timestamp, None).unwrap(),
            FieldValue::Timestamp(pinned())
        );
        assert_eq!(
            n.apply("t", Rule::Timestamp, Some("2023-12-31 23:59:58"))
                .unwrap()
                .to_json(),
            serde_json::json!("2023-12-31T23:59:58.000Z")
        );
        assert!(matches!(
            n.apply("t", Rule::Timestamp, Some("yesterday")),
            Err(NormalizeError::InvalidTimestamp { field: "t", .. })
        ));
    }

    #[test]
    fn test_timestamp_or_null_rule() {
        let n = normalizer(&ImportConfig::default());
        assert_eq!(
            n.apply("t", Rule::TimestampOrNull, None).unwrap(),
            FieldValue::Null
        );
        assert_eq!(
            n.apply("t", Rule::TimestampOrNull, Some(ZERO_TIMESTAMP)).unwrap(),
            FieldValue::Timestamp(pinned())
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T12:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-15 10:30:00.250").map(|t| t.timestamp_subsec_millis()),
            Some(250)
        );
        assert_eq!(
            parse_timestamp("2024-01-15"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("0000-00-00"), None);
    }

    #[test]
    fn test_flag_confirmed_and_defaults() {
        let n = normalizer(&ImportConfig::default());

        assert_eq!(n.apply("f", Rule::BooleanFlag, Some("1")).unwrap(), FieldValue::Boolean(true));
        assert_eq!(n.apply("f", Rule::BooleanFlag, Some("TRUE")).unwrap(), FieldValue::Boolean(false));
        assert_eq!(n.apply("f", Rule::BooleanFlag, None).unwrap(), FieldValue::Boolean(false));

        assert_eq!(n.apply("c", Rule::Confirmed, Some("Yes")).unwrap(), FieldValue::text("yes"));
        assert_eq!(n.apply("c", Rule::Confirmed, Some("YES")).unwrap(), FieldValue::text("no"));

        let rule = Rule::EnumDefault("free");
        assert_eq!(n.apply("s", rule, Some("")).unwrap(), FieldValue::text("free"));
        assert_eq!(n.apply("s", rule, None).unwrap(), FieldValue::text("free"));
        assert_eq!(n.apply("s", rule, Some("pro")).unwrap(), FieldValue::text("pro"));
    }

    #[test]
    fn test_offset_identifier() {
        let preserve = normalizer(&ImportConfig::default());
        let offset =
            normalizer(&ImportConfig::new().with_identifier_policy(IdentifierPolicy::Offset));

        assert_eq!(
            preserve.apply("member_id", Rule::OffsetIdentifier, Some("42")).unwrap(),
            FieldValue::Integer(42)
        );
        assert_eq!(
            offset.apply("member_id", Rule::OffsetIdentifier, Some("42")).unwrap(),
            FieldValue::Integer(1_000_042)
        );
        assert_eq!(
            offset.apply("member_id", Rule::OffsetIdentifier, None).unwrap(),
            FieldValue::Null
        );
        assert!(matches!(
            offset.apply("member_id", Rule::OffsetIdentifier, Some("x1")),
            Err(NormalizeError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            offset.apply("member_id", Rule::OffsetIdentifier, Some("9223372036854775000")),
            Err(NormalizeError::IdentifierOutOfRange { .. })
        ));
        assert_eq!(
            preserve.apply("member_id", Rule::OffsetIdentifier, Some("9223372036854775000")).unwrap(),
            FieldValue::Integer(9_223_372_036_854_775_000)
        );
    }

    #[test]
    fn test_member_record() {
        let n = normalizer(&ImportConfig::new().with_email_suffix(".imported"));
        let mut fields = vec![Some("1"); 33];
        fields[1] = Some("O'Brien");
        fields[3] = Some(ZERO_DATE);
        fields[4] = Some("ob@example.com");
        fields[6] = None;
        fields[20] = Some("yes");
        fields[23] = Some("77");
        fields[25] = Some("2024-02-01 08:00:00");
        fields[28] = None;
        fields[30] = None;

        let record = n.normalize(&MEMBERS, &raw(&fields)).unwrap();

        assert_eq!(record.len(), 33);
        assert_eq!(record.get_str("name"), Some("O'Brien"));
        assert_eq!(record.get("birthdate"), Some(&FieldValue::Date("2025-03-09".into())));
        assert_eq!(record.get_str("email"), Some("ob@example.com.imported"));
        assert_eq!(record.get_str("subscription"), Some("free"));
        assert_eq!(record.get_str("confirmed"), Some("yes"));
        assert_eq!(record.get("member_id"), Some(&FieldValue::Integer(77)));
        assert_eq!(record.get("subscribed_at"), Some(&FieldValue::Null));
        assert_eq!(record.get("user_id"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_short_tuple_reads_null() {
        let n = normalizer(&ImportConfig::default());
        let record = n
            .normalize(&MESSAGES, &raw(&[Some("1"), Some("hello"), Some("5")]))
            .unwrap();

        assert_eq!(record.get_str("message"), Some("hello"));
        assert_eq!(record.get("receiver_id"), Some(&FieldValue::Null));
        assert_eq!(record.get("chat_id"), Some(&FieldValue::Null));
        assert_eq!(record.get("is_read"), Some(&FieldValue::Boolean(false)));
    }

    #[test]
    fn test_like_constant() {
        let n = normalizer(&ImportConfig::default());
        let record = n
            .normalize(&LIKES, &raw(&[Some("1"), Some("5"), Some("6"), None]))
            .unwrap();
        assert_eq!(record.get_str("like_type"), Some("like"));
        assert_eq!(record.get("timestamp"), Some(&FieldValue::Timestamp(pinned())));
    }
}
