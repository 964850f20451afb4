//! Destination field schemas for each record kind
//!
//! Every destination field is read from a fixed tuple position (the dump has
//! no column names) or is a constant. Index 0 of each tuple is the legacy
//! auto-increment key and is never carried over.

use th_common::RecordKind;

/// Conversion applied to one positional source field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Copied unchanged, including null
    Passthrough,
    /// Zero date or null becomes today
    Date,
    /// Zero timestamp or null becomes now; anything else is re-emitted as ISO 8601
    Timestamp,
    /// Null stays null; otherwise [`Rule::Timestamp`]
    TimestampOrNull,
    /// `true` iff the text is exactly `1` or `true`
    BooleanFlag,
    /// `"yes"` iff the text is `Yes` or `yes`, otherwise `"no"`
    Confirmed,
    /// Value if non-empty, else the default
    EnumDefault(&'static str),
    /// Integer plus the configured member id offset
    OffsetIdentifier,
    /// Passthrough through the configured e-mail transform
    Email,
    /// Legacy member id, resolved to a destination id before insertion
    MemberReference,
}

/// Where a destination field's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Column { index: usize, rule: Rule },
    Constant(&'static str),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub source: FieldSource,
}

const fn col(name: &'static str, index: usize, rule: Rule) -> FieldSpec {
    FieldSpec {
        name,
        source: FieldSource::Column { index, rule },
    }
}

const fn constant(name: &'static str, value: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        source: FieldSource::Constant(value),
    }
}

const fn null(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        source: FieldSource::Null,
    }
}

/// Ordered field list for one record kind
#[derive(Debug)]
pub struct Schema {
    pub kind: RecordKind,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn for_kind(kind: RecordKind) -> &'static Schema {
        match kind {
            RecordKind::Members => &MEMBERS,
            RecordKind::Images => &IMAGES,
            RecordKind::Likes => &LIKES,
            RecordKind::Messages => &MESSAGES,
        }
    }

    /// Fields holding legacy member ids that must be resolved
    pub fn references(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter_map(|f| match f.source {
            FieldSource::Column {
                rule: Rule::MemberReference,
                ..
            } => Some(f.name),
            _ => None,
        })
    }

    /// Field naming the record in diagnostics
    pub fn label_field(&self) -> Option<&'static str> {
        match self.kind {
            RecordKind::Members => Some("name"),
            RecordKind::Images => Some("img_id"),
            RecordKind::Likes | RecordKind::Messages => None,
        }
    }
}

pub static MEMBERS: Schema = Schema {
    kind: RecordKind::Members,
    fields: &[
        col("name", 1, Rule::Passthrough),
        col("gender", 2, Rule::Passthrough),
        col("birthdate", 3, Rule::Date),
        col("email", 4, Rule::Email),
        col("password", 5, Rule::Passthrough),
        col("subscription", 6, Rule::EnumDefault("free")),
        col("relationship_status", 7, Rule::Passthrough),
        col("having_kid", 8, Rule::Passthrough),
        col("need_kids", 9, Rule::Passthrough),
        col("education_level", 10, Rule::Passthrough),
        col("professionalism", 11, Rule::Passthrough),
        col("alcoholism", 12, Rule::Passthrough),
        col("smoker", 13, Rule::Passthrough),
        col("reasons", 14, Rule::Passthrough),
        col("height", 15, Rule::Passthrough),
        col("weight", 16, Rule::Passthrough),
        col("preferred_age_from", 17, Rule::Passthrough),
        col("preferred_age_to", 18, Rule::Passthrough),
        col("confirmation_code", 19, Rule::Passthrough),
        col("confirmed", 20, Rule::Confirmed),
        col("entry_date", 21, Rule::Date),
        col("status", 22, Rule::EnumDefault("active")),
        col("member_id", 23, Rule::OffsetIdentifier),
        col("location", 24, Rule::Passthrough),
        col("last_activity", 25, Rule::Timestamp),
        col("about_me", 26, Rule::Passthrough),
        col("subscription_id", 27, Rule::Passthrough),
        col("subscribed_at", 28, Rule::TimestampOrNull),
        col("reset_token", 29, Rule::Passthrough),
        col("reset_expires", 30, Rule::TimestampOrNull),
        col("get_news", 31, Rule::EnumDefault("yes")),
        col("remember_token", 32, Rule::Passthrough),
        null("user_id"),
    ],
};

/// `is_primary` is added by the orchestrator according to the image policy.
pub static IMAGES: Schema = Schema {
    kind: RecordKind::Images,
    fields: &[
        col("img_id", 1, Rule::Passthrough),
        col("member_id", 2, Rule::MemberReference),
    ],
};

pub static LIKES: Schema = Schema {
    kind: RecordKind::Likes,
    fields: &[
        col("sent_from", 1, Rule::MemberReference),
        col("sent_to", 2, Rule::MemberReference),
        col("timestamp", 3, Rule::Timestamp),
        constant("like_type", "like"),
    ],
};

pub static MESSAGES: Schema = Schema {
    kind: RecordKind::Messages,
    fields: &[
        col("message", 1, Rule::Passthrough),
        col("sender_id", 2, Rule::MemberReference),
        col("receiver_id", 3, Rule::MemberReference),
        col("timestamp", 4, Rule::Timestamp),
        col("chat_id", 5, Rule::Passthrough),
        col("is_read", 6, Rule::BooleanFlag),
    ],
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_members_schema_positions() {
        let columns: Vec<(usize, &str)> = MEMBERS
            .fields
            .iter()
            .filter_map(|f| match f.source {
                FieldSource::Column { index, .. } => Some((index, f.name)),
                _ => None,
            })
            .collect();

        assert_eq!(columns.len(), 32);
        assert!(columns.iter().enumerate().all(|(i, (index, _))| *index == i + 1));
        assert_eq!(columns[22], (23, "member_id"));
        assert_eq!(MEMBERS.fields.last().unwrap().name, "user_id");
    }

    #[test]
    fn test_references() {
        assert_eq!(MEMBERS.references().count(), 0);
        assert_eq!(IMAGES.references().collect::<Vec<_>>(), vec!["member_id"]);
        assert_eq!(
            Schema::for_kind(RecordKind::Messages).references().collect::<Vec<_>>(),
            vec!["sender_id", "receiver_id"]
        );
    }
}
