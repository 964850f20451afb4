//! Common types used across the import tools

use serde::{Deserialize, Serialize};

/// Record kind carried by a legacy dump
///
/// Kinds are imported in [`RecordKind::ALL`] order: members first, since
/// every other kind references a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Members,
    Images,
    Likes,
    Messages,
}

impl RecordKind {
    /// Import order
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Members,
        RecordKind::Images,
        RecordKind::Likes,
        RecordKind::Messages,
    ];

    /// Table name used both in the dump's `INSERT INTO` and in the destination store
    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Members => "members",
            RecordKind::Images => "img_links",
            RecordKind::Likes => "likes",
            RecordKind::Messages => "messages",
        }
    }

    /// Key used for this kind in reported tallies
    pub fn tally_key(self) -> &'static str {
        match self {
            RecordKind::Members => "members",
            RecordKind::Images => "images",
            RecordKind::Likes => "likes",
            RecordKind::Messages => "messages",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tally_key())
    }
}

/// Final counts for one record kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTally {
    pub imported: u64,
    pub skipped: u64,
}

impl KindTally {
    pub fn new(imported: u64, skipped: u64) -> Self {
        Self { imported, skipped }
    }

    /// Records attempted (imported + skipped)
    pub fn attempted(&self) -> u64 {
        self.imported + self.skipped
    }
}

/// Per-kind result of one import run
///
/// Serializes as
/// `{"members":{..},"images":{..},"likes":{..},"messages":{..}}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTally {
    pub members: KindTally,
    pub images: KindTally,
    pub likes: KindTally,
    pub messages: KindTally,
}

impl ImportTally {
    pub fn get(&self, kind: RecordKind) -> &KindTally {
        match kind {
            RecordKind::Members => &self.members,
            RecordKind::Images => &self.images,
            RecordKind::Likes => &self.likes,
            RecordKind::Messages => &self.messages,
        }
    }

    pub fn get_mut(&mut self, kind: RecordKind) -> &mut KindTally {
        match kind {
            RecordKind::Members => &mut self.members,
            RecordKind::Images => &mut self.images,
            RecordKind::Likes => &mut self.likes,
            RecordKind::Messages => &mut self.messages,
        }
    }

    pub fn total_imported(&self) -> u64 {
        RecordKind::ALL.iter().map(|k| self.get(*k).imported).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        RecordKind::ALL.iter().map(|k| self.get(*k).skipped).sum()
    }
}

/// Offset/limit window over a paged listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    /// First page of the given size (clamped to at least 1)
    pub fn first(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            offset: 0,
        }
    }

    /// The page after this one
    pub fn next(self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }

    /// A page that came back with fewer rows than requested is the last one
    pub fn is_last(&self, returned: usize) -> bool {
        returned < self.limit
    }
}
