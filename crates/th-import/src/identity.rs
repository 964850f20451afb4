//! Identity remapper
//!
//! Maps legacy member ids from the dump to the ids the destination store
//! assigned on insert. The map is built once, after every member has been
//! attempted, and is read-only afterwards.

use std::collections::HashMap;

use serde_json::Value;
use th_common::RecordKind;
use tracing::{debug, info, warn};

use crate::models::DestinationId;
use crate::store::DestinationStore;

#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    entries: HashMap<i64, DestinationId>,
}

impl IdentityMap {
    /// Fetch `(id, member_id)` for every member and build the map
    ///
    /// `offset` is the identifier offset applied when members were
    /// normalized; keys are stored with it removed so they match the raw
    /// legacy ids in dependent tuples. A failed fetch yields an empty map.
    pub async fn load(store: &dyn DestinationStore, offset: i64) -> Self {
        match store.select_all(RecordKind::Members, &["id", "member_id"]).await {
            Ok(rows) => {
                let map = Self::from_rows(&rows, offset);
                info!(members = map.len(), "Built member identity map");
                map
            },
            Err(e) => {
                warn!(error = %e, "Failed to fetch members, dependent records will be skipped");
                Self::default()
            },
        }
    }

    /// Build from rows shaped `{"id": .., "member_id": ..}`
    pub fn from_rows(rows: &[Value], offset: i64) -> Self {
        let mut entries = HashMap::with_capacity(rows.len());

        for row in rows {
            let id = match row.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            let member_id = row.get("member_id").and_then(legacy_number);

            let (Some(id), Some(member_id)) = (id, member_id) else {
                debug!(row = %row, "Ignoring member row without id/member_id");
                continue;
            };

            match member_id.checked_sub(offset) {
                Some(legacy) => {
                    entries.insert(legacy, DestinationId::new(id));
                },
                None => debug!(row = %row, "Ignoring member row with out-of-range member_id"),
            }
        }

        Self { entries }
    }

    pub fn insert(&mut self, legacy: i64, id: DestinationId) {
        self.entries.insert(legacy, id);
    }

    /// Destination id for a legacy id, or `None` on a miss
    pub fn resolve(&self, legacy: i64) -> Option<&DestinationId> {
        self.entries.get(&legacy)
    }

    /// Resolve a raw legacy id as it appears in a dump tuple
    ///
    /// Text that is not an integer is a miss.
    pub fn resolve_raw(&self, raw: &str) -> Option<&DestinationId> {
        raw.trim().parse().ok().and_then(|legacy| self.resolve(legacy))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn legacy_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_resolve_hits_and_misses() {
        let map = IdentityMap::from_rows(
            &[
                json!({"id": "A", "member_id": 10}),
                json!({"id": "B", "member_id": "11"}),
                json!({"id": "C", "member_id": null}),
            ],
            0,
        );

        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve(10).map(DestinationId::as_str), Some("A"));
        assert_eq!(map.resolve_raw(" 11 ").map(DestinationId::as_str), Some("B"));
        assert!(map.resolve(99).is_none());
        assert!(map.resolve_raw("abc").is_none());
    }

    #[test]
    fn test_offset_is_removed_from_keys() {
        let map = IdentityMap::from_rows(&[json!({"id": "A", "member_id": 1_000_010})], 1_000_000);
        assert_eq!(map.resolve_raw("10").map(DestinationId::as_str), Some("A"));
        assert!(map.resolve(1_000_010).is_none());
    }

    #[test]
    fn test_out_of_range_rows_are_ignored() {
        let map = IdentityMap::from_rows(
            &[
                json!({"id": "A", "member_id": i64::MIN}),
                json!({"id": "B", "member_id": 1_000_007}),
            ],
            1_000_000,
        );

        assert_eq!(map.len(), 1);
        assert_eq!(map.resolve(7).map(DestinationId::as_str), Some("B"));
    }

    #[tokio::test]
    async fn test_load_from_store() {
        let store = MemoryStore::new();
        store.seed(
            RecordKind::Members,
            vec![json!({"id": "A", "member_id": 5}), json!({"id": "B", "member_id": 6})],
        );

        let map = IdentityMap::load(&store, 0).await;
        assert_eq!(map.resolve(6).map(DestinationId::as_str), Some("B"));
    }

    #[tokio::test]
    async fn test_failed_select_yields_empty_map() {
        let store = MemoryStore::new().failing_selects();
        let map = IdentityMap::load(&store, 0).await;
        assert!(map.is_empty());
    }
}
