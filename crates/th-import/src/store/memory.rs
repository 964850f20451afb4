//! In-process destination store
//!
//! Mirrors the constraints of the destination schema that an import can
//! trip over: member references must point at an existing member, and member
//! e-mail and `member_id` are unique. Rows get a random UUID `id`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use th_common::RecordKind;
use uuid::Uuid;

use super::{DestinationStore, StoreError};
use crate::models::NormalizedRecord;
use crate::schema::Schema;

/// PostgREST answers constraint violations with 409 Conflict
const CONFLICT: u16 = 409;

#[derive(Default)]
struct Tables {
    rows: HashMap<RecordKind, Vec<Map<String, Value>>>,
    attempts: HashMap<RecordKind, usize>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_selects: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `select_all` fail
    pub fn failing_selects(mut self) -> Self {
        self.fail_selects = true;
        self
    }

    /// Insert rows directly, bypassing constraints and attempt counts
    ///
    /// Rows without an `id` get one.
    pub fn seed(&self, kind: RecordKind, rows: Vec<Value>) {
        let mut tables = self.lock();
        let table = tables.rows.entry(kind).or_default();
        for row in rows {
            if let Value::Object(mut map) = row {
                map.entry("id")
                    .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                table.push(map);
            }
        }
    }

    /// Snapshot of a table
    pub fn rows(&self, kind: RecordKind) -> Vec<Value> {
        self.lock()
            .rows
            .get(&kind)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Number of `insert` calls made for a kind, successful or not
    pub fn insert_attempts(&self, kind: RecordKind) -> usize {
        self.lock().attempts.get(&kind).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave a table half-written
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Tables {
    fn check(&self, kind: RecordKind, row: &Map<String, Value>) -> Result<(), StoreError> {
        let members = self.rows.get(&RecordKind::Members);
        let members = members.map(Vec::as_slice).unwrap_or_default();

        if kind == RecordKind::Members {
            for column in ["email", "member_id"] {
                let Some(value) = row.get(column).filter(|v| !v.is_null()) else {
                    continue;
                };
                if members.iter().any(|m| m.get(column) == Some(value)) {
                    return Err(StoreError::rejected(
                        CONFLICT,
                        format!(
                            "duplicate key value violates unique constraint \"members_{column}_key\""
                        ),
                    ));
                }
            }
        }

        for column in Schema::for_kind(kind).references() {
            let target = row.get(column).unwrap_or(&Value::Null);
            let exists = members.iter().any(|m| m.get("id") == Some(target));
            if !exists {
                return Err(StoreError::rejected(
                    CONFLICT,
                    format!(
                        "insert or update on table \"{}\" violates foreign key constraint \"{}_{column}_fkey\"",
                        kind.table(),
                        kind.table()
                    ),
                ));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl DestinationStore for MemoryStore {
    async fn insert(&self, kind: RecordKind, record: &NormalizedRecord) -> Result<(), StoreError> {
        let mut tables = self.lock();
        *tables.attempts.entry(kind).or_default() += 1;

        let Value::Object(mut row) = record.to_json() else {
            return Err(StoreError::decode("record is not a JSON object"));
        };
        tables.check(kind, &row)?;

        row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        tables.rows.entry(kind).or_default().push(row);
        Ok(())
    }

    async fn select_all(&self, kind: RecordKind, columns: &[&str]) -> Result<Vec<Value>, StoreError> {
        if self.fail_selects {
            return Err(StoreError::Unavailable(format!(
                "select on {} is disabled",
                kind.table()
            )));
        }

        let tables = self.lock();
        let rows = tables.rows.get(&kind).map(Vec::as_slice).unwrap_or_default();

        Ok(rows
            .iter()
            .map(|row| {
                let projected: Map<String, Value> = columns
                    .iter()
                    .map(|c| (c.to_string(), row.get(*c).cloned().unwrap_or(Value::Null)))
                    .collect();
                Value::Object(projected)
            })
            .collect())
    }
}
