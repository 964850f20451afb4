//! Direct Postgres store
//!
//! Writes into the same tables the hosted backend exposes. Only the columns
//! present in a record are inserted, so database defaults (such as the
//! generated `id`) still apply.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use th_common::RecordKind;

use super::{DestinationStore, StoreError};
use crate::models::NormalizedRecord;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a small pool; the import issues one statement at a time
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(quote_ident).collect::<Vec<_>>().join(", ")
}

#[async_trait]
impl DestinationStore for PgStore {
    async fn insert(&self, kind: RecordKind, record: &NormalizedRecord) -> Result<(), StoreError> {
        let table = quote_ident(kind.table());
        let columns = column_list(record.names());
        let sql = format!(
            "INSERT INTO {table} ({columns}) \
             SELECT {columns} FROM json_populate_record(NULL::{table}, $1::json)"
        );

        sqlx::query(&sql)
            .bind(record.to_json())
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) => StoreError::rejected(409, db.message()),
                other => StoreError::Database(other),
            })?;

        Ok(())
    }

    async fn select_all(&self, kind: RecordKind, columns: &[&str]) -> Result<Vec<Value>, StoreError> {
        let sql = format!(
            "SELECT to_jsonb(t) FROM (SELECT {} FROM {}) t",
            column_list(columns.iter().copied()),
            quote_ident(kind.table())
        );

        let rows: Vec<Value> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_are_quoted() {
        assert_eq!(quote_ident("img_links"), "\"img_links\"");
        assert_eq!(
            column_list(["id", "member_id"].into_iter()),
            "\"id\", \"member_id\""
        );
    }
}
