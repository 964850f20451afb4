//! Destination store clients
//!
//! The importer only needs two operations from the destination: insert one
//! record, and list selected columns of a table. Implementations:
//!
//! - [`rest::RestStore`]: PostgREST-compatible hosted backend over HTTPS
//! - [`postgres::PgStore`]: direct Postgres connection (feature `database`)
//! - [`memory::MemoryStore`]: in-process tables for dry runs and tests

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;
use th_common::RecordKind;
use thiserror::Error;

use crate::models::NormalizedRecord;

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::PgStore;
pub use rest::RestStore;

/// Why a store operation failed
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store refused the record (constraint violation, duplicate, validation)
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never got a usable response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response could not be understood
    #[error("Failed to decode store response: {0}")]
    Decode(String),

    /// The store is not reachable or not accepting requests
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether the store answered and refused the record
    pub fn is_rejection(&self) -> bool {
        matches!(self, StoreError::Rejected { .. })
    }
}

/// Record store the import writes into
///
/// Inserts are independently atomic and independently failable.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Insert one record into the kind's table
    async fn insert(&self, kind: RecordKind, record: &NormalizedRecord) -> Result<(), StoreError>;

    /// List `columns` of every row of the kind's table
    async fn select_all(&self, kind: RecordKind, columns: &[&str]) -> Result<Vec<Value>, StoreError>;
}
