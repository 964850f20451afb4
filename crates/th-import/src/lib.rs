//! TrueHearted Import Library
//!
//! Moves a legacy MySQL dump (members, images, likes, messages) into the
//! hosted backend, remapping member ids and repairing zero dates along the way.
//!
//! # Pipeline
//!
//! - [`dump`]: statement extraction and tuple tokenizing
//! - [`normalize`] + [`schema`]: positional fields to destination values
//! - [`identity`]: legacy member id to destination id
//! - [`orchestrator`]: runs the kinds in dependency order and tallies outcomes
//! - [`store`]: destination clients (REST, Postgres, in-memory)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use th_import::config::{ImportConfig, StoreConfig};
//! use th_import::orchestrator::ImportOrchestrator;
//! use th_import::store::RestStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = RestStore::new(StoreConfig::from_env()?)?;
//!     let orchestrator = ImportOrchestrator::new(Arc::new(store), ImportConfig::default());
//!
//!     let report = orchestrator.run_file("./dump.sql").await?;
//!     println!("{}", report.summarize());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod dump;
pub mod error;
pub mod identity;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod report;
pub mod schema;
pub mod store;

pub use config::{EmailTransform, IdentifierPolicy, ImportConfig, PrimaryImagePolicy, StoreConfig};
pub use error::{ImportError, Result};
pub use orchestrator::{ImportOrchestrator, RecordOutcome};
pub use report::{ImportReport, SkipReason};
