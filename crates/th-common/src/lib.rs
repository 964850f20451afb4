//! TrueHearted Common Library
//!
//! Shared types and logging for the TrueHearted import tools.
//!
//! # Overview
//!
//! This crate provides functionality used by every workspace member:
//!
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Types**: Record kinds and the per-kind import tally reported to callers
//!
//! # Example
//!
//! ```no_run
//! use th_common::types::{ImportTally, RecordKind};
//!
//! let mut tally = ImportTally::default();
//! tally.get_mut(RecordKind::Members).imported += 1;
//! assert_eq!(tally.get(RecordKind::Members).imported, 1);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod logging;
pub mod types;

// Re-export commonly used types
pub use types::{ImportTally, KindTally, RecordKind};
