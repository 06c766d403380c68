//! # dreqdiff
//!
//! Reads versions of a climate data request spreadsheet, derives per-variable
//! fields for one model, and reports how the request changed between versions.

pub mod change_detection;
pub mod cli;
pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod output;
pub mod progress;
pub mod record;
pub mod snapshot;
pub mod stash;

pub use change_detection::{DiffResult, SnapshotDiffer};
pub use config::{DreqConfig, ModelProfile};
pub use error::{DreqError, Result};
pub use record::Record;
pub use snapshot::{RequestSnapshot, SnapshotLoader};
