//! fixlag-core library.
//!
//! Reconstructs the life cycle of static-analysis issues from an ordered log
//! of per-commit snapshots:
//!
//! 1. [`loader`] parses the snapshot log into [`model::Snapshot`]s.
//! 2. [`ledger`] folds each sample's snapshots into [`model::LifecycleRecord`]s.
//! 3. [`resolver`] looks one commit ahead for issues the fold left open.
//! 4. [`report`] writes and reads the resulting table, and audits it.
//!
//! [`pipeline::reconstruct`] wires the stages together.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums for library failures, `anyhow::Result` at
//!   the config boundary. Per-record problems are [`diagnostics::Anomaly`]
//!   values, never errors.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ledger;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod summary;
pub mod timeline;

pub use diagnostics::{Anomaly, AnomalyKind, Diagnostics};
pub use ledger::{SampleLedger, fold};
pub use loader::{LoadError, LoadReport, load_snapshots};
pub use model::{Finding, FindingStatus, Issues, LifecycleRecord, Resolution, Snapshot, TextRange};
pub use pipeline::{ReconstructOptions, Reconstruction, reconstruct, reconstruct_loaded};
pub use report::{ReportError, ReportFormat, read_report, write_report};
pub use resolver::FixWindowResolver;
pub use summary::ReconstructionSummary;
pub use timeline::{SampleTimeline, TimelineIndex};
