//! `ledgerline-recon` — Ledger/statement reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records, returns a total
//! categorization of both datasets. No CLI or IO dependencies.

pub mod categorize;
pub mod claim;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod index;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod score;
pub mod split;
pub mod text;

pub use config::{EngineConfig, ScoreWeights};
pub use engine::{run, run_with_cancel, CancelToken};
pub use error::ReconError;
pub use export::{ExportColumn, ExportOrderer};
pub use model::{
    Category, MatchResult, RawRecord, ReconInput, ReconReport, Record, RunSummary, Side,
    SkippedRecord,
};
