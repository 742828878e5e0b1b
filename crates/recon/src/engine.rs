use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::categorize::categorize;
use crate::claim::ClaimRegistry;
use crate::config::EngineConfig;
use crate::error::ReconError;
use crate::index::BucketIndex;
use crate::matcher::{exact_pass, fuzzy_pass};
use crate::model::{
    Category, MatchResult, ReconInput, ReconMeta, ReconReport, RunSummary, Side, SkipReason,
};
use crate::normalize::normalize_side;
use crate::split::split_pass;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation handle. Clone it into whatever owns the
/// abort decision; the engine checks it between passes, so an aborted
/// run never yields a partial report.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run the full pipeline: normalize, exact, fuzzy, split, categorize.
pub fn run(config: &EngineConfig, input: &ReconInput) -> Result<ReconReport, ReconError> {
    run_with_cancel(config, input, &CancelToken::new())
}

pub fn run_with_cancel(
    config: &EngineConfig,
    input: &ReconInput,
    cancel: &CancelToken,
) -> Result<ReconReport, ReconError> {
    config.validate()?;
    if !config.tolerances_fit_buckets() {
        warn!(
            "tolerances exceed bucket widths (date {} > {} days or amount {} > {}); \
             candidates outside the bucket neighborhood will not be considered",
            config.date_tolerance_days,
            config.bucket_window_days,
            config.amount_tolerance_minor,
            config.bucket_amount_granularity,
        );
    }

    let (ledger, mut manifest) = normalize_side(Side::Ledger, &input.ledger);
    let (statement, statement_manifest) = normalize_side(Side::Statement, &input.statement);
    manifest.extend(statement_manifest);
    info!(
        "normalized {} ledger and {} statement records ({} skipped)",
        ledger.len(),
        statement.len(),
        manifest.len()
    );

    let registry = ClaimRegistry::new(ledger.len(), statement.len());
    let mut results = Vec::new();

    checkpoint(cancel)?;
    let exact = exact_pass(&ledger, &statement, &registry);
    debug!("exact pass: {} pairs", exact.len());
    results.extend(exact);

    checkpoint(cancel)?;
    let index = BucketIndex::build(&ledger, &statement, config);
    let fuzzy = fuzzy_pass(&ledger, &statement, &index, &registry, config);
    debug!("fuzzy pass: {} pairs", fuzzy.len());
    results.extend(fuzzy);

    checkpoint(cancel)?;
    let splits = split_pass(&ledger, &statement, &registry, config);
    debug!("split pass: {} groups", splits.len());
    results.extend(splits);

    checkpoint(cancel)?;
    results.extend(categorize(&ledger, &statement, &registry, &manifest, config));

    let summary = summarize(&ledger, &statement, &results, &manifest);
    info!(
        "run complete: {} exact, {} fuzzy, {} split, {} unmatched",
        summary.exact_matched,
        summary.fuzzy_matched,
        summary.split_matched,
        summary.unmatched_ledger + summary.unmatched_statement
    );

    Ok(ReconReport {
        meta: ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        results,
        manifest,
    })
}

fn checkpoint(cancel: &CancelToken) -> Result<(), ReconError> {
    if cancel.is_cancelled() {
        return Err(ReconError::Aborted);
    }
    Ok(())
}

fn summarize(
    ledger: &[crate::model::Record],
    statement: &[crate::model::Record],
    results: &[MatchResult],
    manifest: &[crate::model::SkippedRecord],
) -> RunSummary {
    let mut summary = RunSummary {
        ledger_records: ledger.len(),
        statement_records: statement.len(),
        // Malformed rows only; duplicates are counted as results.
        skipped: manifest
            .iter()
            .filter(|s| s.reason != SkipReason::DuplicateId)
            .count(),
        ..Default::default()
    };
    for r in results {
        match r.category {
            Category::ExactMatched => summary.exact_matched += 1,
            Category::FuzzyMatched => summary.fuzzy_matched += 1,
            Category::SplitMatched => summary.split_matched += 1,
            Category::UnmatchedLedger => summary.unmatched_ledger += 1,
            Category::UnmatchedStatement => summary.unmatched_statement += 1,
            Category::ForeignCredit => summary.foreign_credits += 1,
            Category::Duplicate => summary.duplicates += 1,
        }
    }
    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
