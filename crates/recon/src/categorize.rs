use crate::claim::ClaimRegistry;
use crate::config::EngineConfig;
use crate::model::{Category, MatchResult, Record, Side, SkipReason, SkippedRecord};

/// Final sweep over the run's claim state. Pure bookkeeping: every
/// record not claimed by the matcher or split resolver gets a terminal
/// category here, so the partition is total.
pub fn categorize(
    ledger: &[Record],
    statement: &[Record],
    registry: &ClaimRegistry,
    manifest: &[SkippedRecord],
    config: &EngineConfig,
) -> Vec<MatchResult> {
    let mut results = Vec::new();

    for li in registry.unclaimed(Side::Ledger) {
        results.push(MatchResult {
            category: Category::UnmatchedLedger,
            ledger_ids: vec![ledger[li].id.clone()],
            statement_ids: Vec::new(),
            confidence: 0.0,
            score_parts: None,
            delta_minor: None,
        });
    }

    // Ledger amounts sorted for plausibility range probes.
    let mut ledger_by_amount: Vec<usize> = (0..ledger.len()).collect();
    ledger_by_amount.sort_by_key(|&i| ledger[i].amount_minor);

    for si in registry.unclaimed(Side::Statement) {
        let record = &statement[si];
        let category = if config.classify_foreign_credits
            && record.amount_minor > 0
            && !has_plausible_counterpart(record, ledger, &ledger_by_amount, config)
        {
            Category::ForeignCredit
        } else {
            Category::UnmatchedStatement
        };
        results.push(MatchResult {
            category,
            ledger_ids: Vec::new(),
            statement_ids: vec![record.id.clone()],
            confidence: 0.0,
            score_parts: None,
            delta_minor: None,
        });
    }

    for entry in manifest {
        if entry.reason != SkipReason::DuplicateId {
            continue;
        }
        let (ledger_ids, statement_ids) = match entry.side {
            Side::Ledger => (vec![entry.record_id.clone()], Vec::new()),
            Side::Statement => (Vec::new(), vec![entry.record_id.clone()]),
        };
        results.push(MatchResult {
            category: Category::Duplicate,
            ledger_ids,
            statement_ids,
            confidence: 0.0,
            score_parts: None,
            delta_minor: None,
        });
    }

    results
}

/// The foreign-credit rule's "plausible counterpart": any ledger
/// record — claimed or not — with the same sign, amount within
/// tolerance, and date within tolerance. If one ever existed in this
/// run, the credit is merely unmatched, not foreign.
fn has_plausible_counterpart(
    credit: &Record,
    ledger: &[Record],
    ledger_by_amount: &[usize],
    config: &EngineConfig,
) -> bool {
    let low = credit.amount_minor - config.amount_tolerance_minor;
    let high = credit.amount_minor + config.amount_tolerance_minor;
    let start = ledger_by_amount.partition_point(|&i| ledger[i].amount_minor < low);

    ledger_by_amount[start..]
        .iter()
        .take_while(|&&i| ledger[i].amount_minor <= high)
        .any(|&i| {
            let l = &ledger[i];
            l.amount_minor.signum() == credit.amount_minor.signum()
                && (l.date - credit.date).num_days().unsigned_abs()
                    <= u64::from(config.date_tolerance_days)
        })
}
