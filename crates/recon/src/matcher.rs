use std::collections::BTreeMap;
use std::thread;

use chrono::NaiveDate;
use ordered_float::OrderedFloat;

use crate::claim::ClaimRegistry;
use crate::config::EngineConfig;
use crate::index::BucketIndex;
use crate::model::{Category, MatchResult, Record, Side};
use crate::score::{score_pair, Score};

// ---------------------------------------------------------------------------
// Exact pass
// ---------------------------------------------------------------------------

/// Pair records with identical amount, date, and reference text.
/// References compare with whitespace removed entirely, so "inv 1002"
/// and "inv1002" are the same exact key.
///
/// Records sharing an exact key are interchangeable, so counterpart
/// uniqueness cannot distinguish them; pairing both sides in ascending
/// origin order is the deterministic tie-break. BTreeMap keying makes
/// the output independent of input order.
pub fn exact_pass(
    ledger: &[Record],
    statement: &[Record],
    registry: &ClaimRegistry,
) -> Vec<MatchResult> {
    type ExactKey = (NaiveDate, i64, String);

    let exact_key = |r: &Record| -> ExactKey {
        (r.date, r.amount_minor, r.reference.replace(' ', ""))
    };

    let mut groups: BTreeMap<ExactKey, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    for (i, r) in ledger.iter().enumerate() {
        groups.entry(exact_key(r)).or_default().0.push(i);
    }
    for (i, r) in statement.iter().enumerate() {
        groups.entry(exact_key(r)).or_default().1.push(i);
    }

    let mut results = Vec::new();
    for (_, (mut ledger_side, mut statement_side)) in groups {
        if ledger_side.is_empty() || statement_side.is_empty() {
            continue;
        }
        ledger_side.sort_by_key(|&i| ledger[i].origin_index);
        statement_side.sort_by_key(|&i| statement[i].origin_index);

        for (&li, &si) in ledger_side.iter().zip(statement_side.iter()) {
            if !registry.claim_pair(li, si) {
                continue;
            }
            results.push(MatchResult {
                category: Category::ExactMatched,
                ledger_ids: vec![ledger[li].id.clone()],
                statement_ids: vec![statement[si].id.clone()],
                confidence: 1.0,
                score_parts: None,
                delta_minor: Some(0),
            });
        }
    }

    results
}

// ---------------------------------------------------------------------------
// Fuzzy pass
// ---------------------------------------------------------------------------

/// A proposed pairing, produced and discarded within one fuzzy pass.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub ledger: usize,
    pub statement: usize,
    pub score: Score,
}

/// Generate scored candidates bucket by bucket.
///
/// Buckets are the only locality a true match can span, so they make
/// natural work items: chunks of buckets are scored on a scoped worker
/// pool. Claim state is read-only during generation; the subsequent
/// resolution is what mutates it.
pub fn fuzzy_candidates(
    ledger: &[Record],
    statement: &[Record],
    index: &BucketIndex,
    registry: &ClaimRegistry,
    config: &EngineConfig,
) -> Vec<Candidate> {
    let buckets: Vec<_> = index.ledger_buckets().collect();
    if buckets.is_empty() {
        return Vec::new();
    }

    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(buckets.len());
    let chunk_size = buckets.len().div_ceil(workers);

    let mut candidates = Vec::new();
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for chunk in buckets.chunks(chunk_size) {
            handles.push(scope.spawn(move || {
                let mut found = Vec::new();
                for (key, ledger_indices) in chunk {
                    for &li in ledger_indices.iter() {
                        if registry.is_claimed(Side::Ledger, li) {
                            continue;
                        }
                        for &si in index.statement_candidates(key) {
                            if registry.is_claimed(Side::Statement, si) {
                                continue;
                            }
                            if let Some(score) = score_pair(&ledger[li], &statement[si], config) {
                                found.push(Candidate {
                                    ledger: li,
                                    statement: si,
                                    score,
                                });
                            }
                        }
                    }
                }
                found
            }));
        }
        for handle in handles {
            candidates.extend(handle.join().expect("scoring worker panicked"));
        }
    });

    candidates
}

/// Resolve candidates greedily in descending score order.
///
/// A greedy sweep over the sorted list approximates the maximum-weight
/// assignment; ties at equal score go to the smallest combined
/// origin_index, then to ledger/statement origin order so the full
/// sort key is total.
pub fn fuzzy_pass(
    ledger: &[Record],
    statement: &[Record],
    index: &BucketIndex,
    registry: &ClaimRegistry,
    config: &EngineConfig,
) -> Vec<MatchResult> {
    let mut candidates = fuzzy_candidates(ledger, statement, index, registry, config);

    candidates.sort_by_key(|c| {
        let l = &ledger[c.ledger];
        let s = &statement[c.statement];
        (
            std::cmp::Reverse(OrderedFloat(c.score.total)),
            l.origin_index + s.origin_index,
            l.origin_index,
            s.origin_index,
        )
    });

    let mut results = Vec::new();
    for c in candidates {
        if !registry.claim_pair(c.ledger, c.statement) {
            continue;
        }
        results.push(MatchResult {
            category: Category::FuzzyMatched,
            ledger_ids: vec![ledger[c.ledger].id.clone()],
            statement_ids: vec![statement[c.statement].id.clone()],
            confidence: c.score.total,
            score_parts: Some(c.score.parts),
            delta_minor: Some(ledger[c.ledger].amount_minor - statement[c.statement].amount_minor),
        });
    }

    results
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, origin: usize, date: &str, amount: i64, reference: &str) -> Record {
        Record {
            id: id.into(),
            origin_index: origin,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount_minor: amount,
            reference: reference.into(),
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            amount_tolerance_minor: 100,
            score_threshold: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn exact_pairs_regardless_of_order() {
        let ledger = vec![
            record("L2", 0, "2024-01-06", 5000, "other"),
            record("L1", 1, "2024-01-05", 10000, "inv 1002"),
        ];
        let statement = vec![
            record("S1", 0, "2024-01-05", 10000, "inv 1002"),
            record("S2", 1, "2024-01-06", 5000, "other"),
        ];
        let registry = ClaimRegistry::new(2, 2);
        let results = exact_pass(&ledger, &statement, &registry);
        assert_eq!(results.len(), 2);
        for r in &results {
            assert_eq!(r.category, Category::ExactMatched);
            assert_eq!(r.confidence, 1.0);
        }
    }

    #[test]
    fn exact_key_ignores_whitespace() {
        let ledger = vec![record("L1", 0, "2024-01-05", 10000, "inv 1002")];
        let statement = vec![record("S1", 0, "2024-01-05", 10000, "inv1002")];
        let registry = ClaimRegistry::new(1, 1);
        let results = exact_pass(&ledger, &statement, &registry);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category, Category::ExactMatched);
    }

    #[test]
    fn exact_ties_pair_in_origin_order() {
        // Two identical ledger rows, two identical statement rows:
        // lowest origins pair with each other.
        let ledger = vec![
            record("L1", 0, "2024-01-05", 10000, "dup"),
            record("L2", 1, "2024-01-05", 10000, "dup"),
        ];
        let statement = vec![
            record("S1", 0, "2024-01-05", 10000, "dup"),
            record("S2", 1, "2024-01-05", 10000, "dup"),
        ];
        let registry = ClaimRegistry::new(2, 2);
        let results = exact_pass(&ledger, &statement, &registry);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].ledger_ids, vec!["L1"]);
        assert_eq!(results[0].statement_ids, vec!["S1"]);
        assert_eq!(results[1].ledger_ids, vec!["L2"]);
        assert_eq!(results[1].statement_ids, vec!["S2"]);
    }

    #[test]
    fn exact_surplus_stays_unclaimed() {
        let ledger = vec![
            record("L1", 0, "2024-01-05", 10000, "dup"),
            record("L2", 1, "2024-01-05", 10000, "dup"),
        ];
        let statement = vec![record("S1", 0, "2024-01-05", 10000, "dup")];
        let registry = ClaimRegistry::new(2, 1);
        let results = exact_pass(&ledger, &statement, &registry);
        assert_eq!(results.len(), 1);
        assert!(!registry.is_claimed(Side::Ledger, 1));
    }

    #[test]
    fn fuzzy_prefers_higher_score() {
        let cfg = config();
        let ledger = vec![record("L1", 0, "2024-01-05", 10000, "acme invoice 44")];
        let statement = vec![
            record("S1", 0, "2024-01-07", 10050, "acme invoice 44"),
            record("S2", 1, "2024-01-05", 10000, "acme invoice 44"),
        ];
        let index = BucketIndex::build(&ledger, &statement, &cfg);
        let registry = ClaimRegistry::new(1, 2);
        let results = fuzzy_pass(&ledger, &statement, &index, &registry, &cfg);
        assert_eq!(results.len(), 1);
        // S2 is exact on date and amount, so it outscores S1.
        assert_eq!(results[0].statement_ids, vec!["S2"]);
        assert!(!registry.is_claimed(Side::Statement, 0));
    }

    #[test]
    fn fuzzy_tie_breaks_on_origin_sum() {
        let cfg = config();
        let ledger = vec![record("L1", 0, "2024-01-05", 10000, "payment")];
        // Identical score for both statements; smaller origin wins.
        let statement = vec![
            record("S1", 0, "2024-01-05", 10000, "payment"),
            record("S2", 1, "2024-01-05", 10000, "payment"),
        ];
        let index = BucketIndex::build(&ledger, &statement, &cfg);
        let registry = ClaimRegistry::new(1, 2);
        let results = fuzzy_pass(&ledger, &statement, &index, &registry, &cfg);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].statement_ids, vec!["S1"]);
    }

    #[test]
    fn below_threshold_stays_unclaimed() {
        let cfg = EngineConfig {
            score_threshold: 0.95,
            ..config()
        };
        let ledger = vec![record("L1", 0, "2024-01-05", 10000, "acme invoice")];
        let statement = vec![record("S1", 0, "2024-01-07", 10090, "wire transfer 118")];
        let index = BucketIndex::build(&ledger, &statement, &cfg);
        let registry = ClaimRegistry::new(1, 1);
        let results = fuzzy_pass(&ledger, &statement, &index, &registry, &cfg);
        assert!(results.is_empty());
        assert!(!registry.is_claimed(Side::Ledger, 0));
        assert!(!registry.is_claimed(Side::Statement, 0));
    }

    #[test]
    fn claimed_records_are_skipped() {
        let cfg = config();
        let ledger = vec![record("L1", 0, "2024-01-05", 10000, "payment")];
        let statement = vec![record("S1", 0, "2024-01-05", 10000, "payment")];
        let index = BucketIndex::build(&ledger, &statement, &cfg);
        let registry = ClaimRegistry::new(1, 1);
        registry.claim(Side::Statement, 0);
        let results = fuzzy_pass(&ledger, &statement, &index, &registry, &cfg);
        assert!(results.is_empty());
    }
}
