use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};

use crate::config::EngineConfig;
use crate::model::Record;

// ---------------------------------------------------------------------------
// Bucket keys
// ---------------------------------------------------------------------------

/// Coarse (date window × amount granularity) partition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub date_bin: i64,
    pub amount_bin: i64,
}

fn date_bin(date: NaiveDate, window_days: u32) -> i64 {
    i64::from(date.num_days_from_ce()).div_euclid(i64::from(window_days))
}

fn amount_bin(amount_minor: i64, granularity: i64) -> i64 {
    amount_minor.div_euclid(granularity)
}

pub fn bucket_key(record: &Record, config: &EngineConfig) -> BucketKey {
    BucketKey {
        date_bin: date_bin(record.date, config.bucket_window_days),
        amount_bin: amount_bin(record.amount_minor, config.bucket_amount_granularity),
    }
}

// ---------------------------------------------------------------------------
// Pair index
// ---------------------------------------------------------------------------

/// Candidate index for the fuzzy pass.
///
/// Ledger records sit in their home bucket only; statement records are
/// expanded into the ±1 neighborhood on both axes. A true pair whose
/// date and amount differ by at most one window/granularity step lands
/// in adjacent bins at worst, so it is guaranteed to meet in the
/// ledger record's home bucket. Buckets hold indices, not copies.
pub struct BucketIndex {
    ledger_home: BTreeMap<BucketKey, Vec<usize>>,
    statement_near: HashMap<BucketKey, Vec<usize>>,
}

impl BucketIndex {
    pub fn build(ledger: &[Record], statement: &[Record], config: &EngineConfig) -> Self {
        let mut ledger_home: BTreeMap<BucketKey, Vec<usize>> = BTreeMap::new();
        for (i, r) in ledger.iter().enumerate() {
            ledger_home.entry(bucket_key(r, config)).or_default().push(i);
        }

        let mut statement_near: HashMap<BucketKey, Vec<usize>> = HashMap::new();
        for (i, r) in statement.iter().enumerate() {
            let home = bucket_key(r, config);
            for dd in -1..=1 {
                for da in -1..=1 {
                    let key = BucketKey {
                        date_bin: home.date_bin + dd,
                        amount_bin: home.amount_bin + da,
                    };
                    statement_near.entry(key).or_default().push(i);
                }
            }
        }

        Self {
            ledger_home,
            statement_near,
        }
    }

    /// Occupied ledger buckets in deterministic key order. Each is an
    /// independent fuzzy-pass work item.
    pub fn ledger_buckets(&self) -> impl Iterator<Item = (&BucketKey, &Vec<usize>)> {
        self.ledger_home.iter()
    }

    /// Statement candidates reachable from a ledger bucket.
    pub fn statement_candidates(&self, key: &BucketKey) -> &[usize] {
        self.statement_near.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Date-bin index
// ---------------------------------------------------------------------------

/// Date-only locality, used where amount locality cannot hold: split
/// group members sum to their counterpart, so their individual amount
/// bins tell us nothing. Keyed by the same date window as the pair
/// index.
pub struct DateIndex {
    bins: HashMap<i64, Vec<usize>>,
    window_days: u32,
}

impl DateIndex {
    pub fn build(records: &[Record], config: &EngineConfig) -> Self {
        let mut bins: HashMap<i64, Vec<usize>> = HashMap::new();
        for (i, r) in records.iter().enumerate() {
            bins.entry(date_bin(r.date, config.bucket_window_days))
                .or_default()
                .push(i);
        }
        Self {
            bins,
            window_days: config.bucket_window_days,
        }
    }

    /// Indices of records within ±1 date bin of `date`, in ascending
    /// index order.
    pub fn neighborhood(&self, date: NaiveDate) -> Vec<usize> {
        let home = date_bin(date, self.window_days);
        let mut out = Vec::new();
        for bin in home - 1..=home + 1 {
            if let Some(indices) = self.bins.get(&bin) {
                out.extend_from_slice(indices);
            }
        }
        out.sort_unstable();
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
