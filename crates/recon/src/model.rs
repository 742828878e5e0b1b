use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A raw tabular row after the caller has mapped its columns.
/// All fields are still strings; the normalizer owns parsing.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub id: String,
    pub date: String,
    pub amount: String,
    pub reference: String,
}

/// The two datasets of a run, in original row order.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub ledger: Vec<RawRecord>,
    pub statement: Vec<RawRecord>,
}

/// Which dataset a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Ledger,
    Statement,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ledger => write!(f, "ledger"),
            Self::Statement => write!(f, "statement"),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized records
// ---------------------------------------------------------------------------

/// A normalized record. Immutable once created; only its claim state
/// (held in the run's claim registry, not here) changes during a run.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    /// Original row position. Tie-break order only, never correctness.
    pub origin_index: usize,
    pub date: NaiveDate,
    /// Signed amount in minor units. Never a float.
    pub amount_minor: i64,
    /// Trimmed, case-folded, whitespace-collapsed reference text.
    pub reference: String,
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Why a raw record was excluded from matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Date field did not parse.
    BadDate,
    /// Amount field did not parse.
    BadAmount,
    /// Same id already seen on this side; the first occurrence wins.
    DuplicateId,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadDate => write!(f, "bad_date"),
            Self::BadAmount => write!(f, "bad_amount"),
            Self::DuplicateId => write!(f, "duplicate_id"),
        }
    }
}

/// One manifest entry. The engine never drops a record silently:
/// anything not matched or categorized shows up here.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub side: Side,
    pub record_id: String,
    pub origin_index: usize,
    pub reason: SkipReason,
    /// The offending field value, for operator triage.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Terminal category. Every normalized record lands in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ExactMatched,
    FuzzyMatched,
    SplitMatched,
    UnmatchedLedger,
    UnmatchedStatement,
    ForeignCredit,
    Duplicate,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactMatched => write!(f, "exact_matched"),
            Self::FuzzyMatched => write!(f, "fuzzy_matched"),
            Self::SplitMatched => write!(f, "split_matched"),
            Self::UnmatchedLedger => write!(f, "unmatched_ledger"),
            Self::UnmatchedStatement => write!(f, "unmatched_statement"),
            Self::ForeignCredit => write!(f, "foreign_credit"),
            Self::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// Component breakdown of a fuzzy score. Each component is in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreParts {
    pub text: f64,
    pub date: f64,
    pub amount: f64,
}

/// Final disposition of one or more records.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub category: Category,
    pub ledger_ids: Vec<String>,
    pub statement_ids: Vec<String>,
    /// 1.0 for exact and split matches, the fuzzy total otherwise,
    /// 0.0 for the unmatched categories.
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_parts: Option<ScoreParts>,
    /// Ledger-minus-statement amount delta in minor units, where both
    /// sides participate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_minor: Option<i64>,
}

// ---------------------------------------------------------------------------
// Summary + Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub ledger_records: usize,
    pub statement_records: usize,
    pub exact_matched: usize,
    pub fuzzy_matched: usize,
    pub split_matched: usize,
    pub unmatched_ledger: usize,
    pub unmatched_statement: usize,
    pub foreign_credits: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
}

/// Everything a run produces. Working state (buckets, claim registry)
/// is discarded; this is the only thing callers keep.
#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: RunSummary,
    pub results: Vec<MatchResult>,
    pub manifest: Vec<SkippedRecord>,
}

impl ReconReport {
    /// True when every record paired up: nothing unmatched, foreign,
    /// duplicated, or skipped.
    pub fn fully_reconciled(&self) -> bool {
        self.summary.unmatched_ledger == 0
            && self.summary.unmatched_statement == 0
            && self.summary.foreign_credits == 0
            && self.summary.duplicates == 0
            && self.summary.skipped == 0
    }
}
