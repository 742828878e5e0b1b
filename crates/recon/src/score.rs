use crate::config::EngineConfig;
use crate::model::{Record, ScoreParts};
use crate::text;

/// A scored ledger/statement pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub total: f64,
    pub parts: ScoreParts,
}

/// Score one ledger/statement pair. Pure function.
///
/// Returns `None` when the pair is disqualified outright (amount signs
/// differ, or |Δamount| exceeds the tolerance) or the weighted total
/// falls below the configured threshold. A delta exactly at the
/// tolerance is still a candidate.
pub fn score_pair(ledger: &Record, statement: &Record, config: &EngineConfig) -> Option<Score> {
    if ledger.amount_minor.signum() != statement.amount_minor.signum() {
        return None;
    }
    if (ledger.amount_minor - statement.amount_minor).abs() > config.amount_tolerance_minor {
        return None;
    }

    let text = text::similarity(&ledger.reference, &statement.reference);
    let date = date_component(ledger, statement, config.date_tolerance_days);
    let amount = amount_component(ledger, statement, config.amount_tolerance_minor);

    let w = &config.weights;
    let total = w.text * text + w.date * date + w.amount * amount;

    if total < config.score_threshold {
        return None;
    }

    Some(Score {
        total,
        parts: ScoreParts { text, date, amount },
    })
}

/// `1 - min(1, |Δdays| / tolerance)`; degenerates to exact-day match
/// when the tolerance is zero.
fn date_component(ledger: &Record, statement: &Record, tolerance_days: u32) -> f64 {
    let delta_days = (ledger.date - statement.date).num_days().unsigned_abs();
    if tolerance_days == 0 {
        return if delta_days == 0 { 1.0 } else { 0.0 };
    }
    1.0 - (delta_days as f64 / f64::from(tolerance_days)).min(1.0)
}

/// `1` on exact equality, else `1 - min(1, |Δ| / tolerance)`.
fn amount_component(ledger: &Record, statement: &Record, tolerance_minor: i64) -> f64 {
    let delta = (ledger.amount_minor - statement.amount_minor).abs();
    if delta == 0 {
        return 1.0;
    }
    if tolerance_minor == 0 {
        return 0.0;
    }
    1.0 - (delta as f64 / tolerance_minor as f64).min(1.0)
}
