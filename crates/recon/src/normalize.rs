use std::collections::HashSet;

use chrono::NaiveDate;

use crate::model::{RawRecord, Record, Side, SkipReason, SkippedRecord};

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

/// Parse a decimal amount string to i64 minor units (cents).
/// Integer math only — "0.1 + 0.2" style float drift never enters the
/// engine. Handles "1234.56", "1234.5", "1234", "-1234.56".
pub fn parse_amount_minor(s: &str) -> Result<i64, String> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if s.is_empty() {
        return Err("empty amount".into());
    }
    // One optional leading minus only; i64::parse would otherwise
    // accept signs embedded after it ("--5.00", "5.-0").
    if s.contains(&['-', '+'][..]) {
        return Err(format!("bad amount: {s}"));
    }
    let (units, cents) = if let Some(dot) = s.find('.') {
        let u: i64 = s[..dot]
            .parse()
            .map_err(|e| format!("bad units: {e}"))?;
        let frac = &s[dot + 1..];
        let c: i64 = match frac.len() {
            0 => 0,
            1 => {
                frac.parse::<i64>()
                    .map_err(|e| format!("bad cents: {e}"))?
                    * 10
            }
            2 => frac.parse().map_err(|e| format!("bad cents: {e}"))?,
            _ => return Err(format!("too many decimal places: {s}")),
        };
        (u, c)
    } else {
        (s.parse().map_err(|e| format!("bad amount: {e}"))?, 0)
    };
    let minor = units
        .checked_mul(100)
        .and_then(|v| v.checked_add(cents))
        .ok_or_else(|| format!("amount out of range: {s}"))?;
    Ok(if negative { -minor } else { minor })
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Parse to calendar-day granularity, timezone-naive.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!("unrecognized date: {s}"))
}

/// Trim, case-fold, collapse internal whitespace to single spaces.
pub fn canonical_reference(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.extend(c.to_lowercase());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Dataset normalization
// ---------------------------------------------------------------------------

/// Normalize one side's raw rows into typed records.
///
/// Malformed rows and duplicate ids are not fatal: they go to the
/// manifest and the batch continues. Duplicate ids keep the first
/// occurrence; later occurrences are excluded from matching entirely.
pub fn normalize_side(side: Side, rows: &[RawRecord]) -> (Vec<Record>, Vec<SkippedRecord>) {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();
    let mut seen_ids: HashSet<&str> = HashSet::with_capacity(rows.len());

    for (origin_index, raw) in rows.iter().enumerate() {
        if seen_ids.contains(raw.id.as_str()) {
            skipped.push(SkippedRecord {
                side,
                record_id: raw.id.clone(),
                origin_index,
                reason: SkipReason::DuplicateId,
                value: raw.id.clone(),
            });
            continue;
        }

        let date = match parse_date(&raw.date) {
            Ok(d) => d,
            Err(_) => {
                skipped.push(SkippedRecord {
                    side,
                    record_id: raw.id.clone(),
                    origin_index,
                    reason: SkipReason::BadDate,
                    value: raw.date.clone(),
                });
                continue;
            }
        };

        let amount_minor = match parse_amount_minor(&raw.amount) {
            Ok(a) => a,
            Err(_) => {
                skipped.push(SkippedRecord {
                    side,
                    record_id: raw.id.clone(),
                    origin_index,
                    reason: SkipReason::BadAmount,
                    value: raw.amount.clone(),
                });
                continue;
            }
        };

        seen_ids.insert(raw.id.as_str());
        records.push(Record {
            id: raw.id.clone(),
            origin_index,
            date,
            amount_minor,
            reference: canonical_reference(&raw.reference),
        });
    }

    (records, skipped)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
