use std::sync::atomic::{AtomicBool, Ordering};

use crate::model::Side;

/// Per-run claim state: one atomic cell per record, keyed by the
/// record's position in its side's normalized vector.
///
/// A record can appear in more than one bucket neighborhood, so claim
/// attempts must serialize at the record level, not the bucket level:
/// `claim` is a single compare-and-set, safe under concurrent callers.
/// The registry is created fresh for each run and discarded with it.
pub struct ClaimRegistry {
    ledger: Vec<AtomicBool>,
    statement: Vec<AtomicBool>,
}

impl ClaimRegistry {
    pub fn new(ledger_len: usize, statement_len: usize) -> Self {
        Self {
            ledger: (0..ledger_len).map(|_| AtomicBool::new(false)).collect(),
            statement: (0..statement_len).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    fn cells(&self, side: Side) -> &[AtomicBool] {
        match side {
            Side::Ledger => &self.ledger,
            Side::Statement => &self.statement,
        }
    }

    /// Claim if unclaimed. Returns false if some other result already
    /// holds the record; claims are never released within a pass
    /// sequence except by group rollback below.
    pub fn claim(&self, side: Side, index: usize) -> bool {
        self.cells(side)[index]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_claimed(&self, side: Side, index: usize) -> bool {
        self.cells(side)[index].load(Ordering::Acquire)
    }

    /// Claim one record on each side, all-or-nothing.
    pub fn claim_pair(&self, ledger_index: usize, statement_index: usize) -> bool {
        if !self.claim(Side::Ledger, ledger_index) {
            return false;
        }
        if !self.claim(Side::Statement, statement_index) {
            self.ledger[ledger_index].store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// Claim a whole split group, all-or-nothing: one record on
    /// `one_side` plus two or more on the other. On any failure the
    /// records taken so far are released.
    pub fn claim_group(&self, one_side: Side, one_index: usize, many: &[usize]) -> bool {
        if !self.claim(one_side, one_index) {
            return false;
        }
        let many_side = match one_side {
            Side::Ledger => Side::Statement,
            Side::Statement => Side::Ledger,
        };
        for (taken, &index) in many.iter().enumerate() {
            if !self.claim(many_side, index) {
                for &rollback in &many[..taken] {
                    self.cells(many_side)[rollback].store(false, Ordering::Release);
                }
                self.cells(one_side)[one_index].store(false, Ordering::Release);
                return false;
            }
        }
        true
    }

    /// Indices on `side` still unclaimed, ascending.
    pub fn unclaimed(&self, side: Side) -> Vec<usize> {
        self.cells(side)
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.load(Ordering::Acquire))
            .map(|(i, _)| i)
            .collect()
    }
}
