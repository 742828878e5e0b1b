use ordered_float::OrderedFloat;

use crate::claim::ClaimRegistry;
use crate::config::EngineConfig;
use crate::index::DateIndex;
use crate::model::{Category, MatchResult, Record, Side};
use crate::text;

/// Upper bound on tied minimal solutions kept for re-ranking.
const MAX_TIED_SOLUTIONS: usize = 16;

// ---------------------------------------------------------------------------
// Pass entry point
// ---------------------------------------------------------------------------

/// Resolve aggregated transactions on the post-fuzzy residue:
/// one record on one side whose counterpart is a group of 2..=K
/// records summing to its amount within tolerance. Ledger-led groups
/// are searched first, then statement-led over what remains.
pub fn split_pass(
    ledger: &[Record],
    statement: &[Record],
    registry: &ClaimRegistry,
    config: &EngineConfig,
) -> Vec<MatchResult> {
    let mut results = resolve_direction(Side::Ledger, ledger, statement, registry, config);
    results.extend(resolve_direction(
        Side::Statement,
        statement,
        ledger,
        registry,
        config,
    ));
    results
}

/// One direction: each unclaimed `targets` record against subsets of
/// unclaimed `pool` records in its date neighborhood.
fn resolve_direction(
    target_side: Side,
    targets: &[Record],
    pool: &[Record],
    registry: &ClaimRegistry,
    config: &EngineConfig,
) -> Vec<MatchResult> {
    let pool_index = DateIndex::build(pool, config);
    let window_days = i64::from(config.bucket_window_days);

    // Largest absolute amounts first: a big settlement is the likely
    // aggregation target, and the order is deterministic.
    let mut target_order = registry.unclaimed(target_side);
    target_order.sort_by(|&a, &b| {
        targets[b]
            .amount_minor
            .abs()
            .cmp(&targets[a].amount_minor.abs())
            .then_with(|| targets[a].origin_index.cmp(&targets[b].origin_index))
    });

    let pool_side = match target_side {
        Side::Ledger => Side::Statement,
        Side::Statement => Side::Ledger,
    };

    let mut results = Vec::new();
    for ti in target_order {
        if registry.is_claimed(target_side, ti) {
            continue;
        }
        let target = &targets[ti];

        let available: Vec<usize> = pool_index
            .neighborhood(target.date)
            .into_iter()
            .filter(|&pi| !registry.is_claimed(pool_side, pi))
            .filter(|&pi| {
                (pool[pi].date - target.date).num_days().abs() <= window_days
            })
            .filter(|&pi| pool[pi].amount_minor.signum() == target.amount_minor.signum())
            .collect();
        if available.len() < 2 {
            continue;
        }

        let amounts: Vec<i64> = available.iter().map(|&pi| pool[pi].amount_minor).collect();
        let search = SubsetSearch::run(
            &amounts,
            target.amount_minor,
            config.amount_tolerance_minor,
            config.max_split_group_size,
            config.max_search_nodes,
        );
        if search.tied.is_empty() {
            continue;
        }

        let chosen = pick_best_group(&search.tied, &available, pool, target);
        let members: Vec<usize> = chosen.iter().map(|&si| available[si]).collect();

        if !registry.claim_group(target_side, ti, &members) {
            continue;
        }

        let member_sum: i64 = members.iter().map(|&pi| pool[pi].amount_minor).sum();
        // Id order, not normalized-vector order: vector positions
        // follow input row order, and the output must not.
        let mut member_ids: Vec<String> = members.iter().map(|&pi| pool[pi].id.clone()).collect();
        member_ids.sort_unstable();
        let (ledger_ids, statement_ids, delta_minor) = match target_side {
            Side::Ledger => (
                vec![target.id.clone()],
                member_ids,
                target.amount_minor - member_sum,
            ),
            Side::Statement => (
                member_ids,
                vec![target.id.clone()],
                member_sum - target.amount_minor,
            ),
        };

        results.push(MatchResult {
            category: Category::SplitMatched,
            ledger_ids,
            statement_ids,
            confidence: 1.0,
            score_parts: None,
            delta_minor: Some(delta_minor),
        });
    }

    results
}

/// Re-rank tied minimal groups: highest mean member-to-target text
/// similarity, then lowest combined origin_index, then member ids as
/// the final deterministic tie-break.
fn pick_best_group(
    tied: &[Vec<usize>],
    available: &[usize],
    pool: &[Record],
    target: &Record,
) -> Vec<usize> {
    if tied.len() == 1 {
        return tied[0].clone();
    }

    let mut scored: Vec<_> = tied
        .iter()
        .map(|subset| {
            let mean_sim: f64 = subset
                .iter()
                .map(|&si| text::similarity(&pool[available[si]].reference, &target.reference))
                .sum::<f64>()
                / subset.len() as f64;
            let origin_sum: usize = subset
                .iter()
                .map(|&si| pool[available[si]].origin_index)
                .sum();
            let mut ids: Vec<&str> = subset
                .iter()
                .map(|&si| pool[available[si]].id.as_str())
                .collect();
            ids.sort_unstable();
            (
                std::cmp::Reverse(OrderedFloat(mean_sim)),
                origin_sum,
                ids.join(","),
                subset,
            )
        })
        .collect();
    scored.sort();
    scored[0].3.clone()
}

// ---------------------------------------------------------------------------
// Bounded subset-sum search
// ---------------------------------------------------------------------------

struct SubsetSearch {
    target: i64,
    tolerance: i64,
    max_len: usize,
    max_nodes: u64,
    /// All minimal-size subsets within tolerance, up to
    /// MAX_TIED_SOLUTIONS, as indices into the amounts slice.
    tied: Vec<Vec<usize>>,
    best_len: usize,
    nodes_visited: u64,
    cap_hit: bool,
}

impl SubsetSearch {
    /// Depth-first over index-ordered subsets of size 2..=max_len,
    /// pruned to never go deeper than the smallest solution found and
    /// capped at `max_nodes` visits. The enumeration order is
    /// deterministic, so the tied set is too, even when the cap
    /// truncates it.
    fn run(amounts: &[i64], target: i64, tolerance: i64, max_len: usize, max_nodes: usize) -> Self {
        let mut search = Self {
            target,
            tolerance,
            max_len,
            max_nodes: max_nodes as u64,
            tied: Vec::new(),
            best_len: max_len + 1,
            nodes_visited: 0,
            cap_hit: false,
        };
        let mut stack = Vec::new();
        search.dfs(amounts, 0, 0, &mut stack);
        search
    }

    fn dfs(&mut self, amounts: &[i64], start: usize, sum: i64, stack: &mut Vec<usize>) {
        if self.cap_hit {
            return;
        }
        self.nodes_visited += 1;
        if self.nodes_visited >= self.max_nodes {
            self.cap_hit = true;
            return;
        }

        if stack.len() >= 2 && (sum - self.target).abs() <= self.tolerance {
            match stack.len().cmp(&self.best_len) {
                std::cmp::Ordering::Less => {
                    self.tied.clear();
                    self.tied.push(stack.clone());
                    self.best_len = stack.len();
                }
                std::cmp::Ordering::Equal => {
                    if self.tied.len() < MAX_TIED_SOLUTIONS {
                        self.tied.push(stack.clone());
                    }
                }
                std::cmp::Ordering::Greater => {}
            }
        }

        // Extending past the smallest solution size (or the group cap)
        // cannot improve the result; equal-size ties are still reached
        // because the bound allows filling up to best_len exactly.
        if stack.len() >= self.best_len.min(self.max_len) {
            return;
        }

        for i in start..amounts.len() {
            stack.push(i);
            self.dfs(amounts, i + 1, sum + amounts[i], stack);
            stack.pop();
            if self.cap_hit {
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

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
        EngineConfig::default()
    }

    #[test]
    fn ledger_led_split() {
        let ledger = vec![record("2", 0, "2024-02-01", 25000, "payroll feb")];
        let statement = vec![
            record("B", 0, "2024-02-01", 10000, "payroll feb part 1"),
            record("C", 1, "2024-02-01", 15000, "payroll feb part 2"),
        ];
        let registry = ClaimRegistry::new(1, 2);
        let results = split_pass(&ledger, &statement, &registry, &config());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category, Category::SplitMatched);
        assert_eq!(results[0].ledger_ids, vec!["2"]);
        assert_eq!(results[0].statement_ids, vec!["B", "C"]);
        assert_eq!(results[0].delta_minor, Some(0));
        assert_eq!(results[0].confidence, 1.0);
    }

    #[test]
    fn statement_led_split() {
        let ledger = vec![
            record("L1", 0, "2024-02-01", 4000, "fees"),
            record("L2", 1, "2024-02-02", 6000, "fees"),
        ];
        let statement = vec![record("S1", 0, "2024-02-01", 10000, "monthly fees")];
        let registry = ClaimRegistry::new(2, 1);
        let results = split_pass(&ledger, &statement, &registry, &config());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ledger_ids, vec!["L1", "L2"]);
        assert_eq!(results[0].statement_ids, vec!["S1"]);
    }

    #[test]
    fn member_ids_independent_of_input_order() {
        let ledger = vec![record("T", 0, "2024-02-01", 9000, "settlement")];
        let forward = vec![
            record("B", 0, "2024-02-01", 6000, "settlement a"),
            record("C", 1, "2024-02-02", 3000, "settlement b"),
        ];
        let reversed = vec![
            record("C", 0, "2024-02-02", 3000, "settlement b"),
            record("B", 1, "2024-02-01", 6000, "settlement a"),
        ];

        let registry = ClaimRegistry::new(1, 2);
        let a = split_pass(&ledger, &forward, &registry, &config());
        let registry = ClaimRegistry::new(1, 2);
        let b = split_pass(&ledger, &reversed, &registry, &config());

        assert_eq!(a.len(), 1);
        assert_eq!(a[0].statement_ids, vec!["B", "C"]);
        assert_eq!(a[0].statement_ids, b[0].statement_ids);
    }

    #[test]
    fn fewest_members_preferred() {
        let ledger = vec![record("T", 0, "2024-02-01", 10000, "x")];
        let statement = vec![
            record("A", 0, "2024-02-01", 2500, "x"),
            record("B", 1, "2024-02-01", 2500, "x"),
            record("C", 2, "2024-02-01", 5000, "x"),
            record("D", 3, "2024-02-01", 5000, "x"),
        ];
        let registry = ClaimRegistry::new(1, 4);
        let results = split_pass(&ledger, &statement, &registry, &config());
        assert_eq!(results.len(), 1);
        // {C, D} (2 members) beats {A, B, C} or {A, B, D} (3 members).
        assert_eq!(results[0].statement_ids, vec!["C", "D"]);
    }

    #[test]
    fn tie_broken_by_text_similarity() {
        let ledger = vec![record("T", 0, "2024-02-01", 10000, "vendor alpha")];
        // Two disjoint two-member groups both sum exactly; the pair
        // whose references resemble the target wins.
        let statement = vec![
            record("A", 0, "2024-02-01", 4000, "zzqq 98"),
            record("B", 1, "2024-02-01", 6000, "qqzz 41"),
            record("C", 2, "2024-02-01", 4000, "vendor alpha 1"),
            record("D", 3, "2024-02-01", 6000, "vendor alpha 2"),
        ];
        let registry = ClaimRegistry::new(1, 4);
        let results = split_pass(&ledger, &statement, &registry, &config());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].statement_ids, vec!["C", "D"]);
    }

    #[test]
    fn group_size_cap_leaves_unmatched() {
        let cfg = EngineConfig {
            max_split_group_size: 2,
            ..config()
        };
        let ledger = vec![record("T", 0, "2024-02-01", 30000, "x")];
        let statement: Vec<Record> = (0..3)
            .map(|i| record(&format!("S{i}"), i, "2024-02-01", 10000, "x"))
            .collect();
        let registry = ClaimRegistry::new(1, 3);
        let results = split_pass(&ledger, &statement, &registry, &cfg);
        // The true split needs 3 members but K = 2: left unmatched,
        // never mismatched.
        assert!(results.is_empty());
        assert!(!registry.is_claimed(Side::Ledger, 0));
    }

    #[test]
    fn split_respects_amount_tolerance() {
        let cfg = EngineConfig {
            amount_tolerance_minor: 50,
            ..config()
        };
        let ledger = vec![record("T", 0, "2024-02-01", 10000, "x")];
        let statement = vec![
            record("A", 0, "2024-02-01", 4000, "x"),
            record("B", 1, "2024-02-01", 6050, "x"),
        ];
        let registry = ClaimRegistry::new(1, 2);
        let results = split_pass(&ledger, &statement, &registry, &cfg);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].delta_minor, Some(-50));

        // One unit past tolerance: no group.
        let statement = vec![
            record("A", 0, "2024-02-01", 4000, "x"),
            record("B", 1, "2024-02-01", 6051, "x"),
        ];
        let registry = ClaimRegistry::new(1, 2);
        assert!(split_pass(&ledger, &statement, &registry, &cfg).is_empty());
    }

    #[test]
    fn sign_mismatch_members_excluded() {
        let ledger = vec![record("T", 0, "2024-02-01", 2000, "x")];
        let statement = vec![
            record("A", 0, "2024-02-01", 5000, "x"),
            record("B", 1, "2024-02-01", -3000, "x"),
        ];
        let registry = ClaimRegistry::new(1, 2);
        // 5000 + (-3000) = 2000, but mixed-sign groups are not splits.
        assert!(split_pass(&ledger, &statement, &registry, &config()).is_empty());
    }

    #[test]
    fn distant_dates_not_grouped() {
        let ledger = vec![record("T", 0, "2024-02-01", 10000, "x")];
        let statement = vec![
            record("A", 0, "2024-02-01", 4000, "x"),
            record("B", 1, "2024-03-15", 6000, "x"),
        ];
        let registry = ClaimRegistry::new(1, 2);
        assert!(split_pass(&ledger, &statement, &registry, &config()).is_empty());
    }

    #[test]
    fn node_cap_is_safe_and_deterministic() {
        let cfg = EngineConfig {
            max_search_nodes: 8,
            ..config()
        };
        let ledger = vec![record("T", 0, "2024-02-01", 100_000, "x")];
        let statement: Vec<Record> = (0..12)
            .map(|i| record(&format!("S{i}"), i, "2024-02-01", 1000 * (i as i64 + 1), "x"))
            .collect();
        let registry = ClaimRegistry::new(1, 12);
        let first = split_pass(&ledger, &statement, &registry, &cfg);
        let registry = ClaimRegistry::new(1, 12);
        let second = split_pass(&ledger, &statement, &registry, &cfg);
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn subset_search_finds_minimal_groups() {
        let amounts = [2500, 2500, 5000, 5000];
        let search = SubsetSearch::run(&amounts, 10000, 0, 4, 50_000);
        assert_eq!(search.best_len, 2);
        assert_eq!(search.tied, vec![vec![2, 3]]);
        assert!(!search.cap_hit);
        assert!(search.nodes_visited > 0);
    }
}
