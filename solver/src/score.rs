use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;

use tracing::debug;

use crate::board::Snapshot;
use crate::config::{Assignment, Configuration};
use crate::enumerate::{check_deadline, enumerate_group};
use crate::error::SolverError;
use crate::group::group_constraints;
use crate::infer::local_constraints;

/// Per-cell safety estimates for one snapshot, plus the selected guess.
#[derive(Debug, Clone, PartialEq)]
pub struct Scorecard {
    safety: BTreeMap<usize, f64>,
    best: Option<usize>,
    expected_floating_mines: f64,
}

impl Scorecard {
    /// Estimated probability that each unknown cell is safe to open.
    pub fn safety(&self) -> &BTreeMap<usize, f64> {
        &self.safety
    }

    pub fn safety_of(&self, cell: usize) -> Option<f64> {
        self.safety.get(&cell).copied()
    }

    /// The least risky cell to open, ties already broken.
    pub fn best(&self) -> Option<usize> {
        self.best
    }

    /// Cells safe in every weighted configuration; these are certain and can
    /// be opened immediately rather than treated as guesses.
    pub fn certain_safe(&self) -> impl Iterator<Item = usize> + '_ {
        self.safety
            .iter()
            .filter(|&(_, &p)| p >= 1.0)
            .map(|(&cell, _)| cell)
    }

    pub fn expected_floating_mines(&self) -> f64 {
        self.expected_floating_mines
    }
}

/// Estimates each unknown cell's probability of being safe.
///
/// Residual local constraints are grouped, each group's consistent
/// configurations enumerated, and the per-group results combined into
/// whole-board configurations. Each one is weighted by the number of ways the
/// leftover mine budget can fall among floating cells; safety probabilities
/// are the weighted fractions. `deadline`, when given, bounds the whole
/// computation; exceeding it is fatal for the game since no fallback move is
/// available.
pub fn score(snapshot: &Snapshot, deadline: Option<Instant>) -> Result<Scorecard, SolverError> {
    let unknown = snapshot.unknown_cells();
    if unknown.is_empty() {
        return Ok(Scorecard {
            safety: BTreeMap::new(),
            best: None,
            expected_floating_mines: 0.0,
        });
    }

    let mines_left = snapshot.mines_left();
    let floating = snapshot.floating_cells();
    let groups = group_constraints(local_constraints(snapshot));

    let mut per_group = Vec::with_capacity(groups.len());
    for group in &groups {
        let configs = enumerate_group(group, deadline)?;
        if configs.is_empty() {
            // A group with no consistent assignment means the board lied.
            return Err(SolverError::Contradiction);
        }
        per_group.push(configs);
    }

    // Cartesian combination across groups, pruning any combination that
    // already overspends the mine budget.
    let mut combos = vec![Configuration::empty()];
    for configs in &per_group {
        check_deadline(deadline)?;
        let mut next = Vec::with_capacity(combos.len() * configs.len());
        for combo in &combos {
            for config in configs {
                let merged = combo.union(config);
                if merged.mine_count() <= mines_left {
                    next.push(merged);
                }
            }
        }
        combos = next;
    }
    if combos.is_empty() {
        return Err(SolverError::Contradiction);
    }

    // Binomial weighting: each configuration counts once per way of
    // distributing the unplaced mines among the floating cells.
    let mut total_weight = 0.0;
    let mut weighted_exposed_mines = 0.0;
    let mut safe_weight: BTreeMap<usize, f64> = BTreeMap::new();
    for combo in &combos {
        let mine_count = combo.mine_count();
        let weight = binomial(floating.len(), mines_left - mine_count);
        if weight == 0.0 {
            continue;
        }
        total_weight += weight;
        weighted_exposed_mines += weight * mine_count as f64;
        for (&cell, &assignment) in combo.assignments() {
            if assignment == Assignment::Safe {
                *safe_weight.entry(cell).or_insert(0.0) += weight;
            }
        }
    }
    if total_weight == 0.0 {
        return Err(SolverError::Contradiction);
    }

    let mut safety = BTreeMap::new();
    for group in &groups {
        for &cell in group.variables() {
            let safe = safe_weight.get(&cell).copied().unwrap_or(0.0);
            safety.insert(cell, safe / total_weight);
        }
    }

    // Whatever the exposed cells do not account for, on average, sits among
    // the floating cells; no finer distinction is derivable for them.
    let expected_floating_mines = mines_left as f64 - weighted_exposed_mines / total_weight;
    if !floating.is_empty() {
        let floating_safety = 1.0 - expected_floating_mines / floating.len() as f64;
        for &cell in &floating {
            safety.insert(cell, floating_safety);
        }
    }

    let best = pick_guess(snapshot, &safety);
    debug!(
        groups = groups.len(),
        combinations = combos.len(),
        floating = floating.len(),
        best,
        "scored snapshot"
    );

    Ok(Scorecard {
        safety,
        best,
        expected_floating_mines,
    })
}

/// Picks the maximum-safety cell. Ties go to the cell with the fewest total
/// neighbors, then the most already-opened neighbors, then the lowest ID.
pub fn pick_guess(snapshot: &Snapshot, safety: &BTreeMap<usize, f64>) -> Option<usize> {
    safety
        .iter()
        .max_by(|(a, sa), (b, sb)| {
            sa.partial_cmp(sb)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    snapshot
                        .neighbors(**b)
                        .len()
                        .cmp(&snapshot.neighbors(**a).len())
                })
                .then_with(|| {
                    snapshot
                        .opened_neighbor_count(**a)
                        .cmp(&snapshot.opened_neighbor_count(**b))
                })
                .then_with(|| b.cmp(a))
        })
        .map(|(&cell, _)| cell)
}

/// C(n, k) as a float; zero outside `0 <= k <= n`. Floats keep large floating
/// regions from overflowing an integer accumulator, and only weight ratios
/// matter downstream.
fn binomial(n: usize, k: i64) -> f64 {
    if k < 0 || k > n as i64 {
        return 0.0;
    }
    let k = (k as usize).min(n - k as usize);
    let mut result = 1.0;
    for i in 1..=k {
        result = result * (n - k + i) as f64 / i as f64;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardState, CellStatus, SnapshotCell};

    fn snapshot_from(cells: Vec<(CellStatus, Vec<usize>)>, total_mines: usize) -> Snapshot {
        let views = cells
            .into_iter()
            .map(|(status, neighbors)| SnapshotCell { status, neighbors })
            .collect();
        Snapshot::new(views, total_mines, BoardState::Ongoing)
    }

    #[test]
    fn binomial_basics() {
        assert_eq!(binomial(5, 2), 10.0);
        assert_eq!(binomial(0, 0), 1.0);
        assert_eq!(binomial(3, 0), 1.0);
        assert_eq!(binomial(3, -1), 0.0);
        assert_eq!(binomial(3, 5), 0.0);
        assert!(binomial(50, 25) > 1e13);
    }

    #[test]
    fn symmetric_pair_scores_half_each() {
        // 2x2 board, every cell adjacent to every other; two opened cells
        // both showing 1, one mine somewhere in the two unknowns.
        let snap = snapshot_from(
            vec![
                (CellStatus::Opened(1), vec![1, 2, 3]),
                (CellStatus::Opened(1), vec![0, 2, 3]),
                (CellStatus::Unknown, vec![0, 1, 3]),
                (CellStatus::Unknown, vec![0, 1, 2]),
            ],
            1,
        );
        // Ambiguous: deduction alone finds nothing.
        assert_eq!(crate::infer::solve(&snap).unwrap(), vec![]);

        let card = score(&snap, None).unwrap();
        assert!((card.safety_of(2).unwrap() - 0.5).abs() < 1e-9);
        assert!((card.safety_of(3).unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(card.expected_floating_mines(), 0.0);
        assert!(card.best().is_some());
    }

    #[test]
    fn probability_mass_is_conserved() {
        // One constrained cell (certainly mined) plus three floating cells
        // sharing the second mine.
        let snap = snapshot_from(
            vec![
                (CellStatus::Opened(1), vec![1]),
                (CellStatus::Unknown, vec![0, 2]),
                (CellStatus::Unknown, vec![1, 3]),
                (CellStatus::Unknown, vec![2, 4]),
                (CellStatus::Unknown, vec![3]),
            ],
            2,
        );
        let card = score(&snap, None).unwrap();

        let exposed_mines: f64 = snap
            .exposed_cells()
            .iter()
            .map(|&cell| 1.0 - card.safety_of(cell).unwrap())
            .sum();
        let conserved = exposed_mines + card.expected_floating_mines();
        assert!((conserved - snap.mines_left() as f64).abs() < 1e-9);

        // The exposed cell is forced mined; the leftover mine spreads evenly.
        assert_eq!(card.safety_of(1).unwrap(), 0.0);
        for cell in [2, 3, 4] {
            assert!((card.safety_of(cell).unwrap() - (1.0 - 1.0 / 3.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn certain_cells_score_one_and_zero() {
        // a+b = 1 and a+b+c = 2 force c mined while a and b stay ambiguous.
        let snap = snapshot_from(
            vec![
                (CellStatus::Opened(1), vec![2, 3]),
                (CellStatus::Opened(2), vec![2, 3, 4]),
                (CellStatus::Unknown, vec![0, 1]),
                (CellStatus::Unknown, vec![0, 1]),
                (CellStatus::Unknown, vec![1]),
            ],
            2,
        );
        let card = score(&snap, None).unwrap();
        assert_eq!(card.safety_of(4).unwrap(), 0.0);
        assert!((card.safety_of(2).unwrap() - 0.5).abs() < 1e-9);
        assert!((card.safety_of(3).unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(card.certain_safe().count(), 0);
    }

    #[test]
    fn certain_safe_lists_fully_safe_cells() {
        // {2,3} = 1 and {2} = 1 pin cell 2 mined, leaving cell 3 safe in
        // every configuration.
        let snap = snapshot_from(
            vec![
                (CellStatus::Opened(1), vec![2, 3]),
                (CellStatus::Opened(1), vec![2]),
                (CellStatus::Unknown, vec![0, 1]),
                (CellStatus::Unknown, vec![0]),
            ],
            1,
        );
        let card = score(&snap, None).unwrap();
        assert_eq!(card.safety_of(2), Some(0.0));
        assert_eq!(card.safety_of(3), Some(1.0));
        assert_eq!(card.certain_safe().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn ties_break_toward_fewer_neighbors() {
        // Cells 1 and 2 are equally safe, but cell 1 touches fewer cells.
        let snap = snapshot_from(
            vec![
                (CellStatus::Opened(1), vec![1, 2]),
                (CellStatus::Unknown, vec![0]),
                (CellStatus::Unknown, vec![0, 3]),
                (CellStatus::Unknown, vec![2]),
            ],
            2,
        );
        let card = score(&snap, None).unwrap();
        assert_eq!(card.safety_of(1), card.safety_of(2));
        assert_eq!(card.best(), Some(1));
    }

    #[test]
    fn unconstrained_boards_score_uniformly() {
        // No opened cells at all: only the global budget says anything.
        let snap = snapshot_from(
            vec![
                (CellStatus::Unknown, vec![1]),
                (CellStatus::Unknown, vec![0, 2]),
                (CellStatus::Unknown, vec![1]),
            ],
            1,
        );
        let card = score(&snap, None).unwrap();
        for cell in 0..3 {
            assert!((card.safety_of(cell).unwrap() - (1.0 - 1.0 / 3.0)).abs() < 1e-9);
        }
        // Uniform safety: tie-breaks favor the cell with fewest neighbors.
        assert_eq!(card.best(), Some(0));
    }

    #[test]
    fn overspent_flag_budget_is_a_contradiction() {
        // Two flags but only one mine on the board.
        let snap = snapshot_from(
            vec![
                (CellStatus::Flagged, vec![1]),
                (CellStatus::Flagged, vec![0, 2]),
                (CellStatus::Unknown, vec![1]),
            ],
            1,
        );
        assert_eq!(score(&snap, None).unwrap_err(), SolverError::Contradiction);
    }
}
