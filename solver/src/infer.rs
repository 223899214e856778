use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use tracing::{debug, trace};

use crate::board::{CellStatus, Snapshot};
use crate::constraint::{Constraint, Solution, Verdict};
use crate::error::SolverError;

/// One local constraint per boundary cell: its unknown neighbors must hold
/// exactly (mine-adjacency count - already-flagged neighbors) mines.
pub fn local_constraints(snapshot: &Snapshot) -> Vec<Constraint> {
    snapshot
        .boundary_cells()
        .into_iter()
        .map(|id| {
            let CellStatus::Opened(count) = snapshot.status(id) else {
                unreachable!("boundary cells are opened by construction");
            };
            let unknown_neighbors: Vec<usize> = snapshot
                .neighbors(id)
                .iter()
                .copied()
                .filter(|&n| matches!(snapshot.status(n), CellStatus::Unknown))
                .collect();
            let flagged_neighbors = snapshot
                .neighbors(id)
                .iter()
                .filter(|&&n| matches!(snapshot.status(n), CellStatus::Flagged))
                .count();
            Constraint::new(unknown_neighbors, count as i64 - flagged_neighbors as i64)
        })
        .collect()
}

/// The global constraint: all unknown cells together hold exactly the
/// unflagged remainder of the mine budget.
pub fn global_constraint(snapshot: &Snapshot) -> Option<Constraint> {
    let unknown = snapshot.unknown_cells();
    if unknown.is_empty() {
        return None;
    }
    let mines_left = snapshot.mines_left();
    Some(Constraint::new(unknown, mines_left))
}

/// The deduction engine: applies trivial resolution and pairwise subtraction
/// to a fixpoint, accumulating certain per-cell solutions.
///
/// The engine owns its collections exclusively and rebuilds them each pass
/// rather than mutating constraints in place.
pub struct Inferrer {
    constraints: HashSet<Constraint>,
    solutions: BTreeMap<usize, Verdict>,
    contradictory: bool,
}

impl Inferrer {
    pub fn from_constraints(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        Inferrer {
            constraints: constraints.into_iter().collect(),
            solutions: BTreeMap::new(),
            contradictory: false,
        }
    }

    /// Local constraints only; used by scoring, where the mine budget is
    /// applied combinatorially instead.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::from_constraints(local_constraints(snapshot))
    }

    /// Local constraints plus the global mine-count constraint; used by the
    /// certain-deduction entry point.
    pub fn with_global(snapshot: &Snapshot) -> Self {
        let mut constraints = local_constraints(snapshot);
        constraints.extend(global_constraint(snapshot));
        Self::from_constraints(constraints)
    }

    /// Adds an assumption as a unit constraint.
    pub fn assume(&mut self, cell: usize, verdict: Verdict) {
        self.constraints.insert(Constraint::unit(cell, verdict));
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.insert(constraint);
    }

    /// True once any pass derived an infeasible constraint or two conflicting
    /// solutions for the same cell. The current branch is then infeasible.
    pub fn contradictory(&self) -> bool {
        self.contradictory
    }

    pub fn solutions(&self) -> impl Iterator<Item = Solution> + '_ {
        self.solutions
            .iter()
            .map(|(&cell, &verdict)| Solution { cell, verdict })
    }

    /// Constraints the fixpoint could not resolve.
    pub fn residual(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    /// Runs the fixpoint loop: trivial resolution, pairwise subtraction,
    /// then cleanup with solution substitution, repeated until a full pass
    /// adds no solution and no constraint that has not been seen before.
    pub fn propagate(&mut self) {
        let mut seen: HashSet<Constraint> = self.constraints.clone();
        let mut pass = 0usize;

        loop {
            pass += 1;
            let solutions_before = self.solutions.len();
            let current = std::mem::take(&mut self.constraints);

            // Trivial resolution: a sum of 0 or |variables| pins every
            // variable at once.
            let mut residual: HashSet<Constraint> = HashSet::new();
            for constraint in current {
                if constraint.is_contradiction() {
                    self.contradictory = true;
                    continue;
                }
                if let Some(solutions) = constraint.resolve_trivial() {
                    for solution in solutions {
                        self.record(solution);
                    }
                } else if !constraint.is_empty() {
                    residual.insert(constraint);
                }
            }

            // Pairwise subtraction: eliminate dependent constraints. This is
            // the sole source of non-trivial deductions.
            let pairs: Vec<Constraint> = residual.iter().cloned().collect();
            let mut fresh = false;
            for (x, y) in pairs.iter().cartesian_product(pairs.iter()) {
                let Some(difference) = x.subtract(y) else {
                    continue;
                };
                if difference.sum() < 0 {
                    trace!(?difference, "subtraction produced a negative sum");
                    self.contradictory = true;
                    continue;
                }
                if seen.insert(difference.clone()) {
                    fresh = true;
                }
                residual.insert(difference);
            }

            // Cleanup: substitute every known solution into the survivors,
            // dropping emptied constraints. Units left feasible resolve
            // trivially on the next pass.
            let mut rebuilt: HashSet<Constraint> = HashSet::new();
            for constraint in residual {
                let reduced = self
                    .solutions
                    .iter()
                    .map(|(&cell, &verdict)| Solution { cell, verdict })
                    .fold(constraint, |c, solution| c.without(&solution));
                if reduced.is_contradiction() {
                    self.contradictory = true;
                    continue;
                }
                if reduced.is_empty() {
                    continue;
                }
                if seen.insert(reduced.clone()) {
                    fresh = true;
                }
                rebuilt.insert(reduced);
            }
            self.constraints = rebuilt;

            if self.contradictory {
                debug!(pass, "propagation hit a contradiction");
                break;
            }
            if !fresh && self.solutions.len() == solutions_before {
                break;
            }
        }

        debug!(
            passes = pass,
            solutions = self.solutions.len(),
            residual = self.constraints.len(),
            "propagation reached a fixpoint"
        );
    }

    fn record(&mut self, solution: Solution) {
        match self.solutions.get(&solution.cell) {
            Some(&existing) if existing != solution.verdict => {
                trace!(cell = solution.cell, "conflicting solutions for one cell");
                self.contradictory = true;
            }
            _ => {
                self.solutions.insert(solution.cell, solution.verdict);
            }
        }
    }
}

/// Deduces every provably safe or provably mined cell on the snapshot.
/// Returns an empty set when the position is ambiguous; the caller should
/// then fall back to probability scoring.
pub fn solve(snapshot: &Snapshot) -> Result<Vec<Solution>, SolverError> {
    let mut inferrer = Inferrer::with_global(snapshot);
    inferrer.propagate();
    if inferrer.contradictory() {
        return Err(SolverError::Contradiction);
    }
    Ok(inferrer.solutions().collect())
}
