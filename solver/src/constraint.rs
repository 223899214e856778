use std::collections::BTreeSet;

/// A certain determination for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verdict {
    Safe,
    Mined,
}

impl Verdict {
    /// Contribution of this verdict to a constraint sum.
    pub fn mines(self) -> i64 {
        match self {
            Verdict::Safe => 0,
            Verdict::Mined => 1,
        }
    }
}

/// A deduced, certain safe/mined determination for one cell. This is the
/// atomic output of the deduction engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Solution {
    pub cell: usize,
    pub verdict: Verdict,
}

/// A sum constraint over binary "is-mined" variables: the variables must
/// contain exactly `sum` mines.
///
/// Constraints are immutable values. Structural equality is by (variable set,
/// sum), and every "update" allocates a new constraint, so they are safe to
/// keep in hash sets. A derived sum outside `0..=|variables|` signals a
/// contradiction; it is representable so callers can detect it, but must
/// never be silently retained.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Constraint {
    variables: BTreeSet<usize>,
    sum: i64,
}

impl Constraint {
    pub fn new(variables: impl IntoIterator<Item = usize>, sum: i64) -> Self {
        Constraint {
            variables: variables.into_iter().collect(),
            sum,
        }
    }

    /// A single-variable constraint pinning one cell to a verdict.
    pub fn unit(cell: usize, verdict: Verdict) -> Self {
        Constraint {
            variables: BTreeSet::from([cell]),
            sum: verdict.mines(),
        }
    }

    pub fn variables(&self) -> &BTreeSet<usize> {
        &self.variables
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// True when no 0/1 assignment of the variables can reach `sum`.
    pub fn is_contradiction(&self) -> bool {
        self.sum < 0 || self.sum > self.variables.len() as i64
    }

    /// If the sum pins every variable at once (all safe or all mined),
    /// returns the shared verdict.
    pub fn trivial_verdict(&self) -> Option<Verdict> {
        if self.variables.is_empty() {
            None
        } else if self.sum == 0 {
            Some(Verdict::Safe)
        } else if self.sum == self.variables.len() as i64 {
            Some(Verdict::Mined)
        } else {
            None
        }
    }

    /// Resolves a trivial constraint into one solution per variable.
    pub fn resolve_trivial(&self) -> Option<Vec<Solution>> {
        let verdict = self.trivial_verdict()?;
        Some(
            self.variables
                .iter()
                .map(|&cell| Solution { cell, verdict })
                .collect(),
        )
    }

    /// Subtracts `other` from this constraint, eliminating a dependent
    /// equation from the system. Only defined when this constraint's
    /// variables properly contain the other's; the difference can carry a
    /// negative sum, which the caller must treat as a contradiction.
    pub fn subtract(&self, other: &Constraint) -> Option<Constraint> {
        // Proper superset: containment with at least one variable left over.
        if !self.variables.is_superset(&other.variables)
            || self.variables.len() == other.variables.len()
        {
            return None;
        }
        Some(Constraint {
            variables: self.variables.difference(&other.variables).copied().collect(),
            sum: self.sum - other.sum,
        })
    }

    /// A new constraint with one solved variable substituted out.
    pub fn without(&self, solution: &Solution) -> Constraint {
        if !self.variables.contains(&solution.cell) {
            return self.clone();
        }
        let mut variables = self.variables.clone();
        variables.remove(&solution.cell);
        Constraint {
            variables,
            sum: self.sum - solution.verdict.mines(),
        }
    }

    /// Reads a unit constraint back as a solution, when its sum is feasible.
    pub fn as_solution(&self) -> Option<Solution> {
        if self.variables.len() != 1 {
            return None;
        }
        let cell = *self.variables.first()?;
        match self.sum {
            0 => Some(Solution {
                cell,
                verdict: Verdict::Safe,
            }),
            1 => Some(Solution {
                cell,
                verdict: Verdict::Mined,
            }),
            _ => None,
        }
    }
}
