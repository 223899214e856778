use std::collections::BTreeMap;

use crate::constraint::{Solution, Verdict};

/// Per-cell hypothesis inside a configuration. `Unknown` marks a variable the
/// case split has not pinned down yet; the explicit third state keeps every
/// match exhaustive instead of leaning on a null convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Assignment {
    Safe,
    Mined,
    Unknown,
}

impl From<Verdict> for Assignment {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Safe => Assignment::Safe,
            Verdict::Mined => Assignment::Mined,
        }
    }
}

/// One hypothesis for the mined/safe status of every variable in a group.
///
/// Configurations are immutable values: refining one with new solutions
/// allocates a new configuration, so they can serve as set elements without
/// aliasing hazards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Configuration {
    assignments: BTreeMap<usize, Assignment>,
}

impl Configuration {
    /// A configuration over `variables` with every cell still undetermined.
    pub fn unknown(variables: impl IntoIterator<Item = usize>) -> Self {
        Configuration {
            assignments: variables
                .into_iter()
                .map(|v| (v, Assignment::Unknown))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Configuration {
            assignments: BTreeMap::new(),
        }
    }

    pub fn assignments(&self) -> &BTreeMap<usize, Assignment> {
        &self.assignments
    }

    pub fn get(&self, cell: usize) -> Assignment {
        self.assignments
            .get(&cell)
            .copied()
            .unwrap_or(Assignment::Unknown)
    }

    /// A new configuration with the given solutions folded in. Solutions for
    /// cells outside this configuration's variable universe are ignored.
    pub fn with_solutions(&self, solutions: impl IntoIterator<Item = Solution>) -> Self {
        let mut assignments = self.assignments.clone();
        for solution in solutions {
            if let Some(slot) = assignments.get_mut(&solution.cell) {
                *slot = solution.verdict.into();
            }
        }
        Configuration { assignments }
    }

    /// Solved variables read back as unit solutions, for seeding an inferrer.
    pub fn fixed_solutions(&self) -> Vec<Solution> {
        self.assignments
            .iter()
            .filter_map(|(&cell, &assignment)| match assignment {
                Assignment::Safe => Some(Solution {
                    cell,
                    verdict: Verdict::Safe,
                }),
                Assignment::Mined => Some(Solution {
                    cell,
                    verdict: Verdict::Mined,
                }),
                Assignment::Unknown => None,
            })
            .collect()
    }

    /// Solved when no variable remains `Unknown`.
    pub fn is_solved(&self) -> bool {
        self.assignments
            .values()
            .all(|&a| a != Assignment::Unknown)
    }

    /// The smallest still-undetermined variable, if any. Picking the smallest
    /// keeps enumeration deterministic.
    pub fn first_unknown(&self) -> Option<usize> {
        self.assignments
            .iter()
            .find(|&(_, &a)| a == Assignment::Unknown)
            .map(|(&cell, _)| cell)
    }

    /// Number of variables assigned `Mined`.
    pub fn mine_count(&self) -> i64 {
        self.assignments
            .values()
            .filter(|&&a| a == Assignment::Mined)
            .count() as i64
    }

    /// Combines two configurations over disjoint variable sets by union.
    pub fn union(&self, other: &Configuration) -> Configuration {
        debug_assert!(
            self.assignments
                .keys()
                .all(|k| !other.assignments.contains_key(k)),
            "union is only defined for variable-disjoint configurations"
        );
        let mut assignments = self.assignments.clone();
        assignments.extend(other.assignments.iter().map(|(&k, &v)| (k, v)));
        Configuration { assignments }
    }
}
