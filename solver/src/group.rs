use std::collections::BTreeSet;

use crate::constraint::Constraint;

/// A maximal cluster of constraints connected by shared variables. Groups
/// partition the residual variable universe, so each one can be enumerated
/// independently and the results combined by union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    constraints: Vec<Constraint>,
    variables: BTreeSet<usize>,
}

impl Group {
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn variables(&self) -> &BTreeSet<usize> {
        &self.variables
    }
}

/// Partitions constraints into variable-disjoint connected components by
/// seed expansion: grow a group from one constraint, absorbing every
/// constraint that shares a variable with the frontier, until it closes.
pub fn group_constraints(constraints: impl IntoIterator<Item = Constraint>) -> Vec<Group> {
    let mut remaining: Vec<Constraint> = constraints.into_iter().collect();
    let mut groups = Vec::new();

    while let Some(seed) = remaining.pop() {
        let mut variables: BTreeSet<usize> = seed.variables().iter().copied().collect();
        let mut members = vec![seed];

        loop {
            let (touching, rest): (Vec<Constraint>, Vec<Constraint>) = remaining
                .into_iter()
                .partition(|c| c.variables().iter().any(|v| variables.contains(v)));
            remaining = rest;
            if touching.is_empty() {
                break;
            }
            for constraint in touching {
                variables.extend(constraint.variables().iter().copied());
                members.push(constraint);
            }
        }

        groups.push(Group {
            constraints: members,
            variables,
        });
    }

    // Deterministic output order regardless of input order.
    groups.sort_by(|a, b| a.variables.first().cmp(&b.variables.first()));
    groups
}
