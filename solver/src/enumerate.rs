use std::collections::BTreeSet;
use std::time::Instant;

use tracing::debug;

use crate::config::Configuration;
use crate::constraint::{Constraint, Verdict};
use crate::error::SolverError;
use crate::group::Group;
use crate::infer::Inferrer;

/// Maximum number of nested case splits per group. Past the bound one
/// arbitrary consistent completion is accepted instead of branching further,
/// trading enumeration completeness for termination on pathological groups.
pub const MAX_SPLIT_DEPTH: usize = 5;

/// A partial configuration awaiting further case splits.
struct Pending {
    config: Configuration,
    depth: usize,
}

pub(crate) fn check_deadline(deadline: Option<Instant>) -> Result<(), SolverError> {
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Err(SolverError::GuessTimeout);
    }
    Ok(())
}

/// Enumerates the consistent full assignments of one group's variables.
///
/// Works an explicit stack of partial configurations: each step picks an
/// undetermined variable, assumes it safe and then mined, re-runs propagation
/// under each assumption, and keeps every branch that survives. When the
/// split depth bound is hit the branch collapses to a single consistent
/// completion, so the result may be a proper subset of all assignments.
pub fn enumerate_group(
    group: &Group,
    deadline: Option<Instant>,
) -> Result<Vec<Configuration>, SolverError> {
    let mut accepted: BTreeSet<Configuration> = BTreeSet::new();
    let mut stack = vec![Pending {
        config: Configuration::unknown(group.variables().iter().copied()),
        depth: 0,
    }];

    while let Some(Pending { config, depth }) = stack.pop() {
        check_deadline(deadline)?;

        let Some(variable) = config.first_unknown() else {
            accepted.insert(config);
            continue;
        };

        for verdict in [Verdict::Safe, Verdict::Mined] {
            let Some(candidate) = branch(group, &config, variable, verdict) else {
                // Contradictory under this assumption; discard the branch.
                continue;
            };
            if candidate.is_solved() {
                accepted.insert(candidate);
            } else if depth < MAX_SPLIT_DEPTH {
                stack.push(Pending {
                    config: candidate,
                    depth: depth + 1,
                });
            } else if let Some(completion) =
                first_consistent_completion(group, candidate, deadline)?
            {
                accepted.insert(completion);
            }
        }
    }

    debug!(
        variables = group.variables().len(),
        configurations = accepted.len(),
        "enumerated group"
    );
    Ok(accepted.into_iter().collect())
}

/// Re-runs deduction over the group's constraints with the partial
/// configuration and one extra assumption pinned as unit constraints.
/// Returns the refined configuration, or `None` when the assumption is
/// contradictory.
fn branch(
    group: &Group,
    partial: &Configuration,
    variable: usize,
    verdict: Verdict,
) -> Option<Configuration> {
    let mut inferrer = Inferrer::from_constraints(group.constraints().iter().cloned());
    for solution in partial.fixed_solutions() {
        inferrer.add_constraint(Constraint::unit(solution.cell, solution.verdict));
    }
    inferrer.assume(variable, verdict);
    inferrer.propagate();
    if inferrer.contradictory() {
        return None;
    }
    Some(partial.with_solutions(inferrer.solutions()))
}

/// Extends a partial configuration to one full consistent assignment by
/// taking the first surviving verdict for each variable in turn, without
/// branching. This is the explicit depth-bound fallback; it can miss a
/// completion that full backtracking would find, in which case the branch is
/// dropped.
pub fn first_consistent_completion(
    group: &Group,
    mut config: Configuration,
    deadline: Option<Instant>,
) -> Result<Option<Configuration>, SolverError> {
    while let Some(variable) = config.first_unknown() {
        check_deadline(deadline)?;
        let next = branch(group, &config, variable, Verdict::Safe)
            .or_else(|| branch(group, &config, variable, Verdict::Mined));
        match next {
            Some(refined) => config = refined,
            None => return Ok(None),
        }
    }
    Ok(Some(config))
}
