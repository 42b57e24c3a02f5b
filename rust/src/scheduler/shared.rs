//! LP-guided list scheduling for operator types with a limited instance count.
//!
//! The acyclic program is solved without resource limits first. Operations are
//! then placed in dependence order, each at the later of its LP start time and
//! its predecessors' finish, and delayed to the next cycle at which its
//! operator type has a free instance for the whole latency window. Among ready
//! operations, the one with the smallest LP start time goes first; ties go to
//! the operation registered first.

use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::config::SchedulingConfig;
use crate::error::SchedulingError;
use crate::graph::DependenceGraph;
use crate::problem::{
    checked_end, cycle_overflow, precedence_violation, utilization_violation, OperationId,
    OperatorTypeId, Problem, ProblemKind,
};
use crate::{log_changes, log_checks};

use super::basic::{ensure_acyclic, solve_basic};
use super::formulation::check_last_op;
use super::resource_schedule::ResourceSchedule;

/// Place operations in LP order while respecting operator type limits.
fn resolve_conflicts(
    problem: &Problem,
    lp_starts: &[u32],
    config: &SchedulingConfig,
) -> Result<Vec<u32>, SchedulingError> {
    let graph = DependenceGraph::intra_iteration(problem);
    let n = graph.len();

    let mut schedules: FxHashMap<OperatorTypeId, ResourceSchedule> = problem
        .operator_types()
        .iter()
        .enumerate()
        .filter_map(|(idx, opr)| {
            let id = OperatorTypeId(idx as u32);
            opr.limit
                .map(|limit| (id, ResourceSchedule::new(problem.operator_type_name(id), limit)))
        })
        .collect();

    let mut in_degree: Vec<usize> = graph.predecessors.iter().map(Vec::len).collect();
    let mut earliest = vec![0u32; n];
    let mut starts: Vec<Option<u32>> = vec![None; n];

    let mut ready: BinaryHeap<Reverse<(u32, OperationId)>> = problem
        .operation_ids()
        .filter(|op| in_degree[op.index()] == 0)
        .map(|op| Reverse((lp_starts[op.index()], op)))
        .collect();

    while let Some(Reverse((lp_start, op))) = ready.pop() {
        let latency = problem.latency(op);
        let candidate = lp_start.max(earliest[op.index()]);

        let operator_type = problem.operations()[op.index()].operator_type;
        let start = match schedules.get_mut(&operator_type) {
            Some(schedule) => {
                let start = schedule.next_available_time(candidate, latency);
                schedule
                    .reserve(start, latency)
                    .ok_or_else(|| cycle_overflow(problem, op))?;
                if start > candidate {
                    log_checks!(
                        config.verbosity,
                        "shared: '{}' delayed from {} to {} ({} busy)",
                        problem.operation_name(op),
                        candidate,
                        start,
                        schedule.operator_type
                    );
                }
                start
            }
            None => candidate,
        };
        let end = checked_end(problem, op, start)?;
        starts[op.index()] = Some(start);

        for &(succ, _) in &graph.successors[op.index()] {
            let succ_idx = succ.index();
            earliest[succ_idx] = earliest[succ_idx].max(end);
            in_degree[succ_idx] -= 1;
            if in_degree[succ_idx] == 0 {
                ready.push(Reverse((lp_starts[succ_idx], succ)));
            }
        }
    }

    starts
        .into_iter()
        .enumerate()
        .map(|(idx, start)| {
            start.ok_or_else(|| {
                SchedulingError::SolverInternalError(format!(
                    "'{}' was never ready during conflict resolution",
                    problem.operation_name(OperationId(idx as u32))
                ))
            })
        })
        .collect()
}

/// Schedule an acyclic problem whose operator types may have instance limits.
///
/// Heuristic: the result is feasible but the start time of `last_op` is not
/// guaranteed to be minimal.
///
/// # Returns
/// * `Ok(())` with start times written into the problem
/// * `Err(SchedulingError::MalformedProblem)` if validation fails or a delayed
///   operation would finish after cycle `u32::MAX`
/// * `Err(SchedulingError::CyclicDependence)` if the dependence graph has a cycle
pub fn schedule_simplex_shared(
    problem: &mut Problem,
    last_op: OperationId,
) -> Result<(), SchedulingError> {
    schedule_simplex_shared_with_config(problem, last_op, &SchedulingConfig::default())
}

/// [`schedule_simplex_shared`] with explicit configuration.
pub fn schedule_simplex_shared_with_config(
    problem: &mut Problem,
    last_op: OperationId,
    config: &SchedulingConfig,
) -> Result<(), SchedulingError> {
    problem.validate_for(ProblemKind::SharedPipelinedOperators)?;
    check_last_op(problem, last_op)?;
    ensure_acyclic(problem)?;

    let lp_starts = solve_basic(problem, last_op, config)?;
    let starts = resolve_conflicts(problem, &lp_starts, config)?;

    if let Some(violation) = precedence_violation(problem, &starts, 0)
        .or_else(|| utilization_violation(problem, &starts))
    {
        return Err(SchedulingError::SolverInternalError(violation));
    }

    log_changes!(
        config.verbosity,
        "shared: '{}' starts at {} (LP bound {})",
        problem.operation_name(last_op),
        starts[last_op.index()],
        lp_starts[last_op.index()]
    );
    problem.commit(&starts, None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Operations given as (operator type index, ...) over operator types
    /// given as (latency, limit).
    fn make_problem(
        operator_types: &[(u32, Option<u32>)],
        operations: &[u32],
        edges: &[(u32, u32)],
    ) -> Problem {
        let mut problem = Problem::new();
        for (idx, &(latency, limit)) in operator_types.iter().enumerate() {
            problem.add_operator_type(&format!("t{}", idx), latency, limit);
        }
        for (idx, &opr) in operations.iter().enumerate() {
            problem.add_operation(&format!("op{}", idx), OperatorTypeId(opr));
        }
        for &(src, dst) in edges {
            problem.add_dependence(OperationId(src), OperationId(dst), None);
        }
        problem
    }

    #[test]
    fn test_single_instance_serializes_independent_operations() {
        let mut problem = make_problem(&[(1, Some(1))], &[0, 0], &[]);
        schedule_simplex_shared(&mut problem, OperationId(1)).unwrap();

        let a = problem.start_time(OperationId(0)).unwrap();
        let b = problem.start_time(OperationId(1)).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.min(b), 0);
        assert_eq!(a.max(b), 1);
        assert!(problem.verify().is_ok());
    }

    #[test]
    fn test_unlimited_matches_basic() {
        let mut problem = make_problem(&[(1, None), (2, None)], &[0, 1, 0], &[(0, 1), (1, 2)]);
        schedule_simplex_shared(&mut problem, OperationId(2)).unwrap();

        assert_eq!(problem.start_time(OperationId(0)), Some(0));
        assert_eq!(problem.start_time(OperationId(1)), Some(1));
        assert_eq!(problem.start_time(OperationId(2)), Some(3));
    }

    #[test]
    fn test_delay_propagates_to_successors() {
        // op0 and op1 share a single 2-cycle multiplier; op2 consumes op1
        let mut problem = make_problem(&[(2, Some(1)), (1, None)], &[0, 0, 1], &[(1, 2)]);
        schedule_simplex_shared(&mut problem, OperationId(2)).unwrap();

        let first = problem.start_time(OperationId(0)).unwrap();
        let second = problem.start_time(OperationId(1)).unwrap();
        assert!(first + 2 <= second || second + 2 <= first);
        assert!(problem.start_time(OperationId(2)).unwrap() >= second + 2);
        assert!(problem.verify().is_ok());
    }

    #[test]
    fn test_limit_two_allows_pairs() {
        let mut problem = make_problem(&[(3, Some(2))], &[0, 0, 0, 0], &[]);
        schedule_simplex_shared(&mut problem, OperationId(3)).unwrap();

        let mut starts: Vec<u32> = problem
            .operations()
            .iter()
            .filter_map(|o| o.start_time())
            .collect();
        starts.sort_unstable();
        assert_eq!(starts, vec![0, 0, 3, 3]);
        assert!(problem.verify().is_ok());
    }

    #[test]
    fn test_tie_break_follows_registration_order() {
        let mut problem = make_problem(&[(1, Some(1))], &[0, 0, 0], &[]);
        schedule_simplex_shared(&mut problem, OperationId(0)).unwrap();

        // All LP start times are 0, so registration order decides
        assert_eq!(problem.start_time(OperationId(0)), Some(0));
        assert_eq!(problem.start_time(OperationId(1)), Some(1));
        assert_eq!(problem.start_time(OperationId(2)), Some(2));
    }

    #[test]
    fn test_zero_latency_operations_never_conflict() {
        let mut problem = make_problem(&[(0, Some(1))], &[0, 0], &[]);
        schedule_simplex_shared(&mut problem, OperationId(1)).unwrap();

        assert_eq!(problem.start_time(OperationId(0)), Some(0));
        assert_eq!(problem.start_time(OperationId(1)), Some(0));
    }

    #[test]
    fn test_cycle_fails() {
        let mut problem = make_problem(&[(1, Some(1))], &[0, 0], &[(0, 1), (1, 0)]);
        let err = schedule_simplex_shared(&mut problem, OperationId(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicDependence);
    }

    #[test]
    fn test_delay_beyond_cycle_range_is_malformed() {
        // Both fit alone, but serializing them pushes the second past u32::MAX
        let mut problem = make_problem(&[(3_000_000_000, Some(1))], &[0, 0], &[]);
        let err = schedule_simplex_shared(&mut problem, OperationId(1)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedProblem);
        assert!(err.to_string().contains("'op1'"), "{}", err);
        assert!(problem.operations().iter().all(|o| o.start_time().is_none()));
    }

    #[test]
    fn test_solver_failure_keeps_previous_schedule() {
        let mut problem = make_problem(&[(2, Some(1))], &[0, 0], &[(0, 1)]);
        let config = SchedulingConfig {
            max_pivots: Some(0),
            ..SchedulingConfig::default()
        };

        let err =
            schedule_simplex_shared_with_config(&mut problem, OperationId(1), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SolverInternalError);
        assert!(problem.operations().iter().all(|o| o.start_time().is_none()));

        schedule_simplex_shared(&mut problem, OperationId(1)).unwrap();
        let before: Vec<_> = problem.operations().iter().map(|o| o.start_time()).collect();
        let err =
            schedule_simplex_shared_with_config(&mut problem, OperationId(1), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SolverInternalError);
        let after: Vec<_> = problem.operations().iter().map(|o| o.start_time()).collect();
        assert_eq!(before, after);
        assert_eq!(before, vec![Some(0), Some(2)]);
    }

    #[test]
    fn test_zero_limit_is_malformed() {
        let mut problem = make_problem(&[(1, Some(0))], &[0], &[]);
        let err = schedule_simplex_shared(&mut problem, OperationId(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedProblem);
    }
}
