//! As-soon-as-possible list scheduling for acyclic, resource-free problems.

use crate::config::SchedulingConfig;
use crate::error::SchedulingError;
use crate::graph::{cycle_names, DependenceGraph};
use crate::log_changes;
use crate::problem::{checked_end, cycle_overflow, OperationId, Problem, ProblemKind};

/// Earliest start times over the intra-iteration dependence graph.
///
/// Visits operations in topological order (ties by insertion order) and starts
/// each one as soon as all of its predecessors have finished.
pub(crate) fn earliest_start_times(problem: &Problem) -> Result<Vec<u32>, SchedulingError> {
    let graph = DependenceGraph::intra_iteration(problem);
    let order = graph
        .topological_order()
        .map_err(|cycle| SchedulingError::CyclicDependence {
            cycle: cycle_names(problem, &cycle),
        })?;

    let mut starts = vec![0u32; graph.len()];
    for op in order {
        let mut start = 0u32;
        for &(pred, latency) in &graph.predecessors[op.index()] {
            let ready = starts[pred.index()]
                .checked_add(latency)
                .ok_or_else(|| cycle_overflow(problem, pred))?;
            start = start.max(ready);
        }
        checked_end(problem, op, start)?;
        starts[op.index()] = start;
    }
    Ok(starts)
}

/// Schedule every operation at its earliest possible start time.
///
/// # Returns
/// * `Ok(())` with start times written into the problem
/// * `Err(SchedulingError::MalformedProblem)` if validation fails or an
///   operation would finish after cycle `u32::MAX`
/// * `Err(SchedulingError::CyclicDependence)` if the dependence graph has a cycle
pub fn schedule_asap(problem: &mut Problem) -> Result<(), SchedulingError> {
    schedule_asap_with_config(problem, &SchedulingConfig::default())
}

/// [`schedule_asap`] with explicit configuration.
pub fn schedule_asap_with_config(
    problem: &mut Problem,
    config: &SchedulingConfig,
) -> Result<(), SchedulingError> {
    problem.validate_for(ProblemKind::Basic)?;
    let starts = earliest_start_times(problem)?;

    log_changes!(
        config.verbosity,
        "asap: scheduled {} operations, length {}",
        starts.len(),
        problem
            .operation_ids()
            .map(|op: OperationId| starts[op.index()] + problem.latency(op))
            .max()
            .unwrap_or(0)
    );
    problem.commit(&starts, None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn make_problem(latencies: &[u32], edges: &[(u32, u32)]) -> Problem {
        let mut problem = Problem::new();
        for (idx, &latency) in latencies.iter().enumerate() {
            let opr = problem.add_operator_type(&format!("t{}", idx), latency, None);
            problem.add_operation(&format!("op{}", idx), opr);
        }
        for &(src, dst) in edges {
            problem.add_dependence(OperationId(src), OperationId(dst), None);
        }
        problem
    }

    #[test]
    fn test_independent_operations_start_at_zero() {
        let mut problem = make_problem(&[1, 1], &[]);
        schedule_asap(&mut problem).unwrap();

        assert_eq!(problem.start_time(OperationId(0)), Some(0));
        assert_eq!(problem.start_time(OperationId(1)), Some(0));
    }

    #[test]
    fn test_chain() {
        let mut problem = make_problem(&[1, 2, 3], &[(0, 1), (1, 2)]);
        schedule_asap(&mut problem).unwrap();

        assert_eq!(problem.start_time(OperationId(0)), Some(0));
        assert_eq!(problem.start_time(OperationId(1)), Some(1));
        assert_eq!(problem.start_time(OperationId(2)), Some(3));
        assert_eq!(problem.end_time(OperationId(2)), Some(6));
        assert!(problem.verify().is_ok());
    }

    #[test]
    fn test_join_waits_for_slowest_predecessor() {
        // 0 (lat 1) and 1 (lat 4) both feed 2
        let mut problem = make_problem(&[1, 4, 1], &[(0, 2), (1, 2)]);
        schedule_asap(&mut problem).unwrap();

        assert_eq!(problem.start_time(OperationId(2)), Some(4));
    }

    #[test]
    fn test_cycle_fails_without_writing_results() {
        let mut problem = make_problem(&[1, 1, 1], &[(0, 1), (1, 2), (2, 1)]);
        let err = schedule_asap(&mut problem).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CyclicDependence);
        assert!(err.to_string().contains("op1"));
        assert!(problem.operations().iter().all(|o| o.start_time().is_none()));
    }

    #[test]
    fn test_loop_carried_dependence_is_rejected() {
        let mut problem = make_problem(&[1, 1], &[(0, 1)]);
        problem.add_dependence(OperationId(1), OperationId(0), Some(1));

        let err = schedule_asap(&mut problem).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedProblem);
    }

    #[test]
    fn test_schedule_beyond_cycle_range_is_malformed() {
        let mut problem = make_problem(&[3_000_000_000; 3], &[(0, 1), (1, 2)]);
        let err = schedule_asap(&mut problem).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedProblem);
        assert!(err.to_string().contains("'op1'"), "{}", err);
        assert!(problem.operations().iter().all(|o| o.start_time().is_none()));
    }

    #[test]
    fn test_idempotent() {
        let mut problem = make_problem(&[2, 1, 3, 1], &[(0, 1), (0, 2), (2, 3), (1, 3)]);
        schedule_asap(&mut problem).unwrap();
        let first: Vec<_> = problem.operations().iter().map(|o| o.start_time()).collect();

        schedule_asap(&mut problem).unwrap();
        let second: Vec<_> = problem.operations().iter().map(|o| o.start_time()).collect();
        assert_eq!(first, second);
    }
}
