//! Simplex scheduling of the basic acyclic problem.

use crate::config::SchedulingConfig;
use crate::error::SchedulingError;
use crate::graph::{cycle_names, DependenceGraph};
use crate::log_changes;
use crate::problem::{precedence_violation, OperationId, Problem, ProblemKind};

use super::formulation::{
    check_last_op, decode_start_times, internal_error, BasicFormulation, Formulation,
};

/// Fail with `CyclicDependence` if the intra-iteration graph has a cycle.
pub(crate) fn ensure_acyclic(problem: &Problem) -> Result<(), SchedulingError> {
    DependenceGraph::intra_iteration(problem)
        .topological_order()
        .map(|_| ())
        .map_err(|cycle| SchedulingError::CyclicDependence {
            cycle: cycle_names(problem, &cycle),
        })
}

/// Solve the acyclic LP and decode start times, without committing them.
///
/// The problem must already be validated and acyclic.
pub(crate) fn solve_basic(
    problem: &Problem,
    last_op: OperationId,
    config: &SchedulingConfig,
) -> Result<Vec<u32>, SchedulingError> {
    let solution = BasicFormulation { problem, last_op }
        .solve(config)
        .map_err(|err| internal_error("acyclic LP", err))?;
    let starts = decode_start_times(problem, &solution.values, config)?;

    if let Some(violation) = precedence_violation(problem, &starts, 0) {
        return Err(SchedulingError::SolverInternalError(violation));
    }
    Ok(starts)
}

/// Schedule an acyclic problem by linear programming, minimizing the start
/// time of `last_op`.
///
/// Without resource limits the optimum equals the ASAP start time of
/// `last_op`; other operations get some feasible start time.
///
/// # Returns
/// * `Ok(())` with start times written into the problem
/// * `Err(SchedulingError::MalformedProblem)` if validation fails or a start or
///   end time would exceed cycle `u32::MAX`
/// * `Err(SchedulingError::CyclicDependence)` if the dependence graph has a cycle
/// * `Err(SchedulingError::SolverInternalError)` if the LP solve fails, e.g. on
///   hitting `max_pivots`
pub fn schedule_simplex(problem: &mut Problem, last_op: OperationId) -> Result<(), SchedulingError> {
    schedule_simplex_with_config(problem, last_op, &SchedulingConfig::default())
}

/// [`schedule_simplex`] with explicit configuration.
pub fn schedule_simplex_with_config(
    problem: &mut Problem,
    last_op: OperationId,
    config: &SchedulingConfig,
) -> Result<(), SchedulingError> {
    problem.validate_for(ProblemKind::Basic)?;
    check_last_op(problem, last_op)?;
    ensure_acyclic(problem)?;

    let starts = solve_basic(problem, last_op, config)?;
    log_changes!(
        config.verbosity,
        "simplex: '{}' starts at {}",
        problem.operation_name(last_op),
        starts[last_op.index()]
    );
    problem.commit(&starts, None);
    Ok(())
}
