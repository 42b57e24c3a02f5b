//! Simplex scheduling of the cyclic problem with an initiation interval.
//!
//! The objective is lexicographic and solved as two programs: the first
//! minimizes the initiation interval, the second fixes the rounded-up interval
//! with an equality row and minimizes the start time of the last operation.

use crate::config::SchedulingConfig;
use crate::error::SchedulingError;
use crate::graph::{cycle_names, DependenceGraph};
use crate::problem::{precedence_violation, OperationId, Problem, ProblemKind};
use crate::simplex::SimplexError;
use crate::{log_changes, log_checks};

use super::formulation::{
    check_last_op, decode_start_times, internal_error, CyclicFormulation, CyclicObjective,
    Formulation,
};

/// Smallest integer initiation interval admitted by the recurrences.
fn minimum_initiation_interval(
    problem: &Problem,
    last_op: OperationId,
    config: &SchedulingConfig,
) -> Result<u32, SchedulingError> {
    let formulation = CyclicFormulation {
        problem,
        last_op,
        objective: CyclicObjective::InitiationInterval,
    };

    let solution = match formulation.solve(config) {
        Ok(solution) => solution,
        Err(SimplexError::Infeasible) => {
            // Only a zero-distance cycle carrying latency makes this program infeasible
            return Err(
                match DependenceGraph::intra_iteration(problem).find_positive_latency_cycle() {
                    Some(cycle) => SchedulingError::InfeasibleCycle {
                        cycle: cycle_names(problem, &cycle),
                    },
                    None => SchedulingError::SolverInternalError(
                        "II program infeasible without a zero-distance cycle".to_string(),
                    ),
                },
            );
        }
        Err(err) => return Err(internal_error("II program", err)),
    };

    let relaxed = solution.values[formulation.ii_variable()];
    log_checks!(config.verbosity, "cyclic: LP initiation interval {}", relaxed);

    // The LP optimum is the largest latency/distance ratio over all cycles
    let rounded = (relaxed - config.integrality_tolerance).ceil().max(1.0);
    if rounded > u32::MAX as f64 {
        return Err(SchedulingError::MalformedProblem(format!(
            "initiation interval {} exceeds {} cycles",
            rounded,
            u32::MAX
        )));
    }
    Ok(rounded as u32)
}

/// Schedule a cyclic problem: find the smallest feasible initiation interval,
/// then minimize the start time of `last_op` under it.
///
/// # Returns
/// * `Ok(())` with start times and the initiation interval written into the problem
/// * `Err(SchedulingError::MalformedProblem)` if validation fails or the
///   interval, a start or an end would exceed cycle `u32::MAX`
/// * `Err(SchedulingError::InfeasibleCycle)` if a cycle has zero total distance
///   and positive total latency
pub fn schedule_simplex_cyclic(
    problem: &mut Problem,
    last_op: OperationId,
) -> Result<(), SchedulingError> {
    schedule_simplex_cyclic_with_config(problem, last_op, &SchedulingConfig::default())
}

/// [`schedule_simplex_cyclic`] with explicit configuration.
pub fn schedule_simplex_cyclic_with_config(
    problem: &mut Problem,
    last_op: OperationId,
    config: &SchedulingConfig,
) -> Result<(), SchedulingError> {
    problem.validate_for(ProblemKind::Cyclic)?;
    check_last_op(problem, last_op)?;

    let initiation_interval = minimum_initiation_interval(problem, last_op, config)?;

    let solution = CyclicFormulation {
        problem,
        last_op,
        objective: CyclicObjective::LastOperation {
            initiation_interval,
        },
    }
    .solve(config)
    .map_err(|err| internal_error("start time program", err))?;
    let starts = decode_start_times(problem, &solution.values, config)?;

    if let Some(violation) = precedence_violation(problem, &starts, initiation_interval) {
        return Err(SchedulingError::SolverInternalError(violation));
    }

    log_changes!(
        config.verbosity,
        "cyclic: II {}, '{}' starts at {}",
        initiation_interval,
        problem.operation_name(last_op),
        starts[last_op.index()]
    );
    problem.commit(&starts, Some(initiation_interval));
    Ok(())
}
