//! Translation of scheduling problems into linear programs and back.
//!
//! Variable `i` of every program is the start time of operation `i`. The cyclic
//! formulation appends one variable for the initiation interval.

use crate::config::SchedulingConfig;
use crate::error::SchedulingError;
use crate::problem::{checked_end, cycle_overflow, OperationId, Problem};
use crate::simplex::{LinearProgram, LpSolution, Relation, SimplexError, SimplexSolver};

/// Emits the constraints and objective of one problem variant.
pub(crate) trait Formulation {
    fn variable_count(&self) -> usize;

    fn emit_constraints(&self, lp: &mut LinearProgram);

    fn emit_objective(&self, lp: &mut LinearProgram);

    fn build(&self) -> LinearProgram {
        let mut lp = LinearProgram::new(self.variable_count());
        self.emit_constraints(&mut lp);
        self.emit_objective(&mut lp);
        lp
    }

    fn solve(&self, config: &SchedulingConfig) -> Result<LpSolution, SimplexError> {
        SimplexSolver::new(config).solve(&self.build())
    }
}

/// Acyclic problem: `start(dst) - start(src) >= latency(src)` per dependence,
/// minimizing `start(last_op)`.
pub(crate) struct BasicFormulation<'a> {
    pub problem: &'a Problem,
    pub last_op: OperationId,
}

impl Formulation for BasicFormulation<'_> {
    fn variable_count(&self) -> usize {
        self.problem.operations().len()
    }

    fn emit_constraints(&self, lp: &mut LinearProgram) {
        for dep in self.problem.dependences() {
            lp.add_difference(
                dep.destination.index(),
                dep.source.index(),
                self.problem.latency(dep.source) as f64,
            );
        }
    }

    fn emit_objective(&self, lp: &mut LinearProgram) {
        lp.minimize(vec![(self.last_op.index(), 1.0)]);
    }
}

/// Which half of the lexicographic cyclic objective a solve targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CyclicObjective {
    /// Minimize the initiation interval.
    InitiationInterval,
    /// Fix the initiation interval and minimize `start(last_op)`.
    LastOperation { initiation_interval: u32 },
}

/// Cyclic problem: `start(dst) + II*distance - start(src) >= latency(src)` per
/// dependence, with `II >= 1`.
pub(crate) struct CyclicFormulation<'a> {
    pub problem: &'a Problem,
    pub last_op: OperationId,
    pub objective: CyclicObjective,
}

impl CyclicFormulation<'_> {
    /// Column of the initiation interval variable.
    pub fn ii_variable(&self) -> usize {
        self.problem.operations().len()
    }
}

impl Formulation for CyclicFormulation<'_> {
    fn variable_count(&self) -> usize {
        self.problem.operations().len() + 1
    }

    fn emit_constraints(&self, lp: &mut LinearProgram) {
        let ii = self.ii_variable();
        for dep in self.problem.dependences() {
            let latency = self.problem.latency(dep.source) as f64;
            if dep.is_loop_carried() {
                lp.add_row(
                    vec![
                        (dep.destination.index(), 1.0),
                        (dep.source.index(), -1.0),
                        (ii, dep.distance_or_zero() as f64),
                    ],
                    Relation::GreaterEqual,
                    latency,
                );
            } else {
                lp.add_difference(dep.destination.index(), dep.source.index(), latency);
            }
        }
        lp.add_lower_bound(ii, 1.0);

        if let CyclicObjective::LastOperation {
            initiation_interval,
        } = self.objective
        {
            lp.fix_variable(ii, initiation_interval as f64);
        }
    }

    fn emit_objective(&self, lp: &mut LinearProgram) {
        let target = match self.objective {
            CyclicObjective::InitiationInterval => self.ii_variable(),
            CyclicObjective::LastOperation { .. } => self.last_op.index(),
        };
        lp.minimize(vec![(target, 1.0)]);
    }
}

/// Any solver outcome other than an optimum on a well-formed problem is a defect.
pub(crate) fn internal_error(context: &str, err: SimplexError) -> SchedulingError {
    SchedulingError::SolverInternalError(format!("{}: {}", context, err))
}

/// Round the first `problem.operations().len()` LP values to start times.
///
/// Starts and ends past `u32::MAX` are `MalformedProblem`: the input needs more
/// cycles than a schedule can express.
pub(crate) fn decode_start_times(
    problem: &Problem,
    values: &[f64],
    config: &SchedulingConfig,
) -> Result<Vec<u32>, SchedulingError> {
    problem
        .operation_ids()
        .map(|op| {
            let value = values[op.index()];
            let rounded = value.round();
            if (value - rounded).abs() > config.integrality_tolerance || rounded < 0.0 {
                return Err(SchedulingError::SolverInternalError(format!(
                    "start time {} of '{}' is not a non-negative integer",
                    value,
                    problem.operation_name(op)
                )));
            }
            if rounded > u32::MAX as f64 {
                return Err(cycle_overflow(problem, op));
            }
            let start = rounded as u32;
            checked_end(problem, op, start)?;
            Ok(start)
        })
        .collect()
}

/// Reject a `last_op` handle that does not belong to the problem.
pub(crate) fn check_last_op(problem: &Problem, last_op: OperationId) -> Result<(), SchedulingError> {
    if problem.operation(last_op).is_none() {
        return Err(SchedulingError::MalformedProblem(format!(
            "last operation {} is not registered",
            last_op
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn make_cycle() -> (Problem, OperationId, OperationId) {
        let mut problem = Problem::new();
        let opr = problem.add_operator_type("alu", 2, None);
        let a = problem.add_operation("a", opr);
        let b = problem.add_operation("b", opr);
        problem.add_dependence(a, b, None);
        problem.add_dependence(b, a, Some(1));
        (problem, a, b)
    }

    #[test]
    fn test_basic_formulation_rows() {
        let (problem, _, b) = make_cycle();
        let lp = BasicFormulation {
            problem: &problem,
            last_op: b,
        }
        .build();

        assert_eq!(lp.num_variables(), 2);
        assert_eq!(lp.rows().len(), 2);
        assert_eq!(lp.rows()[0].coefficients, vec![(1, 1.0), (0, -1.0)]);
        assert_eq!(lp.rows()[0].rhs, 2.0);
        assert_eq!(lp.objective(), &[(b.index(), 1.0)]);
    }

    #[test]
    fn test_cyclic_formulation_rows() {
        let (problem, _, b) = make_cycle();
        let formulation = CyclicFormulation {
            problem: &problem,
            last_op: b,
            objective: CyclicObjective::LastOperation {
                initiation_interval: 4,
            },
        };
        let lp = formulation.build();

        assert_eq!(lp.num_variables(), 3);
        // a->b, b->a (loop-carried), II >= 1, II == 4
        assert_eq!(lp.rows().len(), 4);
        assert_eq!(
            lp.rows()[1].coefficients,
            vec![(0, 1.0), (1, -1.0), (2, 1.0)]
        );
        assert_eq!(lp.rows()[3].relation, Relation::Equal);
        assert_eq!(lp.rows()[3].rhs, 4.0);
        assert_eq!(lp.objective(), &[(b.index(), 1.0)]);
    }

    #[test]
    fn test_decode_rejects_fractional_values() {
        let (problem, _, _) = make_cycle();
        let config = SchedulingConfig::default();

        assert_eq!(
            decode_start_times(&problem, &[0.0, 2.0000000001, 9.0], &config).unwrap(),
            vec![0, 2]
        );
        assert!(decode_start_times(&problem, &[0.5, 2.0], &config).is_err());
        assert!(decode_start_times(&problem, &[-1.0, 2.0], &config).is_err());
    }

    #[test]
    fn test_decode_rejects_values_beyond_cycle_range() {
        let (problem, _, _) = make_cycle();
        let config = SchedulingConfig::default();

        let err = decode_start_times(&problem, &[0.0, 6_000_000_000.0], &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedProblem);
        assert!(err.to_string().contains("'b'"), "{}", err);

        // Start fits but the end (start + latency 2) does not
        let last = u32::MAX as f64 - 1.0;
        assert!(decode_start_times(&problem, &[0.0, last], &config).is_err());
        assert!(decode_start_times(&problem, &[0.0, last - 1.0], &config).is_ok());
    }

    #[test]
    fn test_check_last_op() {
        let (problem, a, _) = make_cycle();
        assert!(check_last_op(&problem, a).is_ok());
        assert!(check_last_op(&problem, OperationId(9)).is_err());
    }
}
