//! Error types returned by the scheduling entry points.

use thiserror::Error;

/// Machine-readable failure category of a [`SchedulingError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedProblem,
    CyclicDependence,
    InfeasibleCycle,
    SolverInternalError,
}

/// Errors that can occur while validating or solving a scheduling problem.
///
/// Cycle variants list the names of the operations on the offending cycle in
/// dependence order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Malformed problem: {0}")]
    MalformedProblem(String),
    #[error("Dependence cycle without loop-carried edge: {}", .cycle.join(" -> "))]
    CyclicDependence { cycle: Vec<String> },
    #[error("Cycle with zero total distance and positive latency: {}", .cycle.join(" -> "))]
    InfeasibleCycle { cycle: Vec<String> },
    #[error("Solver internal error: {0}")]
    SolverInternalError(String),
}

impl SchedulingError {
    /// The failure category, for callers that dispatch on it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedProblem(_) => ErrorKind::MalformedProblem,
            Self::CyclicDependence { .. } => ErrorKind::CyclicDependence,
            Self::InfeasibleCycle { .. } => ErrorKind::InfeasibleCycle,
            Self::SolverInternalError(_) => ErrorKind::SolverInternalError,
        }
    }
}
