//! Operation scheduling for high-level synthesis.
//!
//! A [`Problem`] holds operator types, operations and dependences. The
//! schedulers assign integer start times (and an initiation interval for
//! cyclic problems) and write them back into the problem:
//!
//! * [`schedule_asap`]: earliest start times by longest path
//! * [`schedule_simplex`]: minimize the start time of a chosen operation
//! * [`schedule_simplex_cyclic`]: minimize the initiation interval, then the
//!   start time of a chosen operation
//! * [`schedule_simplex_shared`]: honor operator instance limits

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

pub mod asap;
mod config;
pub mod dot;
mod error;
pub mod graph;
mod interner;
pub mod logging;
mod problem;
pub mod scheduler;
pub mod simplex;

#[cfg(feature = "python")]
mod python;

pub use asap::{schedule_asap, schedule_asap_with_config};
pub use config::SchedulingConfig;
pub use dot::to_dot;
pub use error::{ErrorKind, SchedulingError};
pub use interner::{NameInterner, Symbol};
pub use problem::{
    Dependence, DependenceId, Operation, OperationId, OperatorType, OperatorTypeId, Problem,
    ProblemKind,
};
pub use scheduler::{
    schedule_simplex, schedule_simplex_cyclic, schedule_simplex_cyclic_with_config,
    schedule_simplex_shared, schedule_simplex_shared_with_config, schedule_simplex_with_config,
    ResourceSchedule,
};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
#[cfg(feature = "python")]
#[pymodule]
fn opsched(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyProblem>()?;
    m.add_class::<SchedulingConfig>()?;
    Ok(())
}
