//! Python bindings for building and solving scheduling problems.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;

use crate::config::SchedulingConfig;
use crate::error::SchedulingError;
use crate::problem::{OperationId, OperatorTypeId, Problem};

fn to_py_err(err: SchedulingError) -> PyErr {
    PyValueError::new_err(format!("{:?}: {}", err.kind(), err))
}

/// A scheduling problem (PyO3 wrapper). Handles are plain integers.
#[pyclass(name = "Problem")]
#[derive(Clone, Debug, Default)]
pub struct PyProblem {
    inner: Problem,
}

#[pymethods]
impl PyProblem {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    #[pyo3(signature = (name, latency, limit=None))]
    fn add_operator_type(&mut self, name: &str, latency: u32, limit: Option<u32>) -> u32 {
        self.inner.add_operator_type(name, latency, limit).0
    }

    fn add_operation(&mut self, name: &str, operator_type: u32) -> u32 {
        self.inner
            .add_operation(name, OperatorTypeId(operator_type))
            .0
    }

    #[pyo3(signature = (source, destination, distance=None))]
    fn add_dependence(&mut self, source: u32, destination: u32, distance: Option<u32>) -> u32 {
        self.inner
            .add_dependence(OperationId(source), OperationId(destination), distance)
            .0
    }

    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    fn verify(&self) -> PyResult<()> {
        self.inner.verify().map_err(to_py_err)
    }

    fn clear_results(&mut self) {
        self.inner.clear_results();
    }

    #[pyo3(signature = (config=None))]
    fn schedule_asap(&mut self, config: Option<SchedulingConfig>) -> PyResult<()> {
        let config = config.unwrap_or_default();
        crate::asap::schedule_asap_with_config(&mut self.inner, &config).map_err(to_py_err)
    }

    #[pyo3(signature = (last_op, config=None))]
    fn schedule_simplex(&mut self, last_op: u32, config: Option<SchedulingConfig>) -> PyResult<()> {
        let config = config.unwrap_or_default();
        crate::scheduler::schedule_simplex_with_config(
            &mut self.inner,
            OperationId(last_op),
            &config,
        )
        .map_err(to_py_err)
    }

    /// Returns the computed initiation interval.
    #[pyo3(signature = (last_op, config=None))]
    fn schedule_simplex_cyclic(
        &mut self,
        last_op: u32,
        config: Option<SchedulingConfig>,
    ) -> PyResult<Option<u32>> {
        let config = config.unwrap_or_default();
        crate::scheduler::schedule_simplex_cyclic_with_config(
            &mut self.inner,
            OperationId(last_op),
            &config,
        )
        .map_err(to_py_err)?;
        Ok(self.inner.initiation_interval())
    }

    #[pyo3(signature = (last_op, config=None))]
    fn schedule_simplex_shared(
        &mut self,
        last_op: u32,
        config: Option<SchedulingConfig>,
    ) -> PyResult<()> {
        let config = config.unwrap_or_default();
        crate::scheduler::schedule_simplex_shared_with_config(
            &mut self.inner,
            OperationId(last_op),
            &config,
        )
        .map_err(to_py_err)
    }

    fn start_time(&self, op: u32) -> Option<u32> {
        self.inner.start_time(OperationId(op))
    }

    #[getter]
    fn initiation_interval(&self) -> Option<u32> {
        self.inner.initiation_interval()
    }

    /// Start times of all scheduled operations keyed by name.
    fn start_times(&self) -> HashMap<String, u32> {
        self.inner
            .operation_ids()
            .filter_map(|op| {
                self.inner
                    .start_time(op)
                    .map(|start| (self.inner.operation_name(op), start))
            })
            .collect()
    }

    fn to_dot(&self) -> String {
        crate::dot::to_dot(&self.inner)
    }

    fn __repr__(&self) -> String {
        format!(
            "Problem(operations={}, operator_types={}, dependences={})",
            self.inner.operations().len(),
            self.inner.operator_types().len(),
            self.inner.dependences().len()
        )
    }
}
