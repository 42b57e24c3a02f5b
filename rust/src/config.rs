//! Configuration types for the scheduling algorithms.

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Tuning knobs shared by every scheduling entry point.
#[cfg_attr(feature = "python", pyclass)]
#[derive(Clone, Debug)]
pub struct SchedulingConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    #[cfg_attr(feature = "python", pyo3(get, set))]
    pub verbosity: u8,
    /// Epsilon for the simplex pivot and ratio tests.
    #[cfg_attr(feature = "python", pyo3(get, set))]
    pub tolerance: f64,
    /// Maximum distance of an LP value from the nearest integer when decoding start times.
    #[cfg_attr(feature = "python", pyo3(get, set))]
    pub integrality_tolerance: f64,
    /// Upper bound on pivots per LP solve (None = unlimited).
    #[cfg_attr(feature = "python", pyo3(get, set))]
    pub max_pivots: Option<usize>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            tolerance: 1e-9,
            integrality_tolerance: 1e-6,
            max_pivots: None,
        }
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl SchedulingConfig {
    #[new]
    #[pyo3(signature = (
        verbosity=None,
        tolerance=None,
        integrality_tolerance=None,
        max_pivots=None
    ))]
    fn py_new(
        verbosity: Option<u8>,
        tolerance: Option<f64>,
        integrality_tolerance: Option<f64>,
        max_pivots: Option<usize>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            verbosity: verbosity.unwrap_or(defaults.verbosity),
            tolerance: tolerance.unwrap_or(defaults.tolerance),
            integrality_tolerance: integrality_tolerance
                .unwrap_or(defaults.integrality_tolerance),
            max_pivots,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SchedulingConfig(verbosity={}, tolerance={}, max_pivots={:?})",
            self.verbosity, self.tolerance, self.max_pivots
        )
    }
}
