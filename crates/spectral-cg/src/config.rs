//! Solver configuration.
//!
//! [`CgConfig`] turns the knobs that iterative-solver libraries usually keep
//! implicit (tolerance semantics, iteration cap) into explicit, documented
//! fields. It deserialises from any serde format, with every field optional.
//!
//! # Example
//!
//! ```rust
//! use spectral_cg::config::CgConfig;
//!
//! let config = CgConfig {
//!     tolerance: 1e-10,
//!     ..Default::default()
//! };
//! assert_eq!(config.effective_max_iterations(50), 500);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SolverError;
use crate::validation::{validate_max_iterations, validate_tolerance};

/// Default relative residual tolerance.
pub const DEFAULT_RTOL: f64 = 1e-14;

/// Default iteration cap is `min(ITERATION_CAP_FACTOR * n, ITERATION_CAP_CEILING)`.
pub const ITERATION_CAP_FACTOR: usize = 10;

/// Upper bound of the default iteration cap.
pub const ITERATION_CAP_CEILING: usize = 10_000;

/// Configuration for [`ConjugateGradientSolver`](crate::cg::ConjugateGradientSolver).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CgConfig {
    /// Relative residual tolerance.
    ///
    /// The run stops once `||r_i||_2 <= tolerance * ||b||_2`. With the unit
    /// right-hand sides built by [`deflated_rhs`](crate::cg::deflated_rhs)
    /// this is also the absolute threshold.
    ///
    /// Default: [`DEFAULT_RTOL`].
    pub tolerance: f64,

    /// Explicit iteration cap. `None` selects
    /// `min(10 * n, 10_000)` for an `n`-dimensional system.
    ///
    /// Reaching the cap is not an error; the partial trace is returned.
    ///
    /// Default: `None`.
    pub max_iterations: Option<usize>,
}

impl Default for CgConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_RTOL,
            max_iterations: None,
        }
    }
}

impl CgConfig {
    /// Config with the given tolerance and the default cap policy.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Default::default()
        }
    }

    /// Override the iteration cap.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Iteration cap in effect for an `n`-dimensional system.
    pub fn effective_max_iterations(&self, n: usize) -> usize {
        self.max_iterations.unwrap_or_else(|| {
            n.saturating_mul(ITERATION_CAP_FACTOR)
                .clamp(1, ITERATION_CAP_CEILING)
        })
    }

    /// Check that the tolerance and any explicit cap are in range.
    pub fn validate(&self) -> Result<(), SolverError> {
        validate_tolerance(self.tolerance)?;
        if let Some(cap) = self.max_iterations {
            validate_max_iterations(cap)?;
        }
        Ok(())
    }
}
