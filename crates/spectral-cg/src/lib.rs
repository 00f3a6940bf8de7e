//! Conjugate Gradient convergence studies on synthetic SPD systems.
//!
//! This crate builds diagonal symmetric positive-definite operators with a
//! prescribed condition number, runs an instrumented Conjugate Gradient
//! iteration against unit right-hand sides with an optionally "deflated"
//! prefix, and records the residual norm after every iteration. It also
//! provides the 1-D multigrid prolongation / restriction pair used by related
//! experiments.
//!
//! # Modules
//!
//! | Module | Feature gate | Contents |
//! |--------|-------------|----------|
//! | [`spectrum`] | -- | Chebyshev-spectrum diagonal operators |
//! | [`cg`] | `cg` | CG solver with per-iteration residual trace |
//! | [`grid`] | `grid` | prolongation and its exact transpose |
//! | [`analysis`] | -- | threshold crossings, work model |
//! | [`sweep`] | `sweep` | seeded `(eps, m, k)` parameter sweeps |
//!
//! Every operation is a pure function of its arguments: no global state, no
//! I/O, no caching. Independent calls may run on any number of threads.
//!
//! # Example
//!
//! ```rust
//! use spectral_cg::{cg_residuals, coarsen_matrix, DEFAULT_RTOL};
//!
//! let trace = cg_residuals(0.5, 32, 2, DEFAULT_RTOL).unwrap();
//! assert!(trace.last().unwrap() < 1e-14);
//!
//! let r = coarsen_matrix(5).unwrap();
//! assert_eq!(r.mul_vec(&[1.0, 2.0, 3.0, 4.0, 5.0]), vec![1.5, 3.5, 5.0]);
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod spectrum;
pub mod traits;
pub mod types;
pub mod validation;

#[cfg(feature = "cg")]
pub mod cg;

#[cfg(feature = "grid")]
pub mod grid;

#[cfg(feature = "sweep")]
pub mod sweep;

pub use config::{CgConfig, DEFAULT_RTOL};
pub use error::{SolverError, ValidationError};
pub use spectrum::SpectrumGenerator;
pub use traits::LinearOperator;
pub use types::{CgOutcome, CsrMatrix, DiagonalMatrix, ResidualTrace, StopReason};

#[cfg(feature = "cg")]
pub use cg::ConjugateGradientSolver;

#[cfg(feature = "grid")]
pub use grid::GridTransferOperator;

/// Diagonal SPD operator of size `n` with eigenvalues at Chebyshev nodes
/// mapped into `[eps, 1]`.
///
/// See [`SpectrumGenerator::build`].
///
/// # Errors
///
/// [`SolverError::InvalidInput`] when `n == 0` or `eps` is outside `(0, 1]`.
pub fn build_spd_diagonal(n: usize, eps: f64) -> Result<DiagonalMatrix, SolverError> {
    SpectrumGenerator::build(n, eps)
}

/// Residual trace of CG on `build_spd_diagonal(m, eps)` with the unit
/// right-hand side whose leading `k_zero` entries are zeroed.
///
/// Pass [`DEFAULT_RTOL`] for the customary `1e-14` tolerance. The iteration
/// cap follows the default policy of [`CgConfig`]; a run that reaches it
/// returns its partial trace.
///
/// # Errors
///
/// * [`SolverError::InvalidInput`] for invalid `eps`, `m` or `rtol`.
/// * [`SolverError::DegenerateInput`] when `k_zero >= m`.
#[cfg(feature = "cg")]
pub fn cg_residuals(
    eps: f64,
    m: usize,
    k_zero: usize,
    rtol: f64,
) -> Result<ResidualTrace, SolverError> {
    let operator = build_spd_diagonal(m, eps)?;
    ConjugateGradientSolver::with_tolerance(rtol).residual_trace(&operator, k_zero)
}

/// Prolongation operator of shape `(m, ceil(m/2))`.
///
/// See [`GridTransferOperator::prolongation`].
///
/// # Errors
///
/// [`SolverError::InvalidInput`] when `m == 0`.
#[cfg(feature = "grid")]
pub fn prolongation_matrix(m: usize) -> Result<CsrMatrix<f64>, SolverError> {
    GridTransferOperator::prolongation(m)
}

/// Restriction operator of shape `(ceil(m/2), m)`, the exact transpose of
/// [`prolongation_matrix`].
///
/// # Errors
///
/// [`SolverError::InvalidInput`] when `m == 0`.
#[cfg(feature = "grid")]
pub fn coarsen_matrix(m: usize) -> Result<CsrMatrix<f64>, SolverError> {
    GridTransferOperator::coarsen(m)
}
