//! Conjugate Gradient solver for symmetric positive-definite systems.
//!
//! Solves `Ax = b` for an SPD operator `A` and records `||r_i||_2` after every
//! iteration, so the full convergence history is available to the caller
//! without any callback machinery.
//!
//! # Algorithm
//!
//! Plain (unpreconditioned) Hestenes-Stiefel CG with `x_0 = 0`:
//!
//! ```text
//! r = b
//! p = r
//! rr = r . r
//!
//! for i in 1..=max_iterations:
//!     Ap = A * p
//!     alpha = rr / (p . Ap)
//!     x  = x + alpha * p
//!     r  = r - alpha * Ap
//!     rr_new = r . r
//!     record ||r||_2 = sqrt(rr_new)
//!     if ||r||_2 <= tolerance * ||b||_2:
//!         converged; break
//!     beta = rr_new / rr
//!     p  = r + beta * p
//!     rr = rr_new
//! ```
//!
//! # Determinism
//!
//! Every reduction uses the same fixed 4-wide accumulation order, so two runs
//! on identical inputs produce bit-identical traces.
//!
//! # Convergence
//!
//! Reaching the iteration cap is not an error: the run ends with
//! [`StopReason::IterationCap`] and the partial trace. Residual norms of CG
//! are not monotone in general (CG minimises the `A`-norm of the error, not
//! the residual), so ill-conditioned spectra can show early residual growth.

use tracing::{debug, instrument, trace, warn};

use crate::config::CgConfig;
use crate::error::{SolverError, ValidationError};
use crate::traits::LinearOperator;
use crate::types::{CgOutcome, ResidualTrace, StopReason};
use crate::validation::{validate_dimension, validate_rhs};

// ═══════════════════════════════════════════════════════════════════════════
// Helper functions -- f64 linear algebra primitives
// ═══════════════════════════════════════════════════════════════════════════

/// Dot product of two `f64` slices with 4-wide accumulation.
///
/// The accumulation order is fixed, which keeps results reproducible.
///
/// # Panics
///
/// Panics if `a.len() != b.len()`.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "dot: length mismatch");

    let n = a.len();
    let chunks = n / 4;
    let remainder = n % 4;

    let mut acc0: f64 = 0.0;
    let mut acc1: f64 = 0.0;
    let mut acc2: f64 = 0.0;
    let mut acc3: f64 = 0.0;

    for i in 0..chunks {
        let j = i * 4;
        acc0 += a[j] * b[j];
        acc1 += a[j + 1] * b[j + 1];
        acc2 += a[j + 2] * b[j + 2];
        acc3 += a[j + 3] * b[j + 3];
    }

    let base = chunks * 4;
    for i in 0..remainder {
        acc0 += a[base + i] * b[base + i];
    }

    (acc0 + acc1) + (acc2 + acc3)
}

/// Compute `y[i] += alpha * x[i]` for all `i`.
///
/// # Panics
///
/// Panics if `x.len() != y.len()`.
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    assert_eq!(x.len(), y.len(), "axpy: length mismatch");

    let n = x.len();
    let chunks = n / 4;
    let base = chunks * 4;

    for i in 0..chunks {
        let j = i * 4;
        y[j] += alpha * x[j];
        y[j + 1] += alpha * x[j + 1];
        y[j + 2] += alpha * x[j + 2];
        y[j + 3] += alpha * x[j + 3];
    }
    for i in base..n {
        y[i] += alpha * x[i];
    }
}

/// Euclidean norm, `sqrt(x . x)`.
#[inline]
pub fn norm2(x: &[f64]) -> f64 {
    dot(x, x).sqrt()
}

// ═══════════════════════════════════════════════════════════════════════════
// Right-hand side
// ═══════════════════════════════════════════════════════════════════════════

/// Unit-norm "deflated" right-hand side of length `n`.
///
/// Starts from the all-ones vector, zeroes the leading `k_zero` entries and
/// normalises the rest, giving `1 / sqrt(n - k_zero)` in the trailing
/// entries. For the spectra built by
/// [`SpectrumGenerator`](crate::spectrum::SpectrumGenerator) the leading
/// entries pair with the largest eigenvalues, so deflation removes the top of
/// the spectrum from the problem.
///
/// # Errors
///
/// * [`SolverError::InvalidInput`] if `n == 0`.
/// * [`SolverError::DegenerateInput`] if `k_zero >= n`: nothing is left to
///   normalise.
pub fn deflated_rhs(n: usize, k_zero: usize) -> Result<Vec<f64>, SolverError> {
    validate_dimension("n", n)?;
    if k_zero >= n {
        return Err(SolverError::DegenerateInput { k_zero, n });
    }

    let mut b = vec![1.0f64; n];
    b[..k_zero].fill(0.0);

    let inv_norm = 1.0 / norm2(&b);
    for v in &mut b[k_zero..] {
        *v *= inv_norm;
    }
    Ok(b)
}

// ═══════════════════════════════════════════════════════════════════════════
// ConjugateGradientSolver
// ═══════════════════════════════════════════════════════════════════════════

/// Conjugate Gradient solver for symmetric positive-definite systems.
///
/// Stores only the [`CgConfig`]; every solve allocates its own work vectors,
/// so one solver may be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct ConjugateGradientSolver {
    config: CgConfig,
}

impl ConjugateGradientSolver {
    /// Create a solver from a configuration.
    pub fn new(config: CgConfig) -> Self {
        Self { config }
    }

    /// Create a solver with the given relative tolerance and the default
    /// iteration-cap policy.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self::new(CgConfig::with_tolerance(tolerance))
    }

    /// The configuration in use.
    #[inline]
    pub fn config(&self) -> &CgConfig {
        &self.config
    }

    /// Relative residual tolerance.
    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.config.tolerance
    }

    // -------------------------------------------------------------------
    // Input validation
    // -------------------------------------------------------------------

    fn validate<A: LinearOperator + ?Sized>(
        &self,
        operator: &A,
        rhs: &[f64],
    ) -> Result<(), SolverError> {
        self.config.validate()?;

        let (rows, cols) = operator.shape();
        if rows != cols {
            return Err(ValidationError::DimensionMismatch(format!(
                "CG requires a square operator but got {rows}x{cols}",
            ))
            .into());
        }

        validate_rhs(rhs, rows)?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Entry points
    // -------------------------------------------------------------------

    /// Solve `A x = rhs` from `x_0 = 0`.
    ///
    /// # Errors
    ///
    /// * [`SolverError::InvalidInput`] -- non-square operator, length
    ///   mismatch, non-finite rhs, or invalid configuration.
    /// * [`SolverError::NumericalInstability`] -- `p . Ap <= 0` or a
    ///   non-finite residual; the operator is not SPD.
    pub fn solve<A: LinearOperator + ?Sized>(
        &self,
        operator: &A,
        rhs: &[f64],
    ) -> Result<CgOutcome, SolverError> {
        self.validate(operator, rhs)?;
        self.solve_inner(operator, rhs)
    }

    /// Run CG on `operator` against [`deflated_rhs`]`(n, k_zero)` and return
    /// the residual trace.
    ///
    /// # Errors
    ///
    /// As for [`solve`](Self::solve), plus [`SolverError::DegenerateInput`]
    /// when `k_zero >= n`.
    pub fn residual_trace<A: LinearOperator + ?Sized>(
        &self,
        operator: &A,
        k_zero: usize,
    ) -> Result<ResidualTrace, SolverError> {
        let (n, _) = operator.shape();
        let rhs = deflated_rhs(n, k_zero)?;
        Ok(self.solve(operator, &rhs)?.trace)
    }

    // -------------------------------------------------------------------
    // Core CG algorithm
    // -------------------------------------------------------------------

    #[instrument(level = "debug", skip_all, fields(n = rhs.len(), nnz = operator.nnz()))]
    fn solve_inner<A: LinearOperator + ?Sized>(
        &self,
        operator: &A,
        rhs: &[f64],
    ) -> Result<CgOutcome, SolverError> {
        let n = rhs.len();
        let max_iterations = self.config.effective_max_iterations(n);
        let b_norm = norm2(rhs);

        // x = 0 already solves a zero right-hand side.
        if b_norm == 0.0 {
            debug!("CG: zero RHS, returning zero solution");
            return Ok(CgOutcome {
                solution: vec![0.0; n],
                trace: ResidualTrace::default(),
                stop_reason: StopReason::Converged,
                rhs_norm: 0.0,
                max_iterations,
            });
        }

        let threshold = self.config.tolerance * b_norm;

        // --- Working vectors ---
        let mut x = vec![0.0f64; n];
        let mut r = rhs.to_vec();
        let mut p = r.clone();
        let mut ap = vec![0.0f64; n];
        let mut rr = dot(&r, &r);

        let mut trace = ResidualTrace::with_capacity(max_iterations.min(1024));
        let mut stop_reason = StopReason::IterationCap;

        debug!(
            tol = self.config.tolerance,
            max_iterations, "CG: starting, ||b|| = {b_norm:.6e}"
        );

        for iteration in 1..=max_iterations {
            // --- Ap = A * p ---
            operator.apply(&p, &mut ap);

            // --- alpha = rr / (p . Ap) ---
            let p_dot_ap = dot(&p, &ap);
            if !(p_dot_ap > 0.0 && p_dot_ap.is_finite()) {
                warn!("CG: p.Ap = {p_dot_ap:.4e} at iteration {iteration}");
                return Err(SolverError::NumericalInstability {
                    iteration,
                    detail: format!("p.Ap = {p_dot_ap:.6e}; operator may not be SPD"),
                });
            }
            let alpha = rr / p_dot_ap;

            // --- x += alpha p,  r -= alpha Ap ---
            axpy(alpha, &p, &mut x);
            axpy(-alpha, &ap, &mut r);

            let rr_new = dot(&r, &r);
            let r_norm = rr_new.sqrt();
            if !r_norm.is_finite() {
                warn!("CG: non-finite residual at iteration {iteration}");
                return Err(SolverError::NumericalInstability {
                    iteration,
                    detail: format!("||r|| = {r_norm}"),
                });
            }

            trace.push(r_norm);
            trace!("CG iter {iteration}: ||r|| = {r_norm:.6e}");

            if r_norm <= threshold {
                stop_reason = StopReason::Converged;
                debug!("CG converged at iteration {iteration}: ||r|| = {r_norm:.6e}");
                break;
            }

            // --- p = r + beta p ---
            let beta = rr_new / rr;
            for (pi, &ri) in p.iter_mut().zip(&r) {
                *pi = ri + beta * *pi;
            }
            rr = rr_new;
        }

        if stop_reason == StopReason::IterationCap {
            debug!(
                "CG: iteration cap {max_iterations} reached, ||r|| = {:.6e}",
                trace.last().unwrap_or(b_norm),
            );
        }

        Ok(CgOutcome {
            solution: x,
            trace,
            stop_reason,
            rhs_norm: b_norm,
            max_iterations,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::SpectrumGenerator;
    use crate::types::{CsrMatrix, DiagonalMatrix};

    /// Build a symmetric tridiagonal SPD matrix: diag = 4.0, off-diag = -1.0.
    fn tridiagonal_spd(n: usize) -> CsrMatrix<f64> {
        let mut entries = Vec::with_capacity(3 * n);
        for i in 0..n {
            if i > 0 {
                entries.push((i, i - 1, -1.0f64));
            }
            entries.push((i, i, 4.0f64));
            if i + 1 < n {
                entries.push((i, i + 1, -1.0f64));
            }
        }
        CsrMatrix::<f64>::from_coo(n, n, entries)
    }

    // -----------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------

    #[test]
    fn dot_basic_and_odd_length() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert_eq!(dot(&[1.0, 2.0, 3.0, 4.0, 5.0], &[5.0, 4.0, 3.0, 2.0, 1.0]), 35.0);
        assert_eq!(dot(&[], &[]), 0.0);
    }

    #[test]
    fn axpy_and_norm() {
        let mut y = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        axpy(-2.0, &[1.0, 2.0, 3.0, 4.0, 5.0], &mut y);
        assert_eq!(y, vec![8.0, 16.0, 24.0, 32.0, 40.0]);
        assert_eq!(norm2(&[3.0, 4.0]), 5.0);
    }

    // -----------------------------------------------------------------
    // Right-hand side
    // -----------------------------------------------------------------

    #[test]
    fn deflated_rhs_is_unit_with_zero_prefix() {
        let b = deflated_rhs(8, 3).unwrap();
        assert_eq!(&b[..3], &[0.0, 0.0, 0.0]);
        assert!((norm2(&b) - 1.0).abs() < 1e-15);
        let expected = 1.0 / 5.0f64.sqrt();
        assert!(b[3..].iter().all(|&v| (v - expected).abs() < 1e-15));
    }

    #[test]
    fn deflated_rhs_degenerate() {
        assert_eq!(
            deflated_rhs(4, 4).unwrap_err(),
            SolverError::DegenerateInput { k_zero: 4, n: 4 }
        );
        assert!(matches!(
            deflated_rhs(4, 9),
            Err(SolverError::DegenerateInput { k_zero: 9, n: 4 })
        ));
        assert!(deflated_rhs(0, 0).unwrap_err().is_domain_error());
    }

    // -----------------------------------------------------------------
    // Convergence
    // -----------------------------------------------------------------

    #[test]
    fn identity_converges_in_one_iteration() {
        let d = DiagonalMatrix::from_diagonal(vec![1.0; 6]).unwrap();
        let b = deflated_rhs(6, 0).unwrap();
        let out = ConjugateGradientSolver::default().solve(&d, &b).unwrap();
        assert_eq!(out.iterations(), 1);
        assert_eq!(out.trace.last(), Some(0.0));
        assert!(out.converged());
    }

    #[test]
    fn diagonal_solution_is_b_over_d() {
        let d = DiagonalMatrix::from_diagonal(vec![2.0, 3.0, 5.0, 7.0]).unwrap();
        let b = [4.0, 9.0, 25.0, 49.0];
        let out = ConjugateGradientSolver::with_tolerance(1e-12)
            .solve(&d, &b)
            .unwrap();
        for (xi, expected) in out.solution.iter().zip([2.0, 3.0, 5.0, 7.0]) {
            assert!((xi - expected).abs() < 1e-10, "{xi} != {expected}");
        }
        assert!(out.iterations() <= 4 + 2);
    }

    #[test]
    fn csr_operator_is_supported() {
        let a = tridiagonal_spd(40);
        let b = vec![1.0; 40];
        let out = ConjugateGradientSolver::with_tolerance(1e-12)
            .solve(&a, &b)
            .unwrap();
        assert!(out.converged());
        let ax = a.mul_vec(&out.solution);
        let err: f64 = ax.iter().zip(&b).map(|(l, r)| (l - r).powi(2)).sum::<f64>().sqrt();
        assert!(err < 1e-10, "||Ax - b|| = {err:e}");
    }

    #[test]
    fn threshold_is_relative_to_rhs_norm() {
        let d = SpectrumGenerator::build(16, 0.1).unwrap();
        let b: Vec<f64> = vec![100.0; 16];
        let out = ConjugateGradientSolver::with_tolerance(1e-8)
            .solve(&d, &b)
            .unwrap();
        assert!(out.converged());
        assert_eq!(out.rhs_norm, 400.0);
        assert!(out.trace.last().unwrap() <= 1e-8 * 400.0);
    }

    // -----------------------------------------------------------------
    // Iteration cap / soft non-convergence
    // -----------------------------------------------------------------

    #[test]
    fn iteration_cap_returns_partial_trace() {
        let d = SpectrumGenerator::build(200, 1e-6).unwrap();
        let solver = ConjugateGradientSolver::new(CgConfig::default().max_iterations(3));
        let out = solver.solve(&d, &deflated_rhs(200, 0).unwrap()).unwrap();
        assert_eq!(out.iterations(), 3);
        assert_eq!(out.stop_reason, StopReason::IterationCap);
        assert_eq!(out.max_iterations, 3);
    }

    #[test]
    fn zero_tolerance_runs_to_cap_or_exact_zero() {
        let d = SpectrumGenerator::build(8, 0.5).unwrap();
        let solver = ConjugateGradientSolver::new(CgConfig::with_tolerance(0.0).max_iterations(40));
        let out = solver.solve(&d, &deflated_rhs(8, 0).unwrap()).unwrap();
        assert!(out.iterations() <= 40);
        if out.converged() {
            assert_eq!(out.trace.last(), Some(0.0));
        }
    }

    // -----------------------------------------------------------------
    // Errors
    // -----------------------------------------------------------------

    #[test]
    fn zero_rhs_returns_empty_trace() {
        let d = DiagonalMatrix::from_diagonal(vec![1.0, 2.0]).unwrap();
        let out = ConjugateGradientSolver::default().solve(&d, &[0.0, 0.0]).unwrap();
        assert!(out.trace.is_empty());
        assert_eq!(out.solution, vec![0.0, 0.0]);
    }

    #[test]
    fn dimension_mismatch() {
        let d = DiagonalMatrix::from_diagonal(vec![1.0, 2.0]).unwrap();
        let err = ConjugateGradientSolver::default().solve(&d, &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            SolverError::InvalidInput(ValidationError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn non_square_operator() {
        let a = CsrMatrix::<f64>::from_coo(2, 3, vec![(0, 0, 1.0), (1, 1, 1.0)]);
        let err = ConjugateGradientSolver::default().solve(&a, &[1.0, 1.0]).unwrap_err();
        assert!(err.is_domain_error());
    }

    #[test]
    fn indefinite_operator_is_instability() {
        let a = CsrMatrix::<f64>::from_coo(2, 2, vec![(0, 0, -1.0), (1, 1, -2.0)]);
        let err = ConjugateGradientSolver::default().solve(&a, &[1.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            SolverError::NumericalInstability { iteration: 1, .. }
        ));
    }

    #[test]
    fn invalid_tolerance_rejected() {
        let d = DiagonalMatrix::from_diagonal(vec![1.0]).unwrap();
        let err = ConjugateGradientSolver::with_tolerance(f64::NAN)
            .solve(&d, &[1.0])
            .unwrap_err();
        assert!(err.is_domain_error());
    }

    #[test]
    fn residual_trace_uses_deflated_rhs() {
        let d = SpectrumGenerator::build(10, 0.5).unwrap();
        let solver = ConjugateGradientSolver::default();
        let trace = solver.residual_trace(&d, 4).unwrap();
        let direct = solver.solve(&d, &deflated_rhs(10, 4).unwrap()).unwrap().trace;
        assert_eq!(trace, direct);
        assert!(matches!(
            solver.residual_trace(&d, 10),
            Err(SolverError::DegenerateInput { .. })
        ));
    }
}
