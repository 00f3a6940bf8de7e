//! Post-processing of residual traces.
//!
//! Turns a [`ResidualTrace`] into the quantities convergence studies plot or
//! regress on: the effective iteration count to reach a threshold, and the
//! amount of floating-point work spent per iteration.

use serde::{Deserialize, Serialize};

use crate::types::ResidualTrace;

/// Default residual threshold for [`iterations_to_threshold`].
pub const DEFAULT_THRESHOLD: f64 = 1e-10;

/// Iterations needed for the residual to drop strictly below `threshold`.
///
/// Returns the 1-based index of the first entry below the threshold, or
/// `trace.len()` when the trace never crosses it (a truncated run counts as
/// all of its iterations).
pub fn iterations_to_threshold(trace: &ResidualTrace, threshold: f64) -> usize {
    trace.first_below(threshold).unwrap_or(trace.len())
}

/// Iteration index scaled by problem size: `i / m` for `i = 0..len`.
///
/// Puts traces of different sizes on a common axis.
pub fn normalized_iterations(trace_len: usize, m: usize) -> Vec<f64> {
    let m = m.max(1) as f64;
    (0..trace_len).map(|i| i as f64 / m).collect()
}

/// Floating-point work model of one CG iteration on an `m`-row operator with
/// `nnz_per_row` stored entries per row, deflated by `k` vectors.
///
/// One iteration reads `m * nnz_per_row` matrix values for the SpMV, `2m`
/// vector values for the recurrence, and `2 * k * m` values to keep the
/// iterate orthogonal to `k` deflation vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkModel {
    /// Number of rows.
    pub m: usize,
    /// Average stored entries per row of the operator.
    pub nnz_per_row: usize,
}

impl WorkModel {
    /// Create a work model.
    pub fn new(m: usize, nnz_per_row: usize) -> Self {
        Self { m, nnz_per_row }
    }

    /// Floats processed per iteration with `k` deflation vectors.
    pub fn floats_per_iteration(&self, k: usize) -> f64 {
        let m = self.m as f64;
        m * self.nnz_per_row as f64 + 2.0 * m + 2.0 * k as f64 * m
    }

    /// Cumulative work after each of `trace_len` iterations, normalised by
    /// the cost of a dense-equivalent sweep `m^2 * nnz_per_row`.
    pub fn normalized_work(&self, trace_len: usize, k: usize) -> Vec<f64> {
        let per_iter = self.floats_per_iteration(k);
        let m = self.m as f64;
        let scale = m * m * self.nnz_per_row as f64;
        (0..trace_len)
            .map(|i| per_iter * (i + 1) as f64 / scale)
            .collect()
    }
}
