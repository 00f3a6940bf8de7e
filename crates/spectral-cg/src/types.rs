//! Core types for the spectral CG engine.
//!
//! Provides [`DiagonalMatrix`] for the synthetic SPD operators,
//! [`CsrMatrix`] for the sparse grid-transfer operators, and the
//! [`ResidualTrace`] / [`CgOutcome`] result types.

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, ValidationError};

// ---------------------------------------------------------------------------
// Sparse storage
// ---------------------------------------------------------------------------

/// Row-compressed sparse matrix.
///
/// Row `i` owns the slice `row_ptr[i]..row_ptr[i + 1]` of `col_indices` and
/// `values`, so `row_ptr.len() == rows + 1` and the two entry arrays share
/// one length. Grid-transfer operators store exactly one entry per fine row.
///
/// `PartialEq` compares the stored arrays, so two matrices are equal only
/// when they hold the same entries in the same order with the same bits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix<T> {
    /// Offsets of each row into `col_indices` / `values`.
    pub row_ptr: Vec<usize>,
    /// Column of every stored entry.
    pub col_indices: Vec<usize>,
    /// Value of every stored entry.
    pub values: Vec<T>,
    /// Row count.
    pub rows: usize,
    /// Column count.
    pub cols: usize,
}

impl<T> CsrMatrix<T> {
    /// Stored entry count.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Stored entries per column.
    pub fn col_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0usize; self.cols];
        for &c in &self.col_indices {
            degrees[c] += 1;
        }
        degrees
    }

    /// `(column, value)` pairs of one row, in storage order.
    #[inline]
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, &T)> {
        let span = self.row_ptr[row]..self.row_ptr[row + 1];
        self.col_indices[span.clone()]
            .iter()
            .copied()
            .zip(&self.values[span])
    }
}

impl<T: Copy + Default + std::ops::Mul<Output = T> + std::ops::AddAssign> CsrMatrix<T> {
    /// `y = A x`, overwriting `y`.
    ///
    /// `x` must hold at least `cols` entries and `y` at least `rows`.
    #[inline]
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        debug_assert!(x.len() >= self.cols, "spmv: x has {} < {} entries", x.len(), self.cols);
        debug_assert!(y.len() >= self.rows, "spmv: y has {} < {} entries", y.len(), self.rows);

        for (row, out) in y.iter_mut().take(self.rows).enumerate() {
            let mut acc = T::default();
            for (c, &v) in self.row_entries(row) {
                acc += v * x[c];
            }
            *out = acc;
        }
    }

    /// `A x` into a fresh vector.
    pub fn mul_vec(&self, x: &[T]) -> Vec<T> {
        let mut y = vec![T::default(); self.rows];
        self.spmv(x, &mut y);
        y
    }
}

impl<T: Copy + Default> CsrMatrix<T> {
    /// `A^T` in row-compressed form.
    ///
    /// Entries are bucketed by column in one counting pass and copied in a
    /// second, so every value keeps its exact bits and each output row lists
    /// its columns in ascending order. Runs in `O(nnz + rows + cols)`.
    pub fn transpose(&self) -> CsrMatrix<T> {
        let mut row_ptr = vec![0usize; self.cols + 1];
        for &c in &self.col_indices {
            row_ptr[c + 1] += 1;
        }
        for c in 0..self.cols {
            row_ptr[c + 1] += row_ptr[c];
        }

        let mut next = row_ptr[..self.cols].to_vec();
        let mut col_indices = vec![0usize; self.nnz()];
        let mut values = vec![T::default(); self.nnz()];
        for row in 0..self.rows {
            for (c, &v) in self.row_entries(row) {
                let slot = next[c];
                col_indices[slot] = row;
                values[slot] = v;
                next[c] += 1;
            }
        }

        CsrMatrix {
            row_ptr,
            col_indices,
            values,
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Entry `(row, col)`, or `T::default()` when nothing is stored there.
    pub fn get(&self, row: usize, col: usize) -> T {
        self.row_entries(row)
            .find_map(|(c, &v)| (c == col).then_some(v))
            .unwrap_or_default()
    }

    /// Row-major dense copy, for small matrices.
    pub fn to_dense(&self) -> Vec<Vec<T>> {
        (0..self.rows)
            .map(|row| {
                let mut dense_row = vec![T::default(); self.cols];
                for (c, &v) in self.row_entries(row) {
                    dense_row[c] = v;
                }
                dense_row
            })
            .collect()
    }
}

impl CsrMatrix<f64> {
    /// Assemble from `(row, col, value)` triplets in any order.
    ///
    /// Triplets are ordered by row, then column. Repeated positions are kept
    /// as separate entries.
    ///
    /// # Panics
    ///
    /// Panics if a triplet lies outside `rows x cols`.
    pub fn from_coo(
        rows: usize,
        cols: usize,
        entries: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Self {
        let mut triplets: Vec<(usize, usize, f64)> = entries.into_iter().collect();
        triplets.sort_by_key(|&(r, c, _)| (r, c));

        let mut row_ptr = Vec::with_capacity(rows + 1);
        row_ptr.push(0);
        let mut col_indices = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());

        let mut row = 0;
        for (r, c, v) in triplets {
            assert!(r < rows && c < cols, "entry ({r}, {c}) outside {rows}x{cols}");
            while row < r {
                row_ptr.push(col_indices.len());
                row += 1;
            }
            col_indices.push(c);
            values.push(v);
        }
        while row < rows {
            row_ptr.push(col_indices.len());
            row += 1;
        }

        Self {
            row_ptr,
            col_indices,
            values,
            rows,
            cols,
        }
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Self {
        Self {
            row_ptr: (0..=n).collect(),
            col_indices: (0..n).collect(),
            values: vec![1.0; n],
            rows: n,
            cols: n,
        }
    }
}

// ---------------------------------------------------------------------------
// DiagonalMatrix
// ---------------------------------------------------------------------------

/// Square diagonal operator `diag(d_0, ..., d_{n-1})`.
///
/// Only the `n` diagonal entries are stored; there is no off-diagonal
/// structure. Every entry is finite and strictly positive, so the operator
/// is SPD with eigenvalues equal to its entries.
///
/// Serialises as the plain list of entries. Deserialising goes through
/// [`from_diagonal`](Self::from_diagonal), so invalid entries are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<f64>", try_from = "Vec<f64>")]
pub struct DiagonalMatrix {
    diag: Vec<f64>,
}

impl TryFrom<Vec<f64>> for DiagonalMatrix {
    type Error = SolverError;

    fn try_from(diag: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_diagonal(diag)
    }
}

impl From<DiagonalMatrix> for Vec<f64> {
    fn from(matrix: DiagonalMatrix) -> Self {
        matrix.diag
    }
}

impl DiagonalMatrix {
    /// Wrap a list of diagonal entries.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidInput`] if the list is empty or any entry is
    /// non-finite or not strictly positive.
    pub fn from_diagonal(diag: Vec<f64>) -> Result<Self, SolverError> {
        if diag.is_empty() {
            return Err(SolverError::out_of_range("n", 0, ">= 1"));
        }
        for (i, &d) in diag.iter().enumerate() {
            if !d.is_finite() {
                return Err(ValidationError::NonFiniteValue(format!("diag[{i}] = {d}")).into());
            }
            if d <= 0.0 {
                return Err(SolverError::out_of_range(
                    &format!("diag[{i}]"),
                    d,
                    "> 0 (SPD)",
                ));
            }
        }
        Ok(Self { diag })
    }

    /// Construct without checks. Callers guarantee positivity.
    pub(crate) fn from_diagonal_unchecked(diag: Vec<f64>) -> Self {
        debug_assert!(diag.iter().all(|&d| d > 0.0 && d.is_finite()));
        Self { diag }
    }

    /// Dimension `n`.
    #[inline]
    pub fn dim(&self) -> usize {
        self.diag.len()
    }

    /// Diagonal entries in storage order.
    #[inline]
    pub fn diagonal(&self) -> &[f64] {
        &self.diag
    }

    /// `y = D * x`.
    #[inline]
    pub fn apply(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.diag.len());
        debug_assert_eq!(y.len(), self.diag.len());
        for ((yi, &di), &xi) in y.iter_mut().zip(&self.diag).zip(x) {
            *yi = di * xi;
        }
    }

    /// Smallest eigenvalue (smallest diagonal entry).
    pub fn min_eigenvalue(&self) -> f64 {
        self.diag.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest eigenvalue (largest diagonal entry).
    pub fn max_eigenvalue(&self) -> f64 {
        self.diag.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Spectral condition number `lambda_max / lambda_min`.
    pub fn condition_number(&self) -> f64 {
        self.max_eigenvalue() / self.min_eigenvalue()
    }

    /// Expand into the generic CSR form (one entry per row).
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let n = self.dim();
        CsrMatrix {
            row_ptr: (0..=n).collect(),
            col_indices: (0..n).collect(),
            values: self.diag.clone(),
            rows: n,
            cols: n,
        }
    }
}

// ---------------------------------------------------------------------------
// Solver result types
// ---------------------------------------------------------------------------

/// Residual 2-norms recorded after each completed CG iteration.
///
/// Entry `i` (0-based) is `||r_{i+1}||_2`; the initial residual is not
/// recorded. The trace only ever grows while a solve is running and is
/// immutable once returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResidualTrace {
    residuals: Vec<f64>,
}

impl ResidualTrace {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            residuals: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, residual_norm: f64) {
        debug_assert!(residual_norm >= 0.0);
        self.residuals.push(residual_norm);
    }

    /// Number of completed iterations.
    #[inline]
    pub fn len(&self) -> usize {
        self.residuals.len()
    }

    /// `true` if no iteration completed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.residuals.is_empty()
    }

    /// Residual after the final iteration.
    #[inline]
    pub fn last(&self) -> Option<f64> {
        self.residuals.last().copied()
    }

    /// Borrow the raw residual norms.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.residuals
    }

    /// Iterate over the residual norms in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.residuals.iter().copied()
    }

    /// Consume the trace, returning the residual norms.
    pub fn into_vec(self) -> Vec<f64> {
        self.residuals
    }

    /// 1-based iteration at which the residual first drops strictly below
    /// `threshold`, if it ever does.
    pub fn first_below(&self, threshold: f64) -> Option<usize> {
        self.residuals
            .iter()
            .position(|&r| r < threshold)
            .map(|i| i + 1)
    }

    /// `true` when no entry exceeds the smallest preceding entry by more than
    /// a factor `1 + rel_tol` plus an absolute slack of `abs_tol`.
    ///
    /// CG residual norms are not monotone in general; this is meant for
    /// operators where they are up to rounding.
    pub fn is_non_increasing_within(&self, rel_tol: f64, abs_tol: f64) -> bool {
        let mut running_min = f64::INFINITY;
        for &r in &self.residuals {
            if r > running_min * (1.0 + rel_tol) + abs_tol {
                return false;
            }
            running_min = running_min.min(r);
        }
        true
    }
}

impl From<ResidualTrace> for Vec<f64> {
    fn from(trace: ResidualTrace) -> Self {
        trace.residuals
    }
}

impl<'a> IntoIterator for &'a ResidualTrace {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.residuals.iter()
    }
}

/// Why a CG run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// `||r|| <= rtol * ||b||` was reached.
    Converged,
    /// The iteration cap was hit first. The trace is still valid.
    IterationCap,
}

/// Everything a CG run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct CgOutcome {
    /// Final iterate `x`.
    pub solution: Vec<f64>,
    /// Per-iteration residual norms.
    pub trace: ResidualTrace,
    /// Termination cause.
    pub stop_reason: StopReason,
    /// `||b||_2` of the right-hand side that was solved.
    pub rhs_norm: f64,
    /// Iteration cap that was in effect.
    pub max_iterations: usize,
}

impl CgOutcome {
    /// Number of completed iterations.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.trace.len()
    }

    /// `true` if the run met its tolerance.
    #[inline]
    pub fn converged(&self) -> bool {
        self.stop_reason == StopReason::Converged
    }
}
