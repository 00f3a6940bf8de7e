//! Operator abstraction used by the iterative solver.
//!
//! The CG loop only ever needs `y = A x` and the operator shape, so it is
//! written once against [`LinearOperator`] and runs unchanged on the
//! dedicated [`DiagonalMatrix`] and on a square [`CsrMatrix`].

use crate::types::{CsrMatrix, DiagonalMatrix};

/// A real linear operator `A: R^cols -> R^rows`.
pub trait LinearOperator: Send + Sync {
    /// `(rows, cols)`.
    fn shape(&self) -> (usize, usize);

    /// Compute `y = A x`. `x.len() == cols` and `y.len() == rows`.
    fn apply(&self, x: &[f64], y: &mut [f64]);

    /// Number of stored entries touched by one [`apply`](Self::apply).
    fn nnz(&self) -> usize;
}

impl LinearOperator for DiagonalMatrix {
    #[inline]
    fn shape(&self) -> (usize, usize) {
        (self.dim(), self.dim())
    }

    #[inline]
    fn apply(&self, x: &[f64], y: &mut [f64]) {
        DiagonalMatrix::apply(self, x, y)
    }

    #[inline]
    fn nnz(&self) -> usize {
        self.dim()
    }
}

impl LinearOperator for CsrMatrix<f64> {
    #[inline]
    fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    fn apply(&self, x: &[f64], y: &mut [f64]) {
        self.spmv(x, y)
    }

    #[inline]
    fn nnz(&self) -> usize {
        CsrMatrix::nnz(self)
    }
}
