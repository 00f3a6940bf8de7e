//! One-dimensional multigrid grid-transfer operators.
//!
//! A fine grid of `m` points is paired with a coarse grid of
//! `ceil(m / 2)` points: coarse point `j` owns fine points `2j` and `2j + 1`.
//!
//! - **Prolongation** `P` (`m x ceil(m/2)`) copies each coarse value into its
//!   fine pair with weight `0.5` each. When `m` is odd the last coarse point
//!   owns a single fine point and carries weight `1.0`.
//! - **Restriction** `R = P^T` (`ceil(m/2) x m`) is obtained by transposing
//!   `P`, never assembled independently, so the two are exact transposes of
//!   each other bit-for-bit.
//!
//! ```text
//! m = 5:            P                      R = P^T
//!            [0.5  0    0  ]     [0.5  0.5  0    0    0  ]
//!            [0.5  0    0  ]     [0    0    0.5  0.5  0  ]
//!            [0    0.5  0  ]     [0    0    0    0    1.0]
//!            [0    0.5  0  ]
//!            [0    0    1.0]
//! ```

use tracing::debug;

use crate::error::SolverError;
use crate::types::CsrMatrix;
use crate::validation::validate_dimension;

/// Weight of each fine point in a paired coarse cell.
const PAIR_WEIGHT: f64 = 0.5;

/// Weight of the lone fine point in the trailing cell of an odd grid.
const SINGLE_WEIGHT: f64 = 1.0;

/// Number of coarse points for a fine grid of `m` points: `ceil(m / 2)`.
#[inline]
pub fn coarse_size(m: usize) -> usize {
    m.div_ceil(2)
}

/// Constructors for the prolongation / restriction pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridTransferOperator;

impl GridTransferOperator {
    /// Prolongation from `ceil(m/2)` coarse points to `m` fine points.
    ///
    /// For each coarse index `j` with fine indices `i1 = 2j`, `i2 = 2j + 1`:
    /// `P[i1, j] = 1.0` if `i2 >= m`, else `0.5`; and `P[i2, j] = 0.5` when
    /// `i2 < m`. Every column has one or two entries summing to `1`.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidInput`] when `m == 0`.
    pub fn prolongation(m: usize) -> Result<CsrMatrix<f64>, SolverError> {
        validate_dimension("m", m)?;
        let n_coarse = coarse_size(m);

        // Each fine row i holds exactly one entry, in column i / 2, so the
        // CSR arrays can be written directly in row order.
        let row_ptr: Vec<usize> = (0..=m).collect();
        let col_indices: Vec<usize> = (0..m).map(|i| i / 2).collect();
        let values: Vec<f64> = (0..m)
            .map(|i| {
                let unpaired = i % 2 == 0 && i + 1 >= m;
                if unpaired {
                    SINGLE_WEIGHT
                } else {
                    PAIR_WEIGHT
                }
            })
            .collect();

        debug!(m, n_coarse, "built prolongation operator");

        Ok(CsrMatrix {
            row_ptr,
            col_indices,
            values,
            rows: m,
            cols: n_coarse,
        })
    }

    /// Restriction from `m` fine points to `ceil(m/2)` coarse points,
    /// defined as the transpose of [`prolongation`](Self::prolongation).
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidInput`] when `m == 0`.
    pub fn coarsen(m: usize) -> Result<CsrMatrix<f64>, SolverError> {
        Ok(Self::prolongation(m)?.transpose())
    }
}
