//! Input validation for construction and solver parameters.
//!
//! Constructors and the solver call these before touching any data. Each
//! check returns a [`ValidationError`], which `?` lifts into
//! [`SolverError::InvalidInput`](crate::error::SolverError::InvalidInput).
//!
//! # Limits
//!
//! | Resource   | Limit        | Constant           |
//! |------------|--------------|--------------------|
//! | Dimension  | 100,000,000  | [`MAX_DIM`]        |
//! | Iterations | 1,000,000    | [`MAX_ITERATIONS`] |

use crate::error::ValidationError;
use crate::types::CsrMatrix;

// ---------------------------------------------------------------------------
// Resource limits
// ---------------------------------------------------------------------------

/// Maximum problem dimension (`n` or `m`).
pub const MAX_DIM: usize = 100_000_000;

/// Largest explicit iteration cap accepted by [`CgConfig`](crate::config::CgConfig).
pub const MAX_ITERATIONS: usize = 1_000_000;

// ---------------------------------------------------------------------------
// Scalar parameters
// ---------------------------------------------------------------------------

/// Validate a problem dimension: `1 <= dim <= MAX_DIM`.
///
/// `name` is used in the error message (`"n"`, `"m"`).
pub fn validate_dimension(name: &str, dim: usize) -> Result<(), ValidationError> {
    if dim == 0 {
        return Err(ValidationError::ParameterOutOfRange {
            name: name.into(),
            value: "0".into(),
            expected: ">= 1".into(),
        });
    }
    if dim > MAX_DIM {
        return Err(ValidationError::DimensionTooLarge {
            dim,
            max_dim: MAX_DIM,
        });
    }
    Ok(())
}

/// Validate the lower spectrum bound: `0 < eps <= 1`.
///
/// NaN is rejected, and so are subnormal values: below
/// [`f64::MIN_POSITIVE`] the condition number `1 / eps` overflows.
pub fn validate_eps(eps: f64) -> Result<(), ValidationError> {
    // Written so that NaN fails the check.
    if !(eps >= f64::MIN_POSITIVE && eps <= 1.0) {
        return Err(ValidationError::ParameterOutOfRange {
            name: "eps".into(),
            value: format!("{eps:e}"),
            expected: "(0, 1], not subnormal".into(),
        });
    }
    Ok(())
}

/// Validate a relative residual tolerance: finite and `>= 0`.
///
/// `0.0` is accepted and means "run until the cap or an exactly zero
/// residual".
pub fn validate_tolerance(tolerance: f64) -> Result<(), ValidationError> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(ValidationError::ParameterOutOfRange {
            name: "tolerance".into(),
            value: format!("{tolerance:e}"),
            expected: "finite value >= 0".into(),
        });
    }
    Ok(())
}

/// Validate an explicit iteration cap: `1 <= max_iterations <= MAX_ITERATIONS`.
pub fn validate_max_iterations(max_iterations: usize) -> Result<(), ValidationError> {
    if max_iterations == 0 || max_iterations > MAX_ITERATIONS {
        return Err(ValidationError::ParameterOutOfRange {
            name: "max_iterations".into(),
            value: max_iterations.to_string(),
            expected: format!("[1, {MAX_ITERATIONS}]"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Vectors and operators
// ---------------------------------------------------------------------------

/// Validate a right-hand-side vector.
///
/// Checks:
///
/// 1. `rhs.len() == expected_len`.
/// 2. No `NaN` or `Inf` entries.
///
/// An all-zero vector passes here; the solver returns immediately for it.
pub fn validate_rhs(rhs: &[f64], expected_len: usize) -> Result<(), ValidationError> {
    if rhs.len() != expected_len {
        return Err(ValidationError::DimensionMismatch(format!(
            "rhs length {} does not match operator dimension {}",
            rhs.len(),
            expected_len,
        )));
    }

    if let Some((i, v)) = rhs.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(ValidationError::NonFiniteValue(format!("rhs[{i}] = {v}")));
    }

    Ok(())
}

/// Check that a [`CsrMatrix`] is well formed: `row_ptr` has `rows + 1`
/// non-decreasing offsets spanning `0..nnz`, the entry arrays agree in
/// length, every column is below `cols`, and every value is finite.
///
/// Unsorted columns within a row are logged at `warn` level but accepted.
///
/// # Errors
///
/// The first violation found, as a [`ValidationError`].
pub fn validate_csr_matrix(matrix: &CsrMatrix<f64>) -> Result<(), ValidationError> {
    if matrix.row_ptr.len() != matrix.rows + 1 {
        return Err(ValidationError::DimensionMismatch(format!(
            "row_ptr has {} offsets, expected {}",
            matrix.row_ptr.len(),
            matrix.rows + 1,
        )));
    }

    for i in 1..matrix.row_ptr.len() {
        if matrix.row_ptr[i] < matrix.row_ptr[i - 1] {
            return Err(ValidationError::NonMonotonicRowPtrs { position: i });
        }
    }

    let nnz = matrix.values.len();
    if matrix.row_ptr[0] != 0 || matrix.row_ptr[matrix.rows] != nnz {
        return Err(ValidationError::DimensionMismatch(format!(
            "row_ptr spans {}..{} but there are {} values",
            matrix.row_ptr[0], matrix.row_ptr[matrix.rows], nnz,
        )));
    }

    if matrix.col_indices.len() != nnz {
        return Err(ValidationError::DimensionMismatch(format!(
            "{} column indices for {} values",
            matrix.col_indices.len(),
            nnz,
        )));
    }

    for row in 0..matrix.rows {
        let mut prev_col: Option<usize> = None;
        for idx in matrix.row_ptr[row]..matrix.row_ptr[row + 1] {
            let col = matrix.col_indices[idx];
            if col >= matrix.cols {
                return Err(ValidationError::IndexOutOfBounds {
                    index: col,
                    row,
                    cols: matrix.cols,
                });
            }

            let val = matrix.values[idx];
            if !val.is_finite() {
                return Err(ValidationError::NonFiniteValue(format!(
                    "matrix[{row}, {col}] = {val}",
                )));
            }

            if let Some(pc) = prev_col {
                if col < pc {
                    tracing::warn!(
                        row = row,
                        "column indices not sorted within row (col {} follows {})",
                        col,
                        pc,
                    );
                }
            }
            prev_col = Some(col);
        }
    }

    Ok(())
}
