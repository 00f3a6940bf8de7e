//! Synthetic SPD operators with a prescribed condition number.
//!
//! [`SpectrumGenerator::build`] places the eigenvalues of a diagonal operator
//! at Chebyshev points of the second kind,
//!
//! ```text
//! node[i] = cos(pi * i / (n - 1)),   i = 0..n-1
//! ```
//!
//! mapped linearly from `[-1, 1]` onto `[eps, 1]`:
//!
//! ```text
//! diag[i] = 0.5 * (1 - eps) * node[i] + 0.5 * (1 + eps)
//! ```
//!
//! The points cluster at both ends of the interval, which is the spectrum
//! shape for which the classical CG convergence bound is sharp. The result
//! has `lambda_max = 1`, `lambda_min = eps` and condition number `1 / eps`.

use std::f64::consts::PI;

use tracing::{debug, instrument};

use crate::error::SolverError;
use crate::types::DiagonalMatrix;
use crate::validation::{validate_dimension, validate_eps};

/// Chebyshev points of the second kind on `[-1, 1]`, descending from `1` to
/// `-1`. Returns `[1.0]` for `n == 1` and an empty vector for `n == 0`.
///
/// The endpoints are exactly `1` and `-1`.
pub fn chebyshev_nodes(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let last = n - 1;
            (0..n)
                .map(|i| {
                    if i == 0 {
                        1.0
                    } else if i == last {
                        -1.0
                    } else {
                        (PI * i as f64 / last as f64).cos()
                    }
                })
                .collect()
        }
    }
}

/// Builder for diagonal SPD test operators.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectrumGenerator;

impl SpectrumGenerator {
    /// Build the `n x n` diagonal operator with eigenvalues at mapped
    /// Chebyshev nodes in `[eps, 1]`.
    ///
    /// Entries are stored in node order, so `diag[0] == 1` and
    /// `diag[n - 1] == eps`. For `n == 1` the single entry is `1`.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidInput`] when `n == 0` or `eps` is outside
    /// `(0, 1]`.
    #[instrument(level = "debug")]
    pub fn build(n: usize, eps: f64) -> Result<DiagonalMatrix, SolverError> {
        validate_eps(eps)?;
        validate_dimension("n", n)?;

        if n == 1 {
            return Ok(DiagonalMatrix::from_diagonal_unchecked(vec![1.0]));
        }

        let scale = 0.5 * (1.0 - eps);
        let shift = 0.5 * (1.0 + eps);
        let last = n - 1;

        let diag: Vec<f64> = chebyshev_nodes(n)
            .into_iter()
            .enumerate()
            .map(|(i, node)| {
                // Pin the endpoints: the affine map is not exact in floating
                // point, but max = 1 and min = eps must be.
                if i == 0 {
                    1.0
                } else if i == last {
                    eps
                } else {
                    (scale * node + shift).clamp(eps, 1.0)
                }
            })
            .collect();

        debug!(n, eps, cond = 1.0 / eps, "built Chebyshev diagonal spectrum");

        Ok(DiagonalMatrix::from_diagonal_unchecked(diag))
    }
}
