//! Helpers shared by the integration tests: a seeded generator, random SPD
//! matrices, a dense Cholesky reference solve and vector norms.

#![allow(dead_code)]

use spectral_cg::types::CsrMatrix;

// ---------------------------------------------------------------------------
// Random number generator (simple LCG for deterministic reproducibility)
// ---------------------------------------------------------------------------

/// A minimal linear congruential generator for deterministic test data.
pub struct Lcg {
    state: u64,
}

impl Lcg {
    /// Create a new LCG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next u64 value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Generate a uniform f64 in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform f64 in [lo, hi).
    pub fn next_f64_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

// ---------------------------------------------------------------------------
// Matrix generators
// ---------------------------------------------------------------------------

/// Random sparse SPD matrix: symmetric off-diagonal entries in `(-1, 1)`
/// with probability `density`, and a diagonal that exceeds each row's
/// absolute off-diagonal sum by a value in `[0.5, 1.5)`.
pub fn random_spd_csr(n: usize, density: f64, seed: u64) -> CsrMatrix<f64> {
    let mut rng = Lcg::new(seed);
    let mut entries: Vec<(usize, usize, f64)> = Vec::new();
    let mut row_abs = vec![0.0f64; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if rng.next_f64() < density {
                let v = rng.next_f64_range(-1.0, 1.0);
                entries.push((i, j, v));
                entries.push((j, i, v));
                row_abs[i] += v.abs();
                row_abs[j] += v.abs();
            }
        }
    }
    for (i, s) in row_abs.iter().enumerate() {
        entries.push((i, i, s + rng.next_f64_range(0.5, 1.5)));
    }

    CsrMatrix::<f64>::from_coo(n, n, entries)
}

/// Deterministic vector with entries in `[-1, 1)`.
pub fn random_vector(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    (0..n).map(|_| rng.next_f64_range(-1.0, 1.0)).collect()
}

// ---------------------------------------------------------------------------
// Dense reference solver
// ---------------------------------------------------------------------------

/// Solve `Ax = b` for SPD `A` by dense Cholesky factorisation `A = L L^T`.
///
/// # Panics
///
/// Panics if `A` is not square, the lengths disagree, or a pivot is not
/// positive.
pub fn dense_solve(matrix: &CsrMatrix<f64>, rhs: &[f64]) -> Vec<f64> {
    let n = matrix.rows;
    assert_eq!(n, matrix.cols, "dense_solve needs a square matrix");
    assert_eq!(rhs.len(), n, "rhs has the wrong length");

    let a = matrix.to_dense();
    let mut l = vec![vec![0.0f64; n]; n];
    for j in 0..n {
        let mut d = a[j][j];
        for k in 0..j {
            d -= l[j][k] * l[j][k];
        }
        assert!(d > 0.0, "pivot {j} is {d}; matrix is not SPD");
        l[j][j] = d.sqrt();
        for i in (j + 1)..n {
            let mut s = a[i][j];
            for k in 0..j {
                s -= l[i][k] * l[j][k];
            }
            l[i][j] = s / l[j][j];
        }
    }

    // L y = b
    let mut y = vec![0.0f64; n];
    for i in 0..n {
        let s: f64 = (0..i).map(|k| l[i][k] * y[k]).sum();
        y[i] = (rhs[i] - s) / l[i][i];
    }
    // L^T x = y
    let mut x = vec![0.0f64; n];
    for i in (0..n).rev() {
        let s: f64 = ((i + 1)..n).map(|k| l[k][i] * x[k]).sum();
        x[i] = (y[i] - s) / l[i][i];
    }
    x
}

// ---------------------------------------------------------------------------
// Floating-point comparison utilities
// ---------------------------------------------------------------------------

/// Compute the L2 norm of a vector.
pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Compute the L2 distance between two vectors.
pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vectors must have same length");
    a.iter()
        .zip(b.iter())
        .map(|(&ai, &bi)| (ai - bi) * (ai - bi))
        .sum::<f64>()
        .sqrt()
}

/// Compute the relative error ||approx - exact|| / ||exact||.
pub fn relative_error(approx: &[f64], exact: &[f64]) -> f64 {
    let exact_norm = l2_norm(exact);
    let error = l2_distance(approx, exact);
    if exact_norm > 1e-15 {
        error / exact_norm
    } else {
        error
    }
}

/// Dense transpose of a row-major matrix.
pub fn dense_transpose(a: &[Vec<f64>]) -> Vec<Vec<f64>> {
    if a.is_empty() {
        return Vec::new();
    }
    let cols = a[0].len();
    (0..cols)
        .map(|j| a.iter().map(|row| row[j]).collect())
        .collect()
}
