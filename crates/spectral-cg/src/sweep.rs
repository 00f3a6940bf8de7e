//! Randomised parameter sweeps over `(eps, m, k)`.
//!
//! [`run_sweep`] samples problem parameters log-uniformly, runs a CG residual
//! trace for each sample, and reports the effective iteration count together
//! with the features a regression of `iterations / m` against `log10(eps)`,
//! `log10(m)` and `k / m` needs. Fitting is left to the caller.
//!
//! Sampling is done up front from a single seeded [`StdRng`], so results do
//! not depend on evaluation order. With the `parallel` feature the samples
//! are evaluated on the rayon pool; output order and values are unchanged.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::analysis::{iterations_to_threshold, DEFAULT_THRESHOLD};
use crate::config::DEFAULT_RTOL;
use crate::error::SolverError;
use crate::validation::{validate_tolerance, MAX_DIM};

/// Sweep configuration.
///
/// # Example
///
/// ```rust
/// use spectral_cg::sweep::{run_sweep, SweepConfig};
///
/// let config = SweepConfig {
///     samples: 3,
///     eps_exp_low: -3.0,
///     eps_exp_high: -2.0,
///     m_exp_low: 1.0,
///     m_exp_high: 2.0,
///     seed: Some(0),
///     ..Default::default()
/// };
/// let rows = run_sweep(&config).unwrap();
/// assert_eq!(rows.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Number of `(eps, m, k)` samples.
    ///
    /// Default: `100`.
    pub samples: usize,

    /// `log10(eps)` is drawn from `[eps_exp_low, eps_exp_high)`.
    ///
    /// Default: `-5.0`.
    pub eps_exp_low: f64,

    /// Default: `-1.0`.
    pub eps_exp_high: f64,

    /// `log10(m)` is drawn from `[m_exp_low, m_exp_high)` and rounded.
    ///
    /// Default: `1.0`.
    pub m_exp_low: f64,

    /// Default: `5.0`.
    pub m_exp_high: f64,

    /// RNG seed. `None` seeds from the OS.
    ///
    /// Default: `None`.
    pub seed: Option<u64>,

    /// Residual threshold passed to
    /// [`iterations_to_threshold`].
    ///
    /// Default: `1e-10`.
    pub threshold: f64,

    /// CG relative tolerance for each run.
    ///
    /// Default: `1e-14`.
    pub rtol: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            samples: 100,
            eps_exp_low: -5.0,
            eps_exp_high: -1.0,
            m_exp_low: 1.0,
            m_exp_high: 5.0,
            seed: None,
            threshold: DEFAULT_THRESHOLD,
            rtol: DEFAULT_RTOL,
        }
    }
}

impl SweepConfig {
    /// Check ranges before sampling.
    pub fn validate(&self) -> Result<(), SolverError> {
        // Smallest exponent whose power of ten is still a normal f64.
        let min_eps_exp = f64::MIN_POSITIVE.log10().ceil();
        check_exponent_range("eps_exp", self.eps_exp_low, self.eps_exp_high, min_eps_exp, 0.0)?;
        let max_m_exp = (MAX_DIM as f64).log10();
        check_exponent_range("m_exp", self.m_exp_low, self.m_exp_high, 0.0, max_m_exp)?;
        validate_tolerance(self.rtol)?;
        if !self.threshold.is_finite() {
            return Err(SolverError::out_of_range("threshold", self.threshold, "finite"));
        }
        Ok(())
    }
}

fn check_exponent_range(
    name: &str,
    low: f64,
    high: f64,
    min: f64,
    max: f64,
) -> Result<(), SolverError> {
    let ok = low.is_finite() && high.is_finite() && low <= high && low >= min && high <= max;
    if !ok {
        return Err(SolverError::out_of_range(
            name,
            format!("[{low}, {high})"),
            &format!("finite ordered range within [{min}, {max}]"),
        ));
    }
    Ok(())
}

/// One evaluated sweep sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSample {
    /// Lower spectrum bound.
    pub eps: f64,
    /// Problem size.
    pub m: usize,
    /// Number of deflated right-hand-side entries (`k < m`).
    pub k: usize,
    /// Sampled `log10(eps)`.
    pub log_eps: f64,
    /// Sampled `log10(m)` before rounding.
    pub log_m: f64,
    /// `k / m`.
    pub k_over_m: f64,
    /// Trace length.
    pub trace_len: usize,
    /// Iterations to cross the threshold.
    pub iterations: usize,
    /// `iterations / m`, the regression target.
    pub iterations_per_m: f64,
}

impl SweepSample {
    /// Regression feature row `[log_eps, log_m, k/m]`.
    pub fn features(&self) -> [f64; 3] {
        [self.log_eps, self.log_m, self.k_over_m]
    }
}

#[derive(Debug, Clone, Copy)]
struct SampleParams {
    eps: f64,
    m: usize,
    k: usize,
    log_eps: f64,
    log_m: f64,
}

fn uniform(rng: &mut StdRng, low: f64, high: f64) -> f64 {
    if low < high {
        rng.gen_range(low..high)
    } else {
        low
    }
}

/// Draw all sample parameters. Draw order: every `log_eps`, then every
/// `log_m`, then every `k`.
fn draw_params(config: &SweepConfig) -> Vec<SampleParams> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let n = config.samples;

    let log_eps: Vec<f64> = (0..n)
        .map(|_| uniform(&mut rng, config.eps_exp_low, config.eps_exp_high))
        .collect();
    let log_m: Vec<f64> = (0..n)
        .map(|_| uniform(&mut rng, config.m_exp_low, config.m_exp_high))
        .collect();
    let ms: Vec<usize> = log_m
        .iter()
        .map(|&lm| (10f64.powf(lm).round() as usize).max(1))
        .collect();

    log_eps
        .into_iter()
        .zip(log_m)
        .zip(ms)
        .map(|((le, lm), m)| {
            let k = ((rng.gen::<f64>() * m as f64) as usize).min(m - 1);
            SampleParams {
                eps: 10f64.powf(le),
                m,
                k,
                log_eps: le,
                log_m: lm,
            }
        })
        .collect()
}

fn evaluate(params: SampleParams, config: &SweepConfig) -> Result<SweepSample, SolverError> {
    let SampleParams {
        eps,
        m,
        k,
        log_eps,
        log_m,
    } = params;
    let trace = crate::cg_residuals(eps, m, k, config.rtol)?;
    let iterations = iterations_to_threshold(&trace, config.threshold);
    debug!(eps, m, k, iterations, "sweep sample evaluated");

    Ok(SweepSample {
        eps,
        m,
        k,
        log_eps,
        log_m,
        k_over_m: k as f64 / m as f64,
        trace_len: trace.len(),
        iterations,
        iterations_per_m: iterations as f64 / m as f64,
    })
}

/// Sample `config.samples` problems and evaluate each one.
///
/// # Errors
///
/// [`SolverError::InvalidInput`] for an invalid configuration; any solver
/// error from an individual sample is propagated.
#[instrument(level = "info", skip(config), fields(samples = config.samples, seed = ?config.seed))]
pub fn run_sweep(config: &SweepConfig) -> Result<Vec<SweepSample>, SolverError> {
    config.validate()?;
    let params = draw_params(config);

    #[cfg(feature = "parallel")]
    let results = {
        use rayon::prelude::*;
        params
            .into_par_iter()
            .map(|p| evaluate(p, config))
            .collect::<Result<Vec<_>, _>>()
    };

    #[cfg(not(feature = "parallel"))]
    let results = params
        .into_iter()
        .map(|p| evaluate(p, config))
        .collect::<Result<Vec<_>, _>>();

    let samples = results?;
    info!(count = samples.len(), "sweep complete");
    Ok(samples)
}
