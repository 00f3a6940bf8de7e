//! Errors returned by operator construction and the CG solver.
//!
//! [`SolverError`] is what every fallible public function returns. Bad
//! arguments are wrapped as [`SolverError::InvalidInput`] around a
//! [`ValidationError`] describing the offending value.
//!
//! Reaching the iteration cap is not an error. The run returns its truncated
//! [`ResidualTrace`](crate::types::ResidualTrace) with
//! [`StopReason::IterationCap`](crate::types::StopReason::IterationCap).

/// Error returned by every fallible operation in this crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    /// The caller supplied an invalid parameter (domain error). No partial
    /// object is produced.
    #[error("invalid argument: {0}")]
    InvalidInput(#[from] ValidationError),

    /// The deflated right-hand side collapsed to the zero vector, so it cannot
    /// be normalised.
    #[error("degenerate right-hand side: zeroing {k_zero} leading entries of a length-{n} vector leaves no nonzero entry")]
    DegenerateInput {
        /// Number of leading entries that were zeroed.
        k_zero: usize,
        /// Length of the right-hand side.
        n: usize,
    },

    /// A numerical breakdown was detected (non-positive curvature, NaN, or
    /// Inf). In exact arithmetic this needs a non-SPD operator; in floating
    /// point it can also come from overflow or underflow on extreme spectra.
    #[error("CG breakdown at iteration {iteration}: {detail}")]
    NumericalInstability {
        /// Iteration at which the instability was detected (1-based).
        iteration: usize,
        /// What was observed.
        detail: String,
    },
}

impl SolverError {
    /// Shorthand for a [`ValidationError::ParameterOutOfRange`] domain error.
    pub(crate) fn out_of_range(
        name: &str,
        value: impl std::fmt::Display,
        expected: &str,
    ) -> Self {
        SolverError::InvalidInput(ValidationError::ParameterOutOfRange {
            name: name.into(),
            value: value.to_string(),
            expected: expected.into(),
        })
    }

    /// `true` for the domain-error class (invalid construction parameters).
    pub fn is_domain_error(&self) -> bool {
        matches!(self, SolverError::InvalidInput(_))
    }
}

/// A rejected argument, found before any arithmetic runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Lengths or shapes disagree.
    #[error("shape mismatch: {0}")]
    DimensionMismatch(String),

    /// NaN or infinity in an input vector or matrix.
    #[error("non-finite input: {0}")]
    NonFiniteValue(String),

    /// A stored column index is not below `cols`.
    #[error("row {row} references column {index}, but the matrix has {cols} columns")]
    IndexOutOfBounds {
        /// Stored column index.
        index: usize,
        /// Row holding it.
        row: usize,
        /// Column count of the matrix.
        cols: usize,
    },

    /// `row_ptr` decreases.
    #[error("row_ptr decreases at position {position}")]
    NonMonotonicRowPtrs {
        /// Index into `row_ptr`.
        position: usize,
    },

    /// A scalar argument lies outside its domain.
    #[error("{name} = {value} is outside {expected}")]
    ParameterOutOfRange {
        /// Argument name.
        name: String,
        /// Rendered value.
        value: String,
        /// Accepted domain.
        expected: String,
    },

    /// Requested size is above [`MAX_DIM`](crate::validation::MAX_DIM).
    #[error("size {dim} is above the limit of {max_dim}")]
    DimensionTooLarge {
        /// Requested size.
        dim: usize,
        /// Limit.
        max_dim: usize,
    },
}
