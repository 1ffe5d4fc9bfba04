//! Domain error types.

use crate::domain::universe::UniverseError;

/// Top-level error type for statarb.
#[derive(Debug, thiserror::Error)]
pub enum StatArbError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("misaligned input data: {reason}")]
    MisalignedData { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("insufficient history for {context}: have {available} periods, need {required}")]
    InsufficientHistory {
        context: String,
        available: usize,
        required: usize,
    },

    #[error("numerical instability: {reason}")]
    NumericalInstability { reason: String },

    #[error("optimization infeasible")]
    InfeasibleOptimization,

    #[error("optimization unbounded")]
    UnboundedOptimization,

    #[error("solver numerical error: {reason}")]
    SolverNumericalError { reason: String },

    #[error("invariant violated ({invariant}): {detail}")]
    InvariantViolation { invariant: String, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StatArbError {
    pub(crate) fn numerical(reason: impl Into<String>) -> Self {
        StatArbError::NumericalInstability {
            reason: reason.into(),
        }
    }

    pub(crate) fn invariant(invariant: &str, detail: impl Into<String>) -> Self {
        StatArbError::InvariantViolation {
            invariant: invariant.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn data(reason: impl Into<String>) -> Self {
        StatArbError::Data {
            reason: reason.into(),
        }
    }

    pub(crate) fn misaligned(reason: impl Into<String>) -> Self {
        StatArbError::MisalignedData {
            reason: reason.into(),
        }
    }
}

impl From<&StatArbError> for std::process::ExitCode {
    fn from(err: &StatArbError) -> Self {
        let code: u8 = match err {
            StatArbError::Io(_) => 1,
            StatArbError::ConfigParse { .. }
            | StatArbError::ConfigMissing { .. }
            | StatArbError::ConfigInvalid { .. }
            | StatArbError::Universe(_) => 2,
            StatArbError::Data { .. } | StatArbError::MisalignedData { .. } => 3,
            StatArbError::InsufficientHistory { .. } => 5,
            StatArbError::NumericalInstability { .. } => 6,
            StatArbError::InfeasibleOptimization
            | StatArbError::UnboundedOptimization
            | StatArbError::SolverNumericalError { .. } => 7,
            StatArbError::InvariantViolation { .. } => 8,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = StatArbError::InsufficientHistory {
            context: "alpha".into(),
            available: 10,
            required: 250,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history for alpha: have 10 periods, need 250"
        );

        let err = StatArbError::invariant("market-neutrality", "beta.w = 3.5");
        assert_eq!(
            err.to_string(),
            "invariant violated (market-neutrality): beta.w = 3.5"
        );
    }

    #[test]
    fn universe_error_converts() {
        let err: StatArbError = UniverseError::EmptyToken.into();
        assert!(matches!(err, StatArbError::Universe(UniverseError::EmptyToken)));
    }
}
