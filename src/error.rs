use thiserror::Error;

/// Errors raised by the action router and by the bundled estimators.
///
/// Estimators return this same type from `fit`/`predict`, so a failure inside
/// a per-action model reaches the caller exactly as the model produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("{model} failed: {reason}")]
    ModelFailure { model: String, reason: String },
}

impl Error {
    pub(crate) fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn model(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ModelFailure {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_message_names_both_sides() {
        let err = Error::shape("at least 1 columns", "0 columns");
        assert_eq!(
            err.to_string(),
            "shape mismatch: expected at least 1 columns, got 0 columns"
        );
    }

    #[test]
    fn model_failure_message_names_the_model() {
        let err = Error::model("LinearRegressor", "singular system");
        assert_eq!(err.to_string(), "LinearRegressor failed: singular system");
    }
}
