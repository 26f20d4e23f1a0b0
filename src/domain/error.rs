// ============================================================
// Layer 3 - Error Taxonomy
// ============================================================
// Every failure in a run falls into one of these buckets:
//
//   InvalidConfig - bad shapes, non-positive learning rate,
//                   zero batch size. Detected before training.
//   Dataset       - a stream could not produce a batch.
//   Computation   - numerical failure in forward / backward,
//                   or a label outside the class range.
//   Checkpoint    - the checkpoint could not be encoded,
//                   decoded, or does not match the run.
//   Io            - reading or writing files.
//
// None of them is retried: the run aborts and main() exits
// with a non-zero status.

use thiserror::Error;

/// Errors that can occur while building or running a training loop.
#[derive(Debug, Error)]
pub enum TrainError {
    /// Invalid training configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The data stream could not produce a batch.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Numerical or label failure during forward / backward.
    #[error("computation error: {0}")]
    Computation(String),

    /// Checkpoint encode / decode failure.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

impl TrainError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a dataset error.
    #[must_use]
    pub fn dataset(reason: impl Into<String>) -> Self {
        Self::Dataset(reason.into())
    }

    /// Creates a computation error.
    #[must_use]
    pub fn computation(reason: impl Into<String>) -> Self {
        Self::Computation(reason.into())
    }

    /// Creates a checkpoint error.
    #[must_use]
    pub fn checkpoint(reason: impl Into<String>) -> Self {
        Self::Checkpoint(reason.into())
    }
}

impl From<std::io::Error> for TrainError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Checkpoint(err.to_string())
    }
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_config() {
        let err = TrainError::invalid_config("batch size must be > 0");
        assert!(err.to_string().contains("invalid configuration"));
        assert!(err.to_string().contains("batch size"));
    }

    #[test]
    fn error_computation() {
        let err = TrainError::computation("label 12 outside [0, 10)");
        assert!(err.to_string().starts_with("computation error"));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: TrainError = io_err.into();
        assert!(matches!(err, TrainError::Io(_)));
    }

    #[test]
    fn error_from_json_error() {
        let json_err = serde_json::from_str::<usize>("not a number").unwrap_err();
        let err: TrainError = json_err.into();
        assert!(matches!(err, TrainError::Checkpoint(_)));
    }
}
