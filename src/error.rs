/// Error taxonomy for the sampler, the deduplication filter and the study runner.
#[derive(Debug, thiserror::Error)]
pub enum DoeError {
    #[error("unknown parameter(s) in correlation spec: {}", .names.join(", "))]
    UnknownParameters { names: Vec<String> },

    #[error("duplicate parameter name: {name}")]
    DuplicateParameter { name: String },

    #[error("invalid range for {name}: [{lower}, {upper}]")]
    InvalidRange { name: String, lower: f64, upper: f64 },

    #[error("correlation between {first} and {second} must lie in [-1, 1], got {rho}")]
    CorrelationOutOfBounds { first: String, second: String, rho: f64 },

    #[error("parameter {name} cannot be correlated with itself")]
    SelfCorrelation { name: String },

    #[error("analysis tag must not be empty")]
    MissingAnalysisTag,

    #[error("scale must be 'zscore' or 'minmax', got '{mode}'")]
    UnsupportedScale { mode: String },

    #[error("keep policy must be 'first' or 'random', got '{policy}'")]
    UnsupportedKeepPolicy { policy: String },

    #[error("unknown feature column: {name}")]
    UnknownColumn { name: String },

    #[error("duplicate feature column: {name}")]
    DuplicateColumn { name: String },

    #[error("row {row} has {len} values, table has {expected} columns")]
    RaggedRow { row: usize, len: usize, expected: usize },

    #[error("column {name} has {len} values, table has {expected} rows")]
    ColumnLength { name: String, len: usize, expected: usize },

    #[error("correlation matrix is not positive definite (fails at parameter {parameter}):\n{matrix}")]
    NotPositiveDefinite { parameter: String, matrix: String },

    #[error("scenario count must be positive, got {count}")]
    InvalidScenarioCount { count: usize },

    #[error("radius must be a non-negative number, got {eps}")]
    InvalidRadius { eps: f64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid study config: {0}")]
    TomlRead(#[from] toml::de::Error),

    #[error("failed to write study config: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

/// Coarse classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is malformed; never retried.
    Configuration,
    /// No valid decomposition of the requested correlation structure exists.
    Conditioning,
    /// A numeric argument is outside its domain.
    InvalidArgument,
    /// Reading or writing study files failed.
    Io,
}

impl DoeError {
    pub fn kind(&self) -> ErrorKind {
        use DoeError::*;
        match self {
            UnknownParameters { .. }
            | DuplicateParameter { .. }
            | InvalidRange { .. }
            | CorrelationOutOfBounds { .. }
            | SelfCorrelation { .. }
            | MissingAnalysisTag
            | UnknownColumn { .. }
            | DuplicateColumn { .. }
            | RaggedRow { .. }
            | ColumnLength { .. }
            | TomlRead(_) => ErrorKind::Configuration,
            NotPositiveDefinite { .. } => ErrorKind::Conditioning,
            InvalidScenarioCount { .. }
            | InvalidRadius { .. }
            | UnsupportedScale { .. }
            | UnsupportedKeepPolicy { .. } => ErrorKind::InvalidArgument,
            Io(_) | Json(_) | TomlWrite(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, DoeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_parameters_message_lists_every_name() {
        let err = DoeError::UnknownParameters {
            names: vec!["Mat_X".to_string(), "Pier_Y".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Mat_X"));
        assert!(msg.contains("Pier_Y"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            DoeError::InvalidScenarioCount { count: 0 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(DoeError::InvalidRadius { eps: -1.0 }.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            DoeError::NotPositiveDefinite {
                parameter: "A".into(),
                matrix: String::new()
            }
            .kind(),
            ErrorKind::Conditioning
        );
        assert_eq!(
            DoeError::UnsupportedScale { mode: "robust".into() }.kind(),
            ErrorKind::InvalidArgument
        );
    }
}
