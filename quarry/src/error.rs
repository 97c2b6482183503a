use mongodb::bson;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A plural remove or update was configured with a limit other than none, 0 or 1.
    #[error("a removal or update limit must be absent, 0, or 1 (got {0})")]
    InvalidLimit(i64),

    /// `save` was called for a type without an identity.
    #[error("save is not supported for documents without an identity")]
    UnsupportedOperation,

    /// `to_collection` was called on a map-reduce still producing inline results.
    #[error("the map-reduce options must specify a non-inline result")]
    InlineMapReduce,

    #[error("failed to encode document: {0}")]
    Encoding(#[from] bson::ser::Error),

    #[error("failed to decode document: {0}")]
    Decoding(#[from] bson::de::Error),

    /// Raised by the execution engine and passed through untouched.
    #[error("command execution failed: {0}")]
    Execution(#[source] BoxError),

    #[error("{operation} received an unexpected reply from the executor")]
    UnexpectedReply { operation: &'static str },
}

impl Error {
    pub fn execution(error: impl Into<BoxError>) -> Self {
        Self::Execution(error.into())
    }

    /// Whether the error was detected locally, before anything was submitted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidLimit(_) | Self::UnsupportedOperation | Self::InlineMapReduce
        )
    }
}
