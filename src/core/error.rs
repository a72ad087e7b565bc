use crate::client::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document client error: {0}")]
    Client(#[from] ClientError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entity of type '{0}' has no document id")]
    MissingId(String),

    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    #[error("Document body must be a JSON object, got {0}")]
    InvalidBody(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Returns the classified client failure, if this error wraps one.
    ///
    /// Anything else is an unclassified failure and must propagate to the
    /// caller instead of being folded into a batch result.
    pub fn as_client(&self) -> Option<&ClientError> {
        match self {
            Self::Client(err) => Some(err),
            _ => None,
        }
    }
}
