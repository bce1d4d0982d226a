use thiserror::Error;

#[derive(Error, Debug)]
pub enum BudgetError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Could not parse response from {endpoint}: {source}")]
    Parse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Server rejected {endpoint}: {message}")]
    Server { endpoint: String, message: String },

    #[error("Response from {0} carried no payload")]
    MissingPayload(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BudgetError {
    /// True for failures that came from the server's envelope rather than the wire.
    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::MissingPayload(_))
    }
}

pub type Result<T> = std::result::Result<T, BudgetError>;
