use thiserror::Error;

/// Top-level error type for the VIAB system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for ViabError` (or the reverse) so that `?` works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ViabError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ViabError {
    fn from(err: toml::de::Error) -> Self {
        ViabError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ViabError {
    fn from(err: toml::ser::Error) -> Self {
        ViabError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ViabError {
    fn from(err: serde_json::Error) -> Self {
        ViabError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for VIAB operations.
pub type Result<T> = std::result::Result<T, ViabError>;
