use thiserror::Error;

/// Top-level error type for the Exobio system.
///
/// Each variant covers one subsystem. Subsystem crates return this type
/// directly so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExobioError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ExobioError {
    fn from(err: toml::de::Error) -> Self {
        ExobioError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ExobioError {
    fn from(err: toml::ser::Error) -> Self {
        ExobioError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ExobioError {
    fn from(err: serde_json::Error) -> Self {
        ExobioError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Exobio operations.
pub type Result<T> = std::result::Result<T, ExobioError>;
