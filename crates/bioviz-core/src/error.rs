use thiserror::Error;

/// Top-level error type for the BioViz backend.
///
/// Each variant wraps a subsystem-specific message. Subsystem crates define
/// their own error types and convert into `BiovizError` at crate boundaries
/// so that the `?` operator works seamlessly across the workspace.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BiovizError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Pathway error: {0}")]
    Pathway(String),

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for BiovizError {
    fn from(err: toml::de::Error) -> Self {
        BiovizError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for BiovizError {
    fn from(err: toml::ser::Error) -> Self {
        BiovizError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for BiovizError {
    fn from(err: serde_json::Error) -> Self {
        BiovizError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for BioViz operations.
pub type Result<T> = std::result::Result<T, BiovizError>;
