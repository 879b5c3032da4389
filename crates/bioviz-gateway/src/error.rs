//! Error types for the authorization gateway.
//!
//! Only registration problems surface as hard errors; everything a model can
//! cause at runtime (bad arguments, unknown names, failing handlers) is
//! recovered into a plain-text [`crate::types::Decision::Chat`].

use thiserror::Error;

/// Errors raised while building the capability registry.
///
/// These are startup configuration errors and abort initialization.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Capability already registered: {0}")]
    DuplicateCapability(String),
    #[error("Capability '{capability}' declares context key '{key}' that is not in its parameter schema")]
    UndeclaredContextKey { capability: String, key: String },
}

/// Errors returned by capability handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
}

/// Failures produced at the dispatch boundary.
///
/// Whatever goes wrong inside a handler, the rest of the pipeline only ever
/// sees one of these variants.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    Handler(#[from] HandlerError),
    #[error("Execution timed out after {0} seconds")]
    Timeout(u64),
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::DuplicateCapability("export_data".to_string());
        assert_eq!(err.to_string(), "Capability already registered: export_data");

        let err = RegistryError::UndeclaredContextKey {
            capability: "render_pathway".to_string(),
            key: "gene_expression".to_string(),
        };
        assert!(err.to_string().contains("render_pathway"));
        assert!(err.to_string().contains("gene_expression"));
    }

    #[test]
    fn test_handler_error_display() {
        let err = HandlerError::InvalidArguments("missing pathway_id".to_string());
        assert_eq!(err.to_string(), "Invalid arguments: missing pathway_id");

        let err = HandlerError::Failed("template not found".to_string());
        assert_eq!(err.to_string(), "template not found");
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::Timeout(30);
        assert_eq!(err.to_string(), "Execution timed out after 30 seconds");

        let err = DispatchError::Panicked("index out of bounds".to_string());
        assert_eq!(err.to_string(), "Handler panicked: index out of bounds");
    }

    #[test]
    fn test_dispatch_error_from_handler_error() {
        let err: DispatchError = HandlerError::Failed("boom".to_string()).into();
        assert!(matches!(err, DispatchError::Handler(_)));
        assert_eq!(err.to_string(), "boom");
    }
}
