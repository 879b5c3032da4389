//! Shared foundation for the BioViz Copilot backend.
//!
//! Defines the error type, configuration, and the small set of domain
//! types (timestamps, expression records) used across the workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AnalysisConfig, BiovizConfig, GatewayConfig, GeneralConfig};
pub use error::{BiovizError, Result};
pub use types::*;
