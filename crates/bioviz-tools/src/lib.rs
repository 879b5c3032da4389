//! Built-in capability handlers for the BioViz copilot.
//!
//! Pathway rendering, statistics, enrichment, threshold updates, and file
//! export, each registered with the gateway as a risk-tagged capability.

pub mod enrichment;
pub mod export;
pub mod pathway;
pub mod thresholds;

use std::path::PathBuf;
use std::sync::Arc;

use bioviz_core::config::AnalysisConfig;
use bioviz_gateway::{CapabilityRegistry, RegistryError};

pub use enrichment::RunEnrichmentHandler;
pub use export::ExportDataHandler;
pub use pathway::{
    ExplainPathwayHandler, ListPathwaysHandler, PathwayCatalog, PathwayStatsHandler,
    RenderPathwayHandler,
};
pub use thresholds::{shared_thresholds, AnalysisThresholds, SharedThresholds, UpdateThresholdsHandler};

/// Register the built-in capability set.
///
/// Returns the shared thresholds handle so the host can read the values the
/// model may later update through a confirmed proposal.
pub fn register_defaults(
    registry: &mut CapabilityRegistry,
    config: &AnalysisConfig,
) -> Result<SharedThresholds, RegistryError> {
    let catalog = Arc::new(PathwayCatalog::builtin());
    let thresholds = shared_thresholds(config);
    let export_dir = PathBuf::from(&config.export_dir);

    registry.register(Arc::new(RenderPathwayHandler::new(
        Arc::clone(&catalog),
        Arc::clone(&thresholds),
    )))?;
    registry.register(Arc::new(PathwayStatsHandler::new(
        Arc::clone(&catalog),
        Arc::clone(&thresholds),
    )))?;
    registry.register(Arc::new(ListPathwaysHandler::new(Arc::clone(&catalog))))?;
    registry.register(Arc::new(ExplainPathwayHandler::new(catalog)))?;
    registry.register(Arc::new(RunEnrichmentHandler::new()))?;
    registry.register(Arc::new(UpdateThresholdsHandler::new(Arc::clone(
        &thresholds,
    ))))?;
    registry.register(Arc::new(ExportDataHandler::new(export_dir)))?;

    Ok(thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioviz_gateway::RiskLevel;

    #[test]
    fn test_register_defaults_full_set() {
        let mut registry = CapabilityRegistry::new();
        register_defaults(&mut registry, &AnalysisConfig::default()).unwrap();

        assert_eq!(registry.len(), 7);
        assert_eq!(
            registry.list_all(),
            vec![
                "render_pathway",
                "get_pathway_stats",
                "list_pathways",
                "explain_pathway",
                "run_enrichment",
                "update_thresholds",
                "export_data",
            ]
        );
    }

    #[test]
    fn test_risk_partition() {
        let mut registry = CapabilityRegistry::new();
        register_defaults(&mut registry, &AnalysisConfig::default()).unwrap();

        assert_eq!(
            registry.list_by_risk(RiskLevel::Auto),
            vec![
                "render_pathway",
                "get_pathway_stats",
                "list_pathways",
                "explain_pathway",
                "run_enrichment",
            ]
        );
        assert_eq!(
            registry.list_by_risk(RiskLevel::Confirm),
            vec!["update_thresholds", "export_data"]
        );
    }

    #[test]
    fn test_double_registration_fails() {
        let mut registry = CapabilityRegistry::new();
        register_defaults(&mut registry, &AnalysisConfig::default()).unwrap();
        let err = register_defaults(&mut registry, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCapability(_)));
    }

    #[test]
    fn test_exported_schemas_are_function_shaped() {
        let mut registry = CapabilityRegistry::new();
        register_defaults(&mut registry, &AnalysisConfig::default()).unwrap();

        for schema in registry.export_schemas() {
            assert_eq!(schema["type"], "function");
            assert!(schema["function"]["name"].is_string());
            assert!(schema["function"]["parameters"]["type"] == "object");
        }
    }
}
