//! Pathway templates and the read-only pathway capabilities.
//!
//! Templates are bundled with the application; rendering colors each node by
//! the loaded expression values against the shared fold-change threshold.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use bioviz_gateway::{CapabilityHandler, HandlerError, RiskLevel};

use crate::thresholds::{current, SharedThresholds};

const COLOR_UP: &str = "#e53935";
const COLOR_DOWN: &str = "#1e88e5";
const COLOR_UNCHANGED: &str = "#bdbdbd";

// =============================================================================
// Catalog
// =============================================================================

/// One bundled pathway template.
#[derive(Debug, Clone)]
pub struct PathwayTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub genes: &'static [&'static str],
}

/// Catalog of bundled pathway templates, keyed by KEGG-style id.
pub struct PathwayCatalog {
    templates: Vec<PathwayTemplate>,
}

impl PathwayCatalog {
    /// The templates shipped with the application.
    pub fn builtin() -> Self {
        Self {
            templates: vec![
                PathwayTemplate {
                    id: "hsa04210",
                    name: "Apoptosis",
                    description: "Apoptosis pathway - programmed cell death signaling",
                    genes: &[
                        "CASP3", "CASP8", "CASP9", "BAX", "BCL2", "TP53", "FAS", "FADD",
                        "APAF1", "CYCS",
                    ],
                },
                PathwayTemplate {
                    id: "hsa04110",
                    name: "Cell Cycle",
                    description: "Cell cycle - regulation of cell division",
                    genes: &[
                        "CDK1", "CDK2", "CDK4", "CDK6", "CCNB1", "CCND1", "CCNE1", "RB1",
                        "E2F1", "CDKN1A",
                    ],
                },
                PathwayTemplate {
                    id: "hsa04115",
                    name: "P53 Signaling",
                    description: "p53 signaling pathway - tumor suppressor response",
                    genes: &[
                        "TP53", "MDM2", "CDKN1A", "BAX", "BBC3", "GADD45A", "SFN", "RRM2B",
                        "SESN1", "CCNG1",
                    ],
                },
                PathwayTemplate {
                    id: "hsa04151",
                    name: "PI3K-Akt Signaling",
                    description: "PI3K-Akt signaling pathway - cell survival and growth",
                    genes: &[
                        "PIK3CA", "AKT1", "AKT2", "PTEN", "MTOR", "GSK3B", "FOXO3", "PDPK1",
                        "TSC2", "RHEB",
                    ],
                },
                PathwayTemplate {
                    id: "hsa04010",
                    name: "MAPK Signaling",
                    description: "MAPK signaling pathway - cell proliferation and differentiation",
                    genes: &[
                        "MAPK1", "MAPK3", "MAP2K1", "MAP2K2", "RAF1", "BRAF", "HRAS", "KRAS",
                        "NRAS", "DUSP1",
                    ],
                },
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&PathwayTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Templates sorted by id.
    pub fn list(&self) -> Vec<&PathwayTemplate> {
        let mut all: Vec<&PathwayTemplate> = self.templates.iter().collect();
        all.sort_by_key(|t| t.id);
        all
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

// =============================================================================
// Coloring
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PathwayNode {
    pub gene: String,
    pub log2fc: Option<f64>,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PathwayStatistics {
    pub total_nodes: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub unchanged: usize,
}

/// Color every node of a template by the expression map.
///
/// Genes without a measurement stay unchanged/grey.
pub fn color_pathway(
    template: &PathwayTemplate,
    expression: &HashMap<String, f64>,
    logfc_threshold: f64,
) -> (Vec<PathwayNode>, PathwayStatistics) {
    let mut nodes = Vec::with_capacity(template.genes.len());
    let mut stats = PathwayStatistics {
        total_nodes: template.genes.len(),
        ..PathwayStatistics::default()
    };

    for gene in template.genes {
        let log2fc = expression.get(*gene).copied();
        let color = match log2fc {
            Some(v) if v > logfc_threshold => {
                stats.upregulated += 1;
                COLOR_UP
            }
            Some(v) if v < -logfc_threshold => {
                stats.downregulated += 1;
                COLOR_DOWN
            }
            _ => {
                stats.unchanged += 1;
                COLOR_UNCHANGED
            }
        };
        nodes.push(PathwayNode {
            gene: (*gene).to_string(),
            log2fc,
            color,
        });
    }

    (nodes, stats)
}

/// Extract the `gene_expression` argument as a gene -> log2fc map.
///
/// Non-numeric entries are skipped rather than failing the whole request.
fn expression_map(arguments: &Value) -> Result<HashMap<String, f64>, HandlerError> {
    let Some(raw) = arguments.get("gene_expression") else {
        return Err(HandlerError::InvalidArguments(
            "gene_expression is required (load an analysis or pass values explicitly)".to_string(),
        ));
    };
    let Some(obj) = raw.as_object() else {
        return Err(HandlerError::InvalidArguments(
            "gene_expression must be an object mapping gene symbols to log2 fold changes"
                .to_string(),
        ));
    };
    let mut map = HashMap::with_capacity(obj.len());
    for (gene, value) in obj {
        match value.as_f64() {
            Some(v) => {
                map.insert(gene.clone(), v);
            }
            None => {
                tracing::warn!(gene = %gene, "Skipping non-numeric expression value");
            }
        }
    }
    Ok(map)
}

fn required_pathway_id(arguments: &Value) -> Result<&str, HandlerError> {
    arguments
        .get("pathway_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerError::InvalidArguments("pathway_id is required".to_string()))
}

fn render_parameters() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "pathway_id": {
                "type": "string",
                "description": "KEGG pathway ID (e.g., 'hsa04210' for Apoptosis)"
            },
            "gene_expression": {
                "type": "object",
                "description": "Dictionary mapping gene symbols to expression values (log2 fold change)",
                "additionalProperties": {"type": "number"}
            },
            "data_type": {
                "type": "string",
                "enum": ["gene", "protein", "cell"],
                "description": "Type of biological data",
                "default": "gene"
            }
        },
        "required": ["pathway_id"]
    })
}

// =============================================================================
// render_pathway
// =============================================================================

/// Auto-risk capability that renders a colored pathway.
pub struct RenderPathwayHandler {
    catalog: Arc<PathwayCatalog>,
    thresholds: SharedThresholds,
}

impl RenderPathwayHandler {
    pub fn new(catalog: Arc<PathwayCatalog>, thresholds: SharedThresholds) -> Self {
        Self { catalog, thresholds }
    }
}

#[async_trait]
impl CapabilityHandler for RenderPathwayHandler {
    fn name(&self) -> &str {
        "render_pathway"
    }

    fn label(&self) -> &str {
        "Pathway Visualization"
    }

    fn description(&self) -> &str {
        "Render and color a KEGG pathway with gene expression data. Returns the colored pathway and statistics."
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Auto
    }

    fn parameters(&self) -> Value {
        render_parameters()
    }

    fn context_keys(&self) -> &[&str] {
        &["gene_expression"]
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, HandlerError> {
        let pathway_id = required_pathway_id(arguments)?;
        let expression = expression_map(arguments)?;
        let template = self.catalog.get(pathway_id).ok_or_else(|| {
            HandlerError::Failed(format!("Unknown pathway template: {}", pathway_id))
        })?;

        let logfc = current(&self.thresholds).logfc;
        let (nodes, stats) = color_pathway(template, &expression, logfc);
        tracing::info!(pathway = pathway_id, nodes = stats.total_nodes, "Rendered pathway");

        Ok(serde_json::json!({
            "pathway": {
                "id": template.id,
                "name": template.name,
                "nodes": nodes,
            },
            "statistics": stats,
        }))
    }

    fn summarize(&self, result: &Value) -> String {
        let stats = &result["statistics"];
        format!(
            "Rendered pathway with {} nodes: {} upregulated, {} downregulated.",
            stats["total_nodes"].as_u64().unwrap_or(0),
            stats["upregulated"].as_u64().unwrap_or(0),
            stats["downregulated"].as_u64().unwrap_or(0),
        )
    }
}

// =============================================================================
// get_pathway_stats
// =============================================================================

/// Auto-risk capability that computes pathway statistics without rendering.
pub struct PathwayStatsHandler {
    catalog: Arc<PathwayCatalog>,
    thresholds: SharedThresholds,
}

impl PathwayStatsHandler {
    pub fn new(catalog: Arc<PathwayCatalog>, thresholds: SharedThresholds) -> Self {
        Self { catalog, thresholds }
    }
}

#[async_trait]
impl CapabilityHandler for PathwayStatsHandler {
    fn name(&self) -> &str {
        "get_pathway_stats"
    }

    fn label(&self) -> &str {
        "Pathway Statistics"
    }

    fn description(&self) -> &str {
        "Get statistics for a pathway (upregulated, downregulated, unchanged counts) without full rendering."
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Auto
    }

    fn parameters(&self) -> Value {
        render_parameters()
    }

    fn context_keys(&self) -> &[&str] {
        &["gene_expression"]
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, HandlerError> {
        let pathway_id = required_pathway_id(arguments)?;
        let expression = expression_map(arguments)?;
        let template = self.catalog.get(pathway_id).ok_or_else(|| {
            HandlerError::Failed(format!("Unknown pathway template: {}", pathway_id))
        })?;

        let logfc = current(&self.thresholds).logfc;
        let (_, stats) = color_pathway(template, &expression, logfc);
        serde_json::to_value(stats).map_err(|e| HandlerError::Failed(e.to_string()))
    }

    fn summarize(&self, result: &Value) -> String {
        format!(
            "Statistics: {} upregulated, {} downregulated out of {} nodes.",
            result["upregulated"].as_u64().unwrap_or(0),
            result["downregulated"].as_u64().unwrap_or(0),
            result["total_nodes"].as_u64().unwrap_or(0),
        )
    }
}

// =============================================================================
// list_pathways
// =============================================================================

/// Auto-risk capability that lists the bundled pathway templates.
pub struct ListPathwaysHandler {
    catalog: Arc<PathwayCatalog>,
}

impl ListPathwaysHandler {
    pub fn new(catalog: Arc<PathwayCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl CapabilityHandler for ListPathwaysHandler {
    fn name(&self) -> &str {
        "list_pathways"
    }

    fn label(&self) -> &str {
        "Pathway Portfolio"
    }

    fn description(&self) -> &str {
        "List all available KEGG pathway templates."
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Auto
    }

    fn parameters(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, _arguments: &Value) -> Result<Value, HandlerError> {
        let templates: Vec<Value> = self
            .catalog
            .list()
            .into_iter()
            .map(|t| serde_json::json!({"id": t.id, "name": t.name}))
            .collect();
        Ok(Value::Array(templates))
    }

    fn summarize(&self, result: &Value) -> String {
        let count = result.as_array().map(Vec::len).unwrap_or(0);
        format!("Found {} available pathway templates.", count)
    }
}

// =============================================================================
// explain_pathway
// =============================================================================

/// Auto-risk capability that describes what a pathway does.
pub struct ExplainPathwayHandler {
    catalog: Arc<PathwayCatalog>,
}

impl ExplainPathwayHandler {
    pub fn new(catalog: Arc<PathwayCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl CapabilityHandler for ExplainPathwayHandler {
    fn name(&self) -> &str {
        "explain_pathway"
    }

    fn label(&self) -> &str {
        "Pathway Explainer"
    }

    fn description(&self) -> &str {
        "Get a brief description of what a pathway does."
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Auto
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pathway_id": {
                    "type": "string",
                    "description": "KEGG pathway ID to explain"
                }
            },
            "required": ["pathway_id"]
        })
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, HandlerError> {
        let pathway_id = required_pathway_id(arguments)?;
        let description = match self.catalog.get(pathway_id) {
            Some(t) => t.description.to_string(),
            None => format!("KEGG pathway {}", pathway_id),
        };
        Ok(serde_json::json!({"id": pathway_id, "description": description}))
    }

    fn summarize(&self, result: &Value) -> String {
        result["description"]
            .as_str()
            .unwrap_or("Pathway description unavailable.")
            .to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bioviz_core::config::AnalysisConfig;
    use crate::thresholds::shared_thresholds;

    fn setup() -> (Arc<PathwayCatalog>, SharedThresholds) {
        (
            Arc::new(PathwayCatalog::builtin()),
            shared_thresholds(&AnalysisConfig::default()),
        )
    }

    // ---- Catalog ----

    #[test]
    fn test_catalog_lookup() {
        let catalog = PathwayCatalog::builtin();
        assert_eq!(catalog.get("hsa04210").unwrap().name, "Apoptosis");
        assert!(catalog.get("hsa99999").is_none());
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn test_catalog_list_sorted_by_id() {
        let catalog = PathwayCatalog::builtin();
        let ids: Vec<&str> = catalog.list().iter().map(|t| t.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    // ---- Coloring ----

    #[test]
    fn test_color_pathway_counts() {
        let catalog = PathwayCatalog::builtin();
        let template = catalog.get("hsa04210").unwrap();
        let mut expression = HashMap::new();
        expression.insert("CASP3".to_string(), 2.5);
        expression.insert("BCL2".to_string(), -1.8);
        expression.insert("TP53".to_string(), 0.3);

        let (nodes, stats) = color_pathway(template, &expression, 1.0);
        assert_eq!(stats.total_nodes, 10);
        assert_eq!(stats.upregulated, 1);
        assert_eq!(stats.downregulated, 1);
        assert_eq!(stats.unchanged, 8);

        let casp3 = nodes.iter().find(|n| n.gene == "CASP3").unwrap();
        assert_eq!(casp3.color, COLOR_UP);
        let bcl2 = nodes.iter().find(|n| n.gene == "BCL2").unwrap();
        assert_eq!(bcl2.color, COLOR_DOWN);
        // Unmeasured genes stay grey with no value
        let fas = nodes.iter().find(|n| n.gene == "FAS").unwrap();
        assert!(fas.log2fc.is_none());
        assert_eq!(fas.color, COLOR_UNCHANGED);
    }

    #[test]
    fn test_color_pathway_threshold_boundary() {
        let catalog = PathwayCatalog::builtin();
        let template = catalog.get("hsa04210").unwrap();
        let mut expression = HashMap::new();
        expression.insert("CASP3".to_string(), 1.0);

        // Exactly at the threshold counts as unchanged
        let (_, stats) = color_pathway(template, &expression, 1.0);
        assert_eq!(stats.upregulated, 0);
        assert_eq!(stats.unchanged, 10);
    }

    // ---- render_pathway ----

    #[tokio::test]
    async fn test_render_pathway() {
        let (catalog, thresholds) = setup();
        let handler = RenderPathwayHandler::new(catalog, thresholds);
        let result = handler
            .execute(&serde_json::json!({
                "pathway_id": "hsa04210",
                "gene_expression": {"CASP3": 2.5, "BCL2": -1.8}
            }))
            .await
            .unwrap();

        assert_eq!(result["pathway"]["id"], "hsa04210");
        assert_eq!(result["statistics"]["upregulated"], 1);
        assert_eq!(result["statistics"]["downregulated"], 1);

        let summary = handler.summarize(&result);
        assert_eq!(
            summary,
            "Rendered pathway with 10 nodes: 1 upregulated, 1 downregulated."
        );
    }

    #[tokio::test]
    async fn test_render_pathway_missing_id() {
        let (catalog, thresholds) = setup();
        let handler = RenderPathwayHandler::new(catalog, thresholds);
        let err = handler
            .execute(&serde_json::json!({"gene_expression": {}}))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_render_pathway_unknown_template() {
        let (catalog, thresholds) = setup();
        let handler = RenderPathwayHandler::new(catalog, thresholds);
        let err = handler
            .execute(&serde_json::json!({
                "pathway_id": "hsa99999",
                "gene_expression": {}
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("hsa99999"));
    }

    #[tokio::test]
    async fn test_render_pathway_missing_expression() {
        let (catalog, thresholds) = setup();
        let handler = RenderPathwayHandler::new(catalog, thresholds);
        let err = handler
            .execute(&serde_json::json!({"pathway_id": "hsa04210"}))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_render_respects_updated_threshold() {
        let (catalog, thresholds) = setup();
        let handler = RenderPathwayHandler::new(catalog, Arc::clone(&thresholds));
        let args = serde_json::json!({
            "pathway_id": "hsa04210",
            "gene_expression": {"CASP3": 1.5}
        });

        let result = handler.execute(&args).await.unwrap();
        assert_eq!(result["statistics"]["upregulated"], 1);

        // Raise the threshold; the same value is no longer significant
        thresholds.lock().unwrap().logfc = 2.0;
        let result = handler.execute(&args).await.unwrap();
        assert_eq!(result["statistics"]["upregulated"], 0);
    }

    #[tokio::test]
    async fn test_non_numeric_expression_values_skipped() {
        let (catalog, thresholds) = setup();
        let handler = RenderPathwayHandler::new(catalog, thresholds);
        let result = handler
            .execute(&serde_json::json!({
                "pathway_id": "hsa04210",
                "gene_expression": {"CASP3": "high", "BAX": 2.0}
            }))
            .await
            .unwrap();
        assert_eq!(result["statistics"]["upregulated"], 1);
    }

    // ---- get_pathway_stats ----

    #[tokio::test]
    async fn test_pathway_stats() {
        let (catalog, thresholds) = setup();
        let handler = PathwayStatsHandler::new(catalog, thresholds);
        let result = handler
            .execute(&serde_json::json!({
                "pathway_id": "hsa04110",
                "gene_expression": {"CDK1": 3.0, "RB1": -2.0, "E2F1": 1.2}
            }))
            .await
            .unwrap();

        assert_eq!(result["total_nodes"], 10);
        assert_eq!(result["upregulated"], 2);
        assert_eq!(result["downregulated"], 1);

        let summary = handler.summarize(&result);
        assert_eq!(summary, "Statistics: 2 upregulated, 1 downregulated out of 10 nodes.");
    }

    // ---- list_pathways ----

    #[tokio::test]
    async fn test_list_pathways() {
        let (catalog, _) = setup();
        let handler = ListPathwaysHandler::new(catalog);
        let result = handler.execute(&serde_json::json!({})).await.unwrap();

        let list = result.as_array().unwrap();
        assert_eq!(list.len(), 5);
        assert_eq!(list[0]["id"], "hsa04010");
        assert_eq!(handler.summarize(&result), "Found 5 available pathway templates.");
    }

    // ---- explain_pathway ----

    #[tokio::test]
    async fn test_explain_known_pathway() {
        let (catalog, _) = setup();
        let handler = ExplainPathwayHandler::new(catalog);
        let result = handler
            .execute(&serde_json::json!({"pathway_id": "hsa04115"}))
            .await
            .unwrap();
        assert!(result["description"].as_str().unwrap().contains("p53"));
        assert!(handler.summarize(&result).contains("p53"));
    }

    #[tokio::test]
    async fn test_explain_unknown_pathway_generic_text() {
        let (catalog, _) = setup();
        let handler = ExplainPathwayHandler::new(catalog);
        let result = handler
            .execute(&serde_json::json!({"pathway_id": "hsa00010"}))
            .await
            .unwrap();
        assert_eq!(result["description"], "KEGG pathway hsa00010");
    }

    // ---- Metadata ----

    #[test]
    fn test_all_pathway_capabilities_are_auto() {
        let (catalog, thresholds) = setup();
        assert_eq!(
            RenderPathwayHandler::new(Arc::clone(&catalog), Arc::clone(&thresholds)).risk_level(),
            RiskLevel::Auto
        );
        assert_eq!(
            PathwayStatsHandler::new(Arc::clone(&catalog), thresholds).risk_level(),
            RiskLevel::Auto
        );
        assert_eq!(
            ListPathwaysHandler::new(Arc::clone(&catalog)).risk_level(),
            RiskLevel::Auto
        );
        assert_eq!(ExplainPathwayHandler::new(catalog).risk_level(), RiskLevel::Auto);
    }
}
