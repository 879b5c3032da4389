//! Over-representation analysis against bundled gene-set libraries.
//!
//! Each term is scored with a hypergeometric upper-tail p-value: the chance
//! of drawing at least the observed overlap when sampling the input list
//! from a fixed gene universe.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;

use bioviz_gateway::{CapabilityHandler, HandlerError, RiskLevel};

/// Approximate number of protein-coding genes used as the sampling universe.
const GENE_UNIVERSE: u64 = 20_000;

/// Maximum number of terms returned to the caller.
const MAX_TERMS: usize = 20;

// =============================================================================
// Gene-set libraries
// =============================================================================

#[derive(Debug, Clone)]
pub struct GeneSet {
    pub name: &'static str,
    pub genes: &'static [&'static str],
}

/// One bundled gene-set source (reactome, wikipathways, go_bp).
pub struct GeneSetLibrary {
    pub source: &'static str,
    pub sets: Vec<GeneSet>,
}

impl GeneSetLibrary {
    pub fn reactome() -> Self {
        Self {
            source: "reactome",
            sets: vec![
                GeneSet {
                    name: "Intrinsic Pathway for Apoptosis",
                    genes: &["CASP3", "CASP9", "BAX", "BCL2", "APAF1", "CYCS", "BBC3", "BID"],
                },
                GeneSet {
                    name: "Cell Cycle Checkpoints",
                    genes: &["CDK1", "CDK2", "CCNB1", "CCNE1", "RB1", "E2F1", "CDKN1A", "ATM"],
                },
                GeneSet {
                    name: "PIP3 activates AKT signaling",
                    genes: &["PIK3CA", "AKT1", "AKT2", "PTEN", "MTOR", "GSK3B", "FOXO3", "PDPK1"],
                },
                GeneSet {
                    name: "MAPK family signaling cascades",
                    genes: &["MAPK1", "MAPK3", "MAP2K1", "RAF1", "BRAF", "HRAS", "KRAS", "DUSP1"],
                },
                GeneSet {
                    name: "Transcriptional Regulation by TP53",
                    genes: &["TP53", "MDM2", "CDKN1A", "BAX", "GADD45A", "SFN", "SESN1", "RRM2B"],
                },
            ],
        }
    }

    pub fn wikipathways() -> Self {
        Self {
            source: "wikipathways",
            sets: vec![
                GeneSet {
                    name: "Apoptosis",
                    genes: &["CASP3", "CASP8", "CASP9", "FAS", "FADD", "BCL2", "BAX", "APAF1"],
                },
                GeneSet {
                    name: "Cell Cycle",
                    genes: &["CDK1", "CDK4", "CDK6", "CCND1", "CCNB1", "RB1", "E2F1", "CDKN1A"],
                },
                GeneSet {
                    name: "EGFR Tyrosine Kinase Inhibitor Resistance",
                    genes: &["EGFR", "KRAS", "BRAF", "PIK3CA", "AKT1", "MTOR", "MAPK1", "MAPK3"],
                },
            ],
        }
    }

    pub fn go_bp() -> Self {
        Self {
            source: "go_bp",
            sets: vec![
                GeneSet {
                    name: "apoptotic process",
                    genes: &["CASP3", "CASP8", "CASP9", "BAX", "BCL2", "TP53", "FAS", "BID"],
                },
                GeneSet {
                    name: "cell division",
                    genes: &["CDK1", "CDK2", "CCNB1", "CCND1", "CCNE1", "E2F1", "PLK1", "AURKA"],
                },
                GeneSet {
                    name: "MAPK cascade",
                    genes: &["MAPK1", "MAPK3", "MAP2K1", "MAP2K2", "RAF1", "BRAF", "DUSP1", "HRAS"],
                },
            ],
        }
    }
}

// =============================================================================
// Hypergeometric tail
// =============================================================================

/// Natural log of the gamma function (Lanczos approximation).
fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // Reflection formula
        return std::f64::consts::PI.ln()
            - (std::f64::consts::PI * x).sin().ln()
            - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut acc = COEFFS[0];
    for (i, c) in COEFFS.iter().enumerate().skip(1) {
        acc += c / (x + i as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

/// P(X >= k) for X ~ Hypergeometric(universe, set_size, draws).
pub fn hypergeometric_tail(universe: u64, set_size: u64, draws: u64, k: u64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    let upper = set_size.min(draws);
    let mut p = 0.0;
    for i in k..=upper {
        let ln_p = ln_choose(set_size, i) + ln_choose(universe - set_size, draws - i)
            - ln_choose(universe, draws);
        p += ln_p.exp();
    }
    p.min(1.0)
}

// =============================================================================
// run_enrichment
// =============================================================================

/// Auto-risk capability running ORA against a bundled gene-set source.
pub struct RunEnrichmentHandler {
    libraries: Vec<GeneSetLibrary>,
}

impl RunEnrichmentHandler {
    pub fn new() -> Self {
        Self {
            libraries: vec![
                GeneSetLibrary::reactome(),
                GeneSetLibrary::wikipathways(),
                GeneSetLibrary::go_bp(),
            ],
        }
    }

    fn resolve_source(&self, requested: &str) -> Option<&GeneSetLibrary> {
        let normalized = requested.to_lowercase();
        self.libraries
            .iter()
            .find(|lib| normalized.contains(lib.source))
            .or_else(|| self.libraries.first())
    }
}

impl Default for RunEnrichmentHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapabilityHandler for RunEnrichmentHandler {
    fn name(&self) -> &str {
        "run_enrichment"
    }

    fn label(&self) -> &str {
        "Enrichment Analysis"
    }

    fn description(&self) -> &str {
        "Run enrichment analysis (ORA) on a list of significant genes using local gene set sources."
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Auto
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "gene_list": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of gene symbols to analyze (e.g., ['CASP3', 'BAX', 'TP53'])"
                },
                "gene_sets": {
                    "type": "string",
                    "enum": ["reactome", "wikipathways", "go_bp"],
                    "description": "Gene set database to use",
                    "default": "reactome"
                }
            },
            "required": ["gene_list"]
        })
    }

    fn context_keys(&self) -> &[&str] {
        &["gene_list"]
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, HandlerError> {
        let genes: Vec<String> = arguments
            .get("gene_list")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if genes.is_empty() {
            return Err(HandlerError::InvalidArguments(
                "No genes provided for enrichment analysis".to_string(),
            ));
        }

        let requested = arguments
            .get("gene_sets")
            .and_then(Value::as_str)
            .unwrap_or("reactome");
        if requested.to_lowercase().contains("kegg") {
            return Err(HandlerError::Failed(
                "KEGG enrichment requires a custom GMT file (license).".to_string(),
            ));
        }
        // Unrecognized sources fall back to reactome
        let library = self
            .resolve_source(requested)
            .ok_or_else(|| HandlerError::Failed("No gene set libraries available".to_string()))?;

        let input: HashSet<&str> = genes.iter().map(String::as_str).collect();
        let draws = input.len() as u64;

        let mut terms: Vec<Value> = library
            .sets
            .iter()
            .filter_map(|set| {
                let overlap: Vec<&str> = set
                    .genes
                    .iter()
                    .copied()
                    .filter(|g| input.contains(g))
                    .collect();
                if overlap.is_empty() {
                    return None;
                }
                let p = hypergeometric_tail(
                    GENE_UNIVERSE,
                    set.genes.len() as u64,
                    draws,
                    overlap.len() as u64,
                );
                Some(serde_json::json!({
                    "term": set.name,
                    "p_value": p,
                    "overlap": overlap.len(),
                    "set_size": set.genes.len(),
                    "genes": overlap,
                }))
            })
            .collect();

        terms.sort_by(|a, b| {
            let pa = a["p_value"].as_f64().unwrap_or(1.0);
            let pb = b["p_value"].as_f64().unwrap_or(1.0);
            pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal)
        });
        let total = terms.len();
        terms.truncate(MAX_TERMS);

        tracing::info!(
            source = library.source,
            input_genes = genes.len(),
            terms = total,
            "Enrichment analysis complete"
        );

        Ok(serde_json::json!({
            "gene_sets": library.source,
            "input_genes": genes.len(),
            "enriched_terms": terms,
            "total_terms": total,
        }))
    }

    fn summarize(&self, result: &Value) -> String {
        let total = result["total_terms"].as_u64().unwrap_or(0);
        let top = result["enriched_terms"]
            .as_array()
            .and_then(|a| a.first())
            .and_then(|t| t["term"].as_str());
        match top {
            Some(term) => format!("Found {} enriched terms (top: {}).", total, term),
            None => "No enriched terms found.".to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
