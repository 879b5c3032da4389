use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BiovizError, Result};

/// Top-level configuration for the BioViz backend.
///
/// Loaded from `~/.bioviz/config.toml` by default. Each section corresponds
/// to a bounded context or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiovizConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl BiovizConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BiovizConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| BiovizError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for exports and cached templates.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.bioviz/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Authorization gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Seconds a pending proposal stays confirmable before the expiry sweep
    /// removes it.
    pub proposal_ttl_seconds: u64,
    /// Interval between background expiry sweeps.
    pub sweep_interval_seconds: u64,
    /// Optional wall-clock limit for a single capability execution.
    /// `None` means handlers may block indefinitely.
    pub handler_timeout_seconds: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            proposal_ttl_seconds: 3600,
            sweep_interval_seconds: 300,
            handler_timeout_seconds: None,
        }
    }
}

/// Significance thresholds for differential expression analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// P-value below which a gene is considered significant.
    pub pvalue_threshold: f64,
    /// Absolute log2 fold change above which a gene is considered changed.
    pub logfc_threshold: f64,
    /// Directory used for exports when no explicit path is given.
    pub export_dir: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pvalue_threshold: 0.05,
            logfc_threshold: 1.0,
            export_dir: "~/BioViz_Exports".to_string(),
        }
    }
}
