//! Shared analysis thresholds and the `update_thresholds` capability.
//!
//! Thresholds are the one piece of analysis state the model is allowed to
//! change, and only through a confirmed proposal. The pathway handlers read
//! the same shared handle, so a confirmed update affects later renders.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use bioviz_core::config::AnalysisConfig;
use bioviz_gateway::{CapabilityHandler, HandlerError, RiskLevel};

/// Current significance thresholds.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisThresholds {
    pub pvalue: f64,
    pub logfc: f64,
}

impl AnalysisThresholds {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            pvalue: config.pvalue_threshold,
            logfc: config.logfc_threshold,
        }
    }
}

/// Handle shared between the threshold capability and every reader.
pub type SharedThresholds = Arc<Mutex<AnalysisThresholds>>;

pub fn shared_thresholds(config: &AnalysisConfig) -> SharedThresholds {
    Arc::new(Mutex::new(AnalysisThresholds::from_config(config)))
}

/// Read the current thresholds, recovering from a poisoned lock.
pub(crate) fn current(thresholds: &SharedThresholds) -> AnalysisThresholds {
    *thresholds.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Confirm-risk capability that updates the analysis thresholds.
pub struct UpdateThresholdsHandler {
    thresholds: SharedThresholds,
}

impl UpdateThresholdsHandler {
    pub fn new(thresholds: SharedThresholds) -> Self {
        Self { thresholds }
    }
}

#[async_trait]
impl CapabilityHandler for UpdateThresholdsHandler {
    fn name(&self) -> &str {
        "update_thresholds"
    }

    fn label(&self) -> &str {
        "Update Thresholds"
    }

    fn description(&self) -> &str {
        "Update analysis thresholds for significance (p-value) and effect size (log fold change). REQUIRES USER CONFIRMATION."
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Confirm
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pvalue_threshold": {
                    "type": "number",
                    "description": "New p-value threshold for significance (e.g., 0.05)"
                },
                "logfc_threshold": {
                    "type": "number",
                    "description": "New absolute log2 fold change threshold (e.g., 1.0)"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, HandlerError> {
        let pvalue = arguments.get("pvalue_threshold").and_then(Value::as_f64);
        let logfc = arguments.get("logfc_threshold").and_then(Value::as_f64);

        if let Some(p) = pvalue {
            if p.is_nan() || p <= 0.0 || p > 1.0 {
                return Err(HandlerError::InvalidArguments(format!(
                    "pvalue_threshold must be in (0, 1], got {}",
                    p
                )));
            }
        }
        if let Some(f) = logfc {
            if f.is_nan() || f < 0.0 {
                return Err(HandlerError::InvalidArguments(format!(
                    "logfc_threshold must be non-negative, got {}",
                    f
                )));
            }
        }

        let mut updated = Vec::new();
        let mut guard = self
            .thresholds
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(p) = pvalue {
            guard.pvalue = p;
            updated.push("pvalue_threshold");
        }
        if let Some(f) = logfc {
            guard.logfc = f;
            updated.push("logfc_threshold");
        }
        let now = *guard;
        drop(guard);

        tracing::info!(
            pvalue = now.pvalue,
            logfc = now.logfc,
            "Analysis thresholds updated"
        );

        Ok(serde_json::json!({
            "updated": updated,
            "pvalue_threshold": now.pvalue,
            "logfc_threshold": now.logfc,
        }))
    }

    fn confirm_reason(&self, _arguments: &Value) -> String {
        "This will modify your analysis thresholds, which may affect all visualizations."
            .to_string()
    }

    fn summarize(&self, result: &Value) -> String {
        let updated: Vec<&str> = result["updated"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if updated.is_empty() {
            "No thresholds were changed.".to_string()
        } else {
            format!("Updated {}.", updated.join(" and "))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
