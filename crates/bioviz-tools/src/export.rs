//! File export capability (confirm-risk).
//!
//! Writes the loaded differential expression rows to disk as CSV or JSON.
//! The rows arrive through ambient context when the model does not pass them
//! explicitly; the handler never runs without user confirmation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use bioviz_core::types::{ExpressionRecord, Timestamp};
use bioviz_gateway::{CapabilityHandler, HandlerError, RiskLevel};

/// Rows shown in the result preview.
const PREVIEW_ROWS: usize = 10;

/// Confirm-risk capability that exports analysis data to a file.
pub struct ExportDataHandler {
    export_dir: PathBuf,
}

impl ExportDataHandler {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    fn resolve_path(&self, output_path: Option<&str>, format: &str) -> PathBuf {
        match output_path {
            Some(raw) if !raw.trim().is_empty() => expand_home(raw),
            _ => self
                .export_dir
                .join(format!("bioviz_export_{}.{}", Timestamp::now().0, format)),
        }
    }
}

/// Expand a leading `~/` against the HOME directory.
fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(raw)
}

fn write_csv(path: &Path, rows: &[ExpressionRecord]) -> std::io::Result<()> {
    let mut out = String::from("Gene,Log2FC,PValue,Status\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{}\n",
            row.gene, row.log2fc, row.pvalue, row.status
        ));
    }
    std::fs::write(path, out)
}

fn preview(rows: &[ExpressionRecord]) -> String {
    let mut lines = vec!["gene,log2FoldChange,status".to_string()];
    for row in rows.iter().take(PREVIEW_ROWS) {
        lines.push(format!("{},{:.4},{}", row.gene, row.log2fc, row.status));
    }
    if rows.len() > PREVIEW_ROWS {
        lines.push(format!("... and {} more rows", rows.len() - PREVIEW_ROWS));
    }
    lines.join("\n")
}

#[async_trait]
impl CapabilityHandler for ExportDataHandler {
    fn name(&self) -> &str {
        "export_data"
    }

    fn label(&self) -> &str {
        "Export Data"
    }

    fn description(&self) -> &str {
        "Export analysis data to a file. REQUIRES USER CONFIRMATION."
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Confirm
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "output_path": {
                    "type": "string",
                    "description": "Path where the file will be saved"
                },
                "format": {
                    "type": "string",
                    "enum": ["csv", "xlsx", "json"],
                    "description": "Output file format",
                    "default": "csv"
                },
                "expression_rows": {
                    "type": "array",
                    "description": "Rows to export; filled from the loaded analysis when omitted"
                }
            },
            "required": []
        })
    }

    fn context_keys(&self) -> &[&str] {
        &["expression_rows"]
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, HandlerError> {
        let rows: Vec<ExpressionRecord> = match arguments.get("expression_rows") {
            Some(raw) if !raw.is_null() => serde_json::from_value(raw.clone()).map_err(|e| {
                HandlerError::InvalidArguments(format!("expression_rows is malformed: {}", e))
            })?,
            _ => Vec::new(),
        };
        if rows.is_empty() {
            return Err(HandlerError::Failed(
                "No data found to export. Please ensure an analysis is loaded.".to_string(),
            ));
        }

        let format = arguments
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("csv")
            .to_lowercase();
        let output_path = arguments.get("output_path").and_then(Value::as_str);
        let mut resolved = self.resolve_path(output_path, &format);

        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| HandlerError::Failed(format!("Failed to export data: {}", e)))?;
        }

        let written_format = match format.as_str() {
            "json" => {
                let body = serde_json::to_string_pretty(&rows)
                    .map_err(|e| HandlerError::Failed(e.to_string()))?;
                std::fs::write(&resolved, body)
                    .map_err(|e| HandlerError::Failed(format!("Failed to export data: {}", e)))?;
                "json"
            }
            "csv" => {
                write_csv(&resolved, &rows)
                    .map_err(|e| HandlerError::Failed(format!("Failed to export data: {}", e)))?;
                "csv"
            }
            // Unsupported formats fall back to CSV
            _ => {
                if resolved.extension().and_then(|e| e.to_str()) != Some("csv") {
                    resolved.set_extension("csv");
                }
                write_csv(&resolved, &rows)
                    .map_err(|e| HandlerError::Failed(format!("Failed to export data: {}", e)))?;
                "csv"
            }
        };

        tracing::info!(rows = rows.len(), path = %resolved.display(), "Exported analysis data");

        Ok(serde_json::json!({
            "output_path": resolved.to_string_lossy(),
            "format": written_format,
            "rows_written": rows.len(),
            "data_preview": preview(&rows),
            "message": format!("Data successfully saved to {}", resolved.display()),
        }))
    }

    fn confirm_reason(&self, arguments: &Value) -> String {
        match arguments.get("output_path").and_then(Value::as_str) {
            Some(path) if !path.trim().is_empty() => {
                format!("This will write data to: {}", path)
            }
            _ => format!(
                "This will write data to the default export directory: {}",
                self.export_dir.display()
            ),
        }
    }

    fn summarize(&self, result: &Value) -> String {
        format!(
            "Exported {} rows to {}.",
            result["rows_written"].as_u64().unwrap_or(0),
            result["output_path"].as_str().unwrap_or("unknown path"),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
