//! Domain types shared across the BioViz workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Timestamp
// =============================================================================

/// Unix epoch seconds.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }

    /// Seconds elapsed since this timestamp (clamped to zero for the future).
    pub fn age_seconds(&self) -> i64 {
        (Timestamp::now().0 - self.0).max(0)
    }
}

// =============================================================================
// Expression data
// =============================================================================

/// Significance call for one gene in a differential expression analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionStatus {
    Up,
    Down,
    NotSignificant,
}

impl fmt::Display for ExpressionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionStatus::Up => write!(f, "up"),
            ExpressionStatus::Down => write!(f, "down"),
            ExpressionStatus::NotSignificant => write!(f, "not_significant"),
        }
    }
}

impl std::str::FromStr for ExpressionStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "up" => Ok(ExpressionStatus::Up),
            "down" => Ok(ExpressionStatus::Down),
            "not_significant" => Ok(ExpressionStatus::NotSignificant),
            _ => Err(format!("Unknown expression status: {}", s)),
        }
    }
}

/// One row of a differential expression result table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionRecord {
    pub gene: String,
    pub log2fc: f64,
    pub pvalue: f64,
    pub status: ExpressionStatus,
}

/// Classify a gene against significance thresholds.
pub fn classify_expression(log2fc: f64, pvalue: f64, pvalue_threshold: f64, logfc_threshold: f64) -> ExpressionStatus {
    if pvalue < pvalue_threshold && log2fc.abs() > logfc_threshold {
        if log2fc > 0.0 {
            ExpressionStatus::Up
        } else {
            ExpressionStatus::Down
        }
    } else {
        ExpressionStatus::NotSignificant
    }
}

// =============================================================================
// Tests
// =============================================================================
