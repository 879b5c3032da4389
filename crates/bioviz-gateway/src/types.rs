//! Core types and value objects for the authorization gateway.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Risk classification for registered capabilities.
///
/// `Auto` capabilities run as soon as the model requests them; `Confirm`
/// capabilities are deferred as proposals until a user approves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Auto,
    Confirm,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Auto => write!(f, "auto"),
            RiskLevel::Confirm => write!(f, "confirm"),
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(RiskLevel::Auto),
            "confirm" => Ok(RiskLevel::Confirm),
            _ => Err(format!("Unknown risk level: {}", s)),
        }
    }
}

// =============================================================================
// Requests and decisions
// =============================================================================

/// One inbound action request, as produced by the model-client collaborator.
///
/// `capability_name` may name anything, including capabilities that were
/// never registered; `raw_arguments` is an opaque payload that may not even
/// be valid JSON. The gateway assumes nothing about either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Free text the model produced alongside (or instead of) a tool call.
    pub response_text: Option<String>,
    /// Requested capability, if the model asked for one.
    pub capability_name: Option<String>,
    /// Serialized argument payload, untrusted.
    pub raw_arguments: String,
}

impl ActionRequest {
    /// A plain text reply with no capability request.
    pub fn chat(text: impl Into<String>) -> Self {
        Self {
            response_text: Some(text.into()),
            capability_name: None,
            raw_arguments: String::new(),
        }
    }

    /// A capability call with a raw argument payload.
    pub fn call(name: impl Into<String>, raw_arguments: impl Into<String>) -> Self {
        Self {
            response_text: None,
            capability_name: Some(name.into()),
            raw_arguments: raw_arguments.into(),
        }
    }
}

/// The gateway's classified output for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    /// Plain text response; no capability was invoked.
    Chat { text: String },
    /// An auto-risk capability ran synchronously.
    Executed {
        capability_name: String,
        arguments: Value,
        result: Value,
        summary: String,
    },
    /// A confirm-risk capability was deferred for user approval.
    Proposed {
        proposal_id: Uuid,
        capability_name: String,
        arguments: Value,
        reason: String,
    },
}

impl Decision {
    pub fn chat(text: impl Into<String>) -> Self {
        Decision::Chat { text: text.into() }
    }
}

// =============================================================================
// Ambient context
// =============================================================================

/// Host-supplied state available for optional parameter injection.
///
/// Values here fill in parameters the caller left blank; they never override
/// an explicitly supplied argument.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmbientContext {
    values: serde_json::Map<String, Value>,
}

impl AmbientContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Capability descriptors
// =============================================================================

/// Exportable description of one registered capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the accepted arguments.
    pub parameters: Value,
}

impl CapabilityDescriptor {
    /// Convert to the function-calling schema shape model clients expect.
    pub fn to_function_schema(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
