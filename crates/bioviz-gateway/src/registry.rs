//! Capability handler trait and the startup-built registry.
//!
//! Each callable operation is a tagged record: name, risk level, parameter
//! schema, declared ambient-context keys, and the handler itself. Dispatch is
//! a table lookup by name; there is no reflection anywhere.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{HandlerError, RegistryError};
use crate::types::{CapabilityDescriptor, RiskLevel};

/// A named, schema-described operation the gateway can authorize.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    /// Unique registry key. Lookup is case-sensitive exact match.
    fn name(&self) -> &str;

    /// Short human-readable label used in summaries and cancellations.
    fn label(&self) -> &str;

    /// Description handed to the model collaborator.
    fn description(&self) -> &str;

    fn risk_level(&self) -> RiskLevel;

    /// JSON Schema describing the accepted arguments.
    fn parameters(&self) -> Value;

    /// Ambient-context keys this capability accepts as backfill for blank
    /// parameters. Every key must name a property in [`Self::parameters`];
    /// this is validated at registration.
    fn context_keys(&self) -> &[&str] {
        &[]
    }

    /// Execute with validated arguments. Handlers report failure through the
    /// returned error, not by panicking; a panic is still contained at the
    /// dispatch boundary.
    async fn execute(&self, arguments: &Value) -> Result<Value, HandlerError>;

    /// Why this capability needs confirmation, phrased for the user.
    fn confirm_reason(&self, _arguments: &Value) -> String {
        "This action may modify your data or settings.".to_string()
    }

    /// One-line summary of a successful result.
    fn summarize(&self, _result: &Value) -> String {
        format!("Executed {}.", self.label())
    }
}

/// Static catalog of callable operations, built once at startup.
///
/// Mutation happens only through `register` before the registry is shared;
/// all read paths take `&self` and never block.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: HashMap<String, Arc<dyn CapabilityHandler>>,
    /// Names in registration order, for stable schema export.
    order: Vec<String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability. Fails on a duplicate name or a declared
    /// context key that the parameter schema does not mention.
    pub fn register(&mut self, handler: Arc<dyn CapabilityHandler>) -> Result<(), RegistryError> {
        let name = handler.name().to_string();
        if self.entries.contains_key(&name) {
            return Err(RegistryError::DuplicateCapability(name));
        }

        let schema = handler.parameters();
        for key in handler.context_keys() {
            let declared = schema
                .get("properties")
                .and_then(|p| p.get(*key))
                .is_some();
            if !declared {
                return Err(RegistryError::UndeclaredContextKey {
                    capability: name,
                    key: (*key).to_string(),
                });
            }
        }

        tracing::debug!(capability = %name, risk = %handler.risk_level(), "Registered capability");
        self.order.push(name.clone());
        self.entries.insert(name, handler);
        Ok(())
    }

    /// Look up a capability by exact name.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn CapabilityHandler>> {
        self.entries.get(name).cloned()
    }

    /// Names of all capabilities at the given risk level, in registration order.
    pub fn list_by_risk(&self, level: RiskLevel) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| self.entries[*name].risk_level() == level)
            .cloned()
            .collect()
    }

    /// All capability names in registration order.
    pub fn list_all(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Descriptors in registration order, stable across calls.
    pub fn descriptors(&self) -> Vec<CapabilityDescriptor> {
        self.order
            .iter()
            .map(|name| {
                let handler = &self.entries[name];
                CapabilityDescriptor {
                    name: name.clone(),
                    description: handler.description().to_string(),
                    parameters: handler.parameters(),
                }
            })
            .collect()
    }

    /// Function-calling schemas for the model collaborator.
    pub fn export_schemas(&self) -> Vec<Value> {
        self.descriptors()
            .iter()
            .map(CapabilityDescriptor::to_function_schema)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
