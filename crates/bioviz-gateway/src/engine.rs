//! Decision engine: classifies one inbound action request.
//!
//! The transition order is the safety contract of the whole gateway:
//! no-call and malformed input terminate as chat, unrecognized capabilities
//! are refused before any risk check, auto-risk runs through the dispatcher,
//! and confirm-risk is stored without ever touching the handler.

use std::sync::Arc;

use serde_json::Value;

use crate::dispatcher::Dispatcher;
use crate::proposal::ProposalStore;
use crate::registry::CapabilityRegistry;
use crate::types::{ActionRequest, AmbientContext, Decision, RiskLevel};

/// Longest slice of a bad argument payload echoed back to the user.
const ARGUMENT_FRAGMENT_CHARS: usize = 100;

/// Fallback reply when the model produced neither text nor a tool call.
const EMPTY_REPLY: &str = "I'm not sure how to help with that.";

/// Classifies inbound requests into chat, executed, or proposed decisions.
pub struct DecisionEngine {
    registry: Arc<CapabilityRegistry>,
    proposals: Arc<ProposalStore>,
    dispatcher: Dispatcher,
}

impl DecisionEngine {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        proposals: Arc<ProposalStore>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            registry,
            proposals,
            dispatcher,
        }
    }

    /// Decide what to do with one action request.
    ///
    /// Never returns an error and never panics on model-controlled input;
    /// every failure mode terminates as a `Chat` decision.
    pub async fn decide(&self, request: &ActionRequest, ambient: &AmbientContext) -> Decision {
        // No capability request: pure text reply.
        let Some(name) = request.capability_name.as_deref() else {
            let text = request
                .response_text
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| EMPTY_REPLY.to_string());
            return Decision::Chat { text };
        };

        // Untrusted payload: parse failures stop here, nothing throws past
        // this point.
        let arguments = match parse_arguments(&request.raw_arguments) {
            Ok(arguments) => arguments,
            Err(text) => {
                tracing::warn!(capability = name, "Rejected malformed tool arguments");
                return Decision::Chat { text };
            }
        };

        // A hallucinated capability is refused, never executed, never
        // proposed.
        let Some(handler) = self.registry.lookup(name) else {
            tracing::warn!(capability = name, "Refused unknown capability");
            return Decision::Chat {
                text: format!("Unknown capability requested: {}", name),
            };
        };

        match handler.risk_level() {
            RiskLevel::Auto => {
                match self
                    .dispatcher
                    .invoke(Arc::clone(&handler), arguments.clone(), ambient)
                    .await
                {
                    Ok(result) => {
                        let summary = handler.summarize(&result);
                        tracing::info!(capability = name, "Executed auto-risk capability");
                        Decision::Executed {
                            capability_name: name.to_string(),
                            arguments,
                            result,
                            summary,
                        }
                    }
                    Err(e) => Decision::Chat {
                        text: format!("Error executing {}: {}", name, e),
                    },
                }
            }
            RiskLevel::Confirm => {
                let reason = handler.confirm_reason(&arguments);
                let proposal_id = self.proposals.create(name, arguments.clone());
                tracing::info!(
                    capability = name,
                    proposal_id = %proposal_id,
                    "Deferred confirm-risk capability as proposal"
                );
                Decision::Proposed {
                    proposal_id,
                    capability_name: name.to_string(),
                    arguments,
                    reason,
                }
            }
        }
    }
}

/// Parse the raw argument payload into a JSON object.
///
/// An empty payload means "no arguments". On failure the returned message
/// cites a truncated fragment of the offending input.
fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err(format!(
            "Tool arguments must be a JSON object. Received: {}",
            fragment(raw)
        )),
        Err(e) => Err(format!(
            "Could not parse tool arguments ({}). Offending input: {}",
            e,
            fragment(raw)
        )),
    }
}

/// First `ARGUMENT_FRAGMENT_CHARS` characters of the payload, ellipsized.
fn fragment(raw: &str) -> String {
    if raw.chars().count() <= ARGUMENT_FRAGMENT_CHARS {
        raw.to_string()
    } else {
        let cut: String = raw.chars().take(ARGUMENT_FRAGMENT_CHARS).collect();
        format!("{}...", cut)
    }
}

// =============================================================================
// Tests
// =============================================================================
