//! Assembled gateway instance.
//!
//! Owns the proposal store and wires the decision engine and confirmation
//! flow around a registry built at startup. Created once by the host and
//! dropped at shutdown; there is no ambient global state.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use bioviz_core::config::GatewayConfig;

use crate::confirmation::ConfirmationFlow;
use crate::dispatcher::Dispatcher;
use crate::engine::DecisionEngine;
use crate::proposal::{ExpirySweeper, ProposalStore};
use crate::registry::CapabilityRegistry;
use crate::types::{ActionRequest, AmbientContext, Decision, RiskLevel};

/// The authorization gateway between model output and real side effects.
pub struct Gateway {
    registry: Arc<CapabilityRegistry>,
    proposals: Arc<ProposalStore>,
    engine: DecisionEngine,
    confirmation: ConfirmationFlow,
    config: GatewayConfig,
}

impl Gateway {
    /// Build a gateway from a fully registered capability set.
    pub fn new(registry: CapabilityRegistry, config: GatewayConfig) -> Self {
        let registry = Arc::new(registry);
        let proposals = Arc::new(ProposalStore::new());
        let dispatcher = Dispatcher::new(config.handler_timeout_seconds.map(Duration::from_secs));

        let engine = DecisionEngine::new(
            Arc::clone(&registry),
            Arc::clone(&proposals),
            dispatcher.clone(),
        );
        let confirmation = ConfirmationFlow::new(
            Arc::clone(&registry),
            Arc::clone(&proposals),
            dispatcher,
        );

        tracing::info!(
            capabilities = registry.len(),
            proposal_ttl_seconds = config.proposal_ttl_seconds,
            "Gateway initialized"
        );

        Self {
            registry,
            proposals,
            engine,
            confirmation,
            config,
        }
    }

    /// Classify one inbound action request.
    pub async fn decide(&self, request: &ActionRequest, ambient: &AmbientContext) -> Decision {
        self.engine.decide(request, ambient).await
    }

    /// Execute a stored proposal after user confirmation.
    pub async fn confirm(&self, proposal_id: Uuid, ambient: &AmbientContext) -> Decision {
        self.confirmation.confirm(proposal_id, ambient).await
    }

    /// Cancel a stored proposal without executing it.
    pub fn reject(&self, proposal_id: Uuid) -> Decision {
        self.confirmation.reject(proposal_id)
    }

    /// Capability names, optionally filtered by risk level, in registration
    /// order.
    pub fn list_capabilities(&self, risk: Option<RiskLevel>) -> Vec<String> {
        match risk {
            Some(level) => self.registry.list_by_risk(level),
            None => self.registry.list_all(),
        }
    }

    /// Function-calling schemas for the model collaborator.
    pub fn export_schemas(&self) -> Vec<Value> {
        self.registry.export_schemas()
    }

    /// Remove proposals older than the configured TTL. Returns the count
    /// removed. Also usable lazily by hosts that skip the background sweeper.
    pub fn sweep_expired(&self) -> usize {
        self.proposals.sweep_expired(self.config.proposal_ttl_seconds)
    }

    /// Number of proposals currently awaiting confirmation.
    pub fn pending_proposals(&self) -> usize {
        self.proposals.pending_count()
    }

    /// Build the background expiry sweeper for this gateway's store.
    pub fn sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(
            Arc::clone(&self.proposals),
            self.config.proposal_ttl_seconds,
            self.config.sweep_interval_seconds,
        )
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }
}

// =============================================================================
// Tests
// =============================================================================
