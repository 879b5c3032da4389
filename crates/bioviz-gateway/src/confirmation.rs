//! Confirmation flow for deferred proposals.
//!
//! Resolves a stored proposal to execution or cancellation. The proposal is
//! removed from the store before anything else happens, so a given id can be
//! resolved at most once no matter how confirm, reject, and the expiry sweep
//! race each other.

use std::sync::Arc;

use uuid::Uuid;

use crate::dispatcher::Dispatcher;
use crate::proposal::ProposalStore;
use crate::registry::CapabilityRegistry;
use crate::types::{AmbientContext, Decision};

/// Entry points for resolving proposals issued by the decision engine.
pub struct ConfirmationFlow {
    registry: Arc<CapabilityRegistry>,
    proposals: Arc<ProposalStore>,
    dispatcher: Dispatcher,
}

impl ConfirmationFlow {
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

    /// Execute a previously proposed action after user confirmation.
    pub async fn confirm(&self, proposal_id: Uuid, ambient: &AmbientContext) -> Decision {
        // Remove first: whoever gets the proposal owns its one execution.
        let Some(proposal) = self.proposals.remove(proposal_id) else {
            return Decision::chat(format!("Proposal {} not found or expired.", proposal_id));
        };

        let Some(handler) = self.registry.lookup(&proposal.capability_name) else {
            tracing::error!(
                capability = %proposal.capability_name,
                "Confirmed proposal names a capability that is no longer registered"
            );
            return Decision::chat(format!(
                "Capability {} is no longer registered.",
                proposal.capability_name
            ));
        };

        match self
            .dispatcher
            .invoke(Arc::clone(&handler), proposal.arguments.clone(), ambient)
            .await
        {
            Ok(result) => {
                let summary = handler.summarize(&result);
                tracing::info!(
                    capability = %proposal.capability_name,
                    proposal_id = %proposal_id,
                    "Executed confirmed proposal"
                );
                Decision::Executed {
                    capability_name: proposal.capability_name,
                    arguments: proposal.arguments,
                    result,
                    summary,
                }
            }
            Err(e) => Decision::chat(format!("Error executing confirmed proposal: {}", e)),
        }
    }

    /// Cancel a proposal without ever invoking its handler.
    pub fn reject(&self, proposal_id: Uuid) -> Decision {
        match self.proposals.remove(proposal_id) {
            Some(proposal) => {
                let label = self
                    .registry
                    .lookup(&proposal.capability_name)
                    .map(|h| h.label().to_string())
                    .unwrap_or(proposal.capability_name);
                tracing::info!(proposal_id = %proposal_id, "Rejected proposal");
                Decision::chat(format!("Action cancelled: {}", label))
            }
            None => Decision::chat(format!("Proposal {} not found.", proposal_id)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::registry::CapabilityHandler;
    use crate::types::RiskLevel;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ExportCapability {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl CapabilityHandler for ExportCapability {
        fn name(&self) -> &str {
            "export_data"
        }
        fn label(&self) -> &str {
            "Export Data"
        }
        fn description(&self) -> &str {
            "Export analysis data to a file"
        }
        fn risk_level(&self) -> RiskLevel {
            RiskLevel::Confirm
        }
        fn parameters(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {"output_path": {"type": "string"}}})
        }
        async fn execute(&self, arguments: &Value) -> Result<Value, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HandlerError::Failed("disk full".to_string()));
            }
            Ok(serde_json::json!({"written": arguments["output_path"].clone()}))
        }
    }

    fn flow_with(fail: bool) -> (ConfirmationFlow, Arc<AtomicUsize>, Arc<ProposalStore>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CapabilityRegistry::new();
        registry
            .register(Arc::new(ExportCapability {
                calls: Arc::clone(&calls),
                fail,
            }))
            .unwrap();
        let proposals = Arc::new(ProposalStore::new());
        let flow = ConfirmationFlow::new(
            Arc::new(registry),
            Arc::clone(&proposals),
            Dispatcher::new(None),
        );
        (flow, calls, proposals)
    }

    #[tokio::test]
    async fn test_confirm_executes_once_then_not_found() {
        let (flow, calls, proposals) = flow_with(false);
        let id = proposals.create("export_data", serde_json::json!({"output_path": "/tmp/x.csv"}));

        let decision = flow.confirm(id, &AmbientContext::new()).await;
        match decision {
            Decision::Executed { result, .. } => assert_eq!(result["written"], "/tmp/x.csv"),
            other => panic!("Expected Executed, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Second confirmation attempt: the id is gone
        let decision = flow.confirm(id, &AmbientContext::new()).await;
        assert!(matches!(decision, Decision::Chat { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // As is rejecting after confirming
        let decision = flow.reject(id);
        match decision {
            Decision::Chat { text } => assert!(text.contains("not found")),
            other => panic!("Expected Chat, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_confirm_unknown_id() {
        let (flow, calls, _) = flow_with(false);
        let decision = flow.confirm(Uuid::new_v4(), &AmbientContext::new()).await;
        match decision {
            Decision::Chat { text } => assert!(text.contains("not found or expired")),
            other => panic!("Expected Chat, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_confirm_failure_still_consumes_proposal() {
        let (flow, calls, proposals) = flow_with(true);
        let id = proposals.create("export_data", serde_json::json!({"output_path": "/tmp/x.csv"}));

        let decision = flow.confirm(id, &AmbientContext::new()).await;
        match decision {
            Decision::Chat { text } => {
                assert!(text.contains("Error executing confirmed proposal"));
                assert!(text.contains("disk full"));
            }
            other => panic!("Expected Chat, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A failed execution does not leave the proposal confirmable again
        let decision = flow.confirm(id, &AmbientContext::new()).await;
        assert!(matches!(decision, Decision::Chat { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_confirm_unregistered_capability() {
        let (flow, _, proposals) = flow_with(false);
        let id = proposals.create("vanished_tool", serde_json::json!({}));

        let decision = flow.confirm(id, &AmbientContext::new()).await;
        match decision {
            Decision::Chat { text } => assert!(text.contains("no longer registered")),
            other => panic!("Expected Chat, got {:?}", other),
        }
        // Consumed either way
        assert_eq!(proposals.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_reject_never_invokes_handler() {
        let (flow, calls, proposals) = flow_with(false);
        let id = proposals.create("export_data", serde_json::json!({}));

        let decision = flow.reject(id);
        match decision {
            Decision::Chat { text } => assert_eq!(text, "Action cancelled: Export Data"),
            other => panic!("Expected Chat, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(proposals.get(id).is_none());
    }

    #[tokio::test]
    async fn test_reject_unknown_id() {
        let (flow, _, _) = flow_with(false);
        let decision = flow.reject(Uuid::new_v4());
        match decision {
            Decision::Chat { text } => assert!(text.contains("not found")),
            other => panic!("Expected Chat, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reject_then_confirm_not_found() {
        let (flow, calls, proposals) = flow_with(false);
        let id = proposals.create("export_data", serde_json::json!({}));

        assert!(matches!(flow.reject(id), Decision::Chat { .. }));
        let decision = flow.confirm(id, &AmbientContext::new()).await;
        match decision {
            Decision::Chat { text } => assert!(text.contains("not found or expired")),
            other => panic!("Expected Chat, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_confirms_single_execution() {
        let (flow, calls, proposals) = flow_with(false);
        let flow = Arc::new(flow);
        let id = proposals.create("export_data", serde_json::json!({"output_path": "/tmp/x.csv"}));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flow = Arc::clone(&flow);
            handles.push(tokio::spawn(async move {
                flow.confirm(id, &AmbientContext::new()).await
            }));
        }

        let mut executed = 0;
        for h in handles {
            if matches!(h.await.unwrap(), Decision::Executed { .. }) {
                executed += 1;
            }
        }
        assert_eq!(executed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_confirm_vs_reject_race_single_winner() {
        let (flow, calls, proposals) = flow_with(false);
        let flow = Arc::new(flow);

        for _ in 0..20 {
            let id = proposals.create("export_data", serde_json::json!({}));
            let confirmer = Arc::clone(&flow);
            let rejecter = Arc::clone(&flow);

            let confirm_task =
                tokio::spawn(async move { confirmer.confirm(id, &AmbientContext::new()).await });
            let reject_task = tokio::spawn(async move { rejecter.reject(id) });

            let confirmed = matches!(confirm_task.await.unwrap(), Decision::Executed { .. });
            let rejected = matches!(
                reject_task.await.unwrap(),
                Decision::Chat { text } if text.starts_with("Action cancelled")
            );
            // Exactly one side resolves the proposal
            assert!(confirmed ^ rejected);
        }
        // Handler ran only for the confirms that won their race
        assert!(calls.load(Ordering::SeqCst) <= 20);
        assert_eq!(proposals.pending_count(), 0);
    }
}
