//! Time-bounded holding area for deferred capability calls.
//!
//! Confirm-risk requests are parked here until a user confirms or rejects
//! them, or the expiry sweep removes them. This map is the only shared
//! mutable state in the gateway; every operation runs under one mutex, and
//! removal is the single point that decides which caller wins a race.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;
use uuid::Uuid;

use bioviz_core::types::Timestamp;

/// A deferred, confirmable record of a requested capability invocation.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: Uuid,
    pub capability_name: String,
    pub arguments: Value,
    pub created_at: Timestamp,
}

/// Concurrent store of proposals awaiting confirmation.
///
/// Owned by the gateway and shared by reference with the decision engine,
/// the confirmation flow, and the sweeper. Proposals do not survive process
/// restarts.
#[derive(Default)]
pub struct ProposalStore {
    pending: Mutex<HashMap<Uuid, Proposal>>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new proposal and return its fresh id.
    pub fn create(&self, capability_name: impl Into<String>, arguments: Value) -> Uuid {
        let proposal = Proposal {
            id: Uuid::new_v4(),
            capability_name: capability_name.into(),
            arguments,
            created_at: Timestamp::now(),
        };
        let id = proposal.id;
        self.lock().insert(id, proposal);
        id
    }

    /// Look up a proposal without consuming it.
    pub fn get(&self, id: Uuid) -> Option<Proposal> {
        self.lock().get(&id).cloned()
    }

    /// Atomically remove and return a proposal.
    ///
    /// When two callers race on the same id, exactly one gets the proposal;
    /// the other observes `None`.
    pub fn remove(&self, id: Uuid) -> Option<Proposal> {
        self.lock().remove(&id)
    }

    /// Remove every proposal older than `max_age_seconds`. Returns the count
    /// removed.
    pub fn sweep_expired(&self, max_age_seconds: u64) -> usize {
        let mut pending = self.lock();
        let before = pending.len();
        pending.retain(|_, p| p.created_at.age_seconds() <= max_age_seconds as i64);
        let removed = before - pending.len();
        if removed > 0 {
            tracing::info!(removed, "Swept expired proposals");
        }
        removed
    }

    /// Number of proposals currently awaiting confirmation.
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// A panic while holding this lock leaves valid data behind (no
    /// multi-step updates), so poisoning is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Proposal>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Background loop that periodically sweeps expired proposals.
pub struct ExpirySweeper {
    store: Arc<ProposalStore>,
    ttl_seconds: u64,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<ProposalStore>, ttl_seconds: u64, interval_seconds: u64) -> Self {
        Self {
            store,
            ttl_seconds,
            interval: Duration::from_secs(interval_seconds.max(1)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run the sweep loop. Returns on shutdown signal.
    pub async fn run(&self) {
        tracing::info!(
            ttl_seconds = self.ttl_seconds,
            interval_seconds = self.interval.as_secs(),
            "Proposal expiry sweeper started"
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.store.sweep_expired(self.ttl_seconds);
                }
                _ = self.shutdown.notified() => return,
            }
        }
    }

    /// Signal the sweeper to shut down gracefully.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

// =============================================================================
// Tests
// =============================================================================
