//! Authorization gateway ("Logic Lock") for the BioViz copilot.
//!
//! Sits between free-form model output and real side effects: classifies each
//! requested capability call, runs the safe ones, defers the risky ones as
//! proposals awaiting user confirmation, and refuses everything it does not
//! recognize.

pub mod adapter;
pub mod confirmation;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod proposal;
pub mod registry;
pub mod types;

pub use adapter::ModelReply;
pub use confirmation::ConfirmationFlow;
pub use dispatcher::Dispatcher;
pub use engine::DecisionEngine;
pub use error::{DispatchError, HandlerError, RegistryError};
pub use gateway::Gateway;
pub use proposal::{ExpirySweeper, Proposal, ProposalStore};
pub use registry::{CapabilityHandler, CapabilityRegistry};
pub use types::{ActionRequest, AmbientContext, CapabilityDescriptor, Decision, RiskLevel};
