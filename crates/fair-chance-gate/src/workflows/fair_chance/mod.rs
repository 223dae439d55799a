//! Fair chance housing compliance gates.
//!
//! Every gate is a pure function of its request and an immutable
//! [`MarketPolicyProfile`]: no I/O, no locks, no shared mutable state, so the
//! gates can be called concurrently from any thread. Declined requests are
//! returned as values with `allowed == false`; they are never errors.
//!
//! The gates do **not** stop two concurrent transition requests for the same
//! application from racing to different targets. Serialize transitions per
//! application (e.g. an optimistic version check on the stored record) before
//! calling a gate and before persisting its result.

mod check;
pub mod decision;
pub mod domain;
mod legacy;
pub mod policy;
pub mod router;
pub mod service;
pub mod sink;
mod transition;

#[cfg(test)]
mod tests;

pub use check::CheckGate;
pub use decision::{
    Decision, DecisionMetadata, DecisionSubject, EvidenceRecord, GateOutcome, ResponseWindow,
    TransitionOutcome, Violation, ViolationCode,
};
pub use domain::{
    ActorType, AdverseInfoDetails, ApplicationId, Article23AFactor, BackgroundCheckAuthorization,
    CheckRequest, CheckType, ConditionalOfferDetails, FinalDecision, FinalDecisionKind, MarketId,
    PrequalificationResults, TransitionPayload, TransitionRequest, UnknownCheckType,
    UnknownWorkflowState, WorkflowState,
};
pub use legacy::{
    legacy_code, LegacyBackgroundCheckRequest, LegacyGateAdapter, LegacyStage,
    LegacyStageTransitionRequest, UnknownLegacyStage,
};
pub use policy::{
    nyc_fcha_profile, unenforced_profile, CheckClassification, Edge, MarketPolicyProfile,
    NoticeConfig, NoticeKind, PolicyLoadError, PolicyPackFile, PolicyRegistry,
    PolicyRegistryBuilder, Prerequisite, RuleCitation, SharedPolicyRegistry, UnknownMarketPolicy,
};
pub use router::gate_router;
pub use service::{FairChanceGateService, GateServiceError};
pub use sink::{EvidenceSink, InMemoryEvidenceSink, SinkError, TracingEvidenceSink, AUDIT_TARGET};
pub use transition::TransitionGate;
