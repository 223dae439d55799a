use std::sync::Arc;

use super::check::CheckGate;
use super::decision::{GateOutcome, TransitionOutcome};
use super::domain::{CheckRequest, TransitionRequest};
use super::legacy::{LegacyBackgroundCheckRequest, LegacyGateAdapter, LegacyStageTransitionRequest};
use super::policy::{PolicyRegistry, SharedPolicyRegistry};
use super::sink::{EvidenceSink, SinkError};
use super::transition::TransitionGate;

/// Hosts the gates over a reloadable registry and forwards evidence of
/// allowed transitions to the audit sink.
///
/// The gates do not serialize transitions for one application. Callers must
/// hold a per-application lock or optimistic version check around
/// `transition` and the write of the resulting state.
pub struct FairChanceGateService<S> {
    registry: SharedPolicyRegistry,
    sink: Arc<S>,
}

impl<S> FairChanceGateService<S>
where
    S: EvidenceSink + 'static,
{
    pub fn new(registry: SharedPolicyRegistry, sink: Arc<S>) -> Self {
        Self { registry, sink }
    }

    pub fn registry(&self) -> &SharedPolicyRegistry {
        &self.registry
    }

    pub fn reload(&self, registry: PolicyRegistry) {
        self.registry.replace(registry);
    }

    pub fn transition(
        &self,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, GateServiceError> {
        let outcome = TransitionGate::new(self.registry.snapshot()).gate(request);
        if let Some(evidence) = &outcome.evidence {
            self.sink.record(evidence.clone())?;
        }
        Ok(outcome)
    }

    pub fn check(&self, request: &CheckRequest) -> GateOutcome {
        CheckGate::new(self.registry.snapshot()).gate(request)
    }

    pub fn legacy_background_check(&self, request: &LegacyBackgroundCheckRequest) -> GateOutcome {
        LegacyGateAdapter::new(self.registry.snapshot()).gate_background_check(request)
    }

    pub fn legacy_stage_transition(&self, request: &LegacyStageTransitionRequest) -> GateOutcome {
        LegacyGateAdapter::new(self.registry.snapshot()).gate_stage_transition(request)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateServiceError {
    #[error(transparent)]
    Sink(#[from] SinkError),
}
