//! Stage-named entry points kept for callers that predate the workflow-state
//! API. Both delegate to the modern gates' rule table and only translate
//! vocabulary and violation codes at the boundary.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::check::CheckGate;
use super::decision::{
    Decision, DecisionMetadata, DecisionSubject, GateOutcome, ViolationCode,
    CHECK_FCHA_STAGE_ORDER,
};
use super::domain::{ApplicationId, CheckRequest, CheckType, MarketId, WorkflowState};
use super::policy::{Edge, PolicyRegistry};
use super::transition::{blocked_reason, edge_violation};

const LEGACY_ACTOR: &str = "legacy-gate-adapter";

/// Stage vocabulary used by earlier callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyStage {
    ApplicationReview,
    ConditionalOffer,
    BackgroundCheck,
    IndividualizedAssessment,
    Approved,
    Denied,
}

impl LegacyStage {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::ApplicationReview,
            Self::ConditionalOffer,
            Self::BackgroundCheck,
            Self::IndividualizedAssessment,
            Self::Approved,
            Self::Denied,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ApplicationReview => "application_review",
            Self::ConditionalOffer => "conditional_offer",
            Self::BackgroundCheck => "background_check",
            Self::IndividualizedAssessment => "individualized_assessment",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }

    pub const fn workflow_state(self) -> WorkflowState {
        match self {
            Self::ApplicationReview => WorkflowState::Prequalification,
            Self::ConditionalOffer => WorkflowState::ConditionalOffer,
            Self::BackgroundCheck => WorkflowState::BackgroundCheckAllowed,
            Self::IndividualizedAssessment => WorkflowState::IndividualizedAssessment,
            Self::Approved => WorkflowState::Approved,
            Self::Denied => WorkflowState::Denied,
        }
    }
}

impl fmt::Display for LegacyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown legacy stage '{0}'")]
pub struct UnknownLegacyStage(pub String);

impl FromStr for LegacyStage {
    type Err = UnknownLegacyStage;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|stage| stage.label() == normalized)
            .ok_or_else(|| UnknownLegacyStage(raw.to_string()))
    }
}

/// Code the legacy surface reports for a modern violation.
pub const fn legacy_code(code: ViolationCode) -> ViolationCode {
    match code {
        ViolationCode::FchaBackgroundCheckNotAllowed => ViolationCode::FchaCriminalCheckBeforeOffer,
        ViolationCode::FchaInvalidStateTransition => ViolationCode::FchaStageOrderViolation,
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBackgroundCheckRequest {
    pub application_id: ApplicationId,
    pub market_id: MarketId,
    pub current_stage: LegacyStage,
    pub check_type: CheckType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyStageTransitionRequest {
    pub application_id: ApplicationId,
    pub market_id: MarketId,
    pub current_stage: LegacyStage,
    pub target_stage: LegacyStage,
}

#[derive(Debug, Clone)]
pub struct LegacyGateAdapter {
    registry: Arc<PolicyRegistry>,
}

impl LegacyGateAdapter {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    pub fn gate_background_check(&self, request: &LegacyBackgroundCheckRequest) -> GateOutcome {
        self.gate_background_check_at(request, Utc::now())
    }

    pub fn gate_background_check_at(
        &self,
        request: &LegacyBackgroundCheckRequest,
        now: DateTime<Utc>,
    ) -> GateOutcome {
        let modern = CheckRequest {
            application_id: request.application_id.clone(),
            market_id: request.market_id.clone(),
            current_state: request.current_stage.workflow_state(),
            check_type: request.check_type,
            actor_id: LEGACY_ACTOR.to_string(),
        };
        let profile = self.registry.lookup(&request.market_id);
        let mut outcome = CheckGate::gate_with_profile(&profile, &modern, now);
        if outcome.allowed {
            return outcome;
        }

        let statute = &profile.citation.statute;
        outcome.decision.violations = std::mem::take(&mut outcome.decision.violations)
            .into_iter()
            .map(|violation| {
                let code = legacy_code(violation.code);
                violation
                    .with_evidence("currentStage", request.current_stage.label())
                    .recoded(code, statute)
            })
            .collect();
        outcome.blocked_reason = Some(format!(
            "{} not permitted at stage {}",
            request.check_type, request.current_stage
        ));
        outcome
    }

    pub fn gate_stage_transition(&self, request: &LegacyStageTransitionRequest) -> GateOutcome {
        self.gate_stage_transition_at(request, Utc::now())
    }

    pub fn gate_stage_transition_at(
        &self,
        request: &LegacyStageTransitionRequest,
        now: DateTime<Utc>,
    ) -> GateOutcome {
        let profile = self.registry.lookup(&request.market_id);
        let edge = Edge::new(
            request.current_stage.workflow_state(),
            request.target_stage.workflow_state(),
        );
        let metadata = DecisionMetadata {
            application_id: request.application_id.clone(),
            subject: DecisionSubject::Transition {
                from_state: edge.from,
                to_state: edge.to,
            },
            fcha_enforced: profile.requires_gate,
        };
        let checks = vec![CHECK_FCHA_STAGE_ORDER.to_string()];

        let violation = if profile.requires_gate {
            edge_violation(&profile, edge)
        } else {
            None
        };

        match violation {
            None => GateOutcome {
                allowed: true,
                decision: Decision::new(&profile, metadata, checks, Vec::new(), now),
                blocked_reason: None,
            },
            Some(violation) => {
                let code = legacy_code(violation.code);
                let violation = violation
                    .with_evidence("currentStage", request.current_stage.label())
                    .with_evidence("targetStage", request.target_stage.label())
                    .recoded(code, &profile.citation.statute);
                info!(
                    application_id = %request.application_id,
                    market_id = %request.market_id,
                    current_stage = %request.current_stage,
                    target_stage = %request.target_stage,
                    violation_code = %code,
                    "legacy stage transition blocked"
                );
                GateOutcome {
                    allowed: false,
                    decision: Decision::new(&profile, metadata, checks, vec![violation], now),
                    blocked_reason: Some(blocked_reason(edge, code)),
                }
            }
        }
    }
}
