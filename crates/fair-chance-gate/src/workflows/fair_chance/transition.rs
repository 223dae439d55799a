use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::decision::{
    Decision, DecisionMetadata, DecisionSubject, EvidenceRecord, ResponseWindow,
    TransitionOutcome, Violation, ViolationCode, CHECK_FCHA_WORKFLOW,
};
use super::domain::{TransitionRequest, WorkflowState};
use super::policy::{Edge, MarketPolicyProfile, PolicyRegistry};

/// Validates lifecycle transitions against the market's transition graph and
/// the prerequisite attached to each edge.
#[derive(Debug, Clone)]
pub struct TransitionGate {
    registry: Arc<PolicyRegistry>,
}

impl TransitionGate {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    pub fn gate(&self, request: &TransitionRequest) -> TransitionOutcome {
        self.gate_at(request, Utc::now())
    }

    /// Evaluate with an explicit clock reading for `checkedAt` and the evidence
    /// timestamp.
    pub fn gate_at(&self, request: &TransitionRequest, now: DateTime<Utc>) -> TransitionOutcome {
        let profile = self.registry.lookup(&request.market_id);
        let edge = Edge::new(request.current_state, request.target_state);
        let metadata = DecisionMetadata {
            application_id: request.application_id.clone(),
            subject: DecisionSubject::Transition {
                from_state: edge.from,
                to_state: edge.to,
            },
            fcha_enforced: profile.requires_gate,
        };
        let checks = vec![CHECK_FCHA_WORKFLOW.to_string()];

        if !profile.requires_gate {
            debug!(
                application_id = %request.application_id,
                market_id = %request.market_id,
                %edge,
                "fair chance workflow not enforced for market"
            );
            return TransitionOutcome {
                allowed: true,
                decision: Decision::new(&profile, metadata, checks, Vec::new(), now),
                evidence: None,
                blocked_reason: None,
            };
        }

        let violation = match edge_violation(&profile, edge) {
            Some(violation) => Some(violation),
            None => profile
                .prerequisite_for(edge)
                .and_then(|prerequisite| {
                    prerequisite
                        .evaluate(edge, &request.payload, &profile)
                        .err()
                }),
        };

        if let Some(violation) = violation {
            let blocked_reason = blocked_reason(edge, violation.code);
            info!(
                application_id = %request.application_id,
                market_id = %request.market_id,
                %edge,
                violation_code = %violation.code,
                "transition blocked"
            );
            return TransitionOutcome {
                allowed: false,
                decision: Decision::new(&profile, metadata, checks, vec![violation], now),
                evidence: None,
                blocked_reason: Some(blocked_reason),
            };
        }

        let evidence = evidence_for(&profile, request, edge, now);
        debug!(
            application_id = %request.application_id,
            market_id = %request.market_id,
            %edge,
            transition_id = %evidence.transition_id,
            "transition allowed"
        );

        TransitionOutcome {
            allowed: true,
            decision: Decision::new(&profile, metadata, checks, Vec::new(), now),
            evidence: Some(evidence),
            blocked_reason: None,
        }
    }
}

/// `Some` when `edge` is not in the profile's transition graph. Shared with
/// the legacy stage adapter so both surfaces read the same table.
pub(crate) fn edge_violation(profile: &MarketPolicyProfile, edge: Edge) -> Option<Violation> {
    if profile.allows_edge(edge.from, edge.to) {
        return None;
    }

    let violation = Violation::cited(ViolationCode::FchaInvalidStateTransition, profile)
        .with_evidence("fromState", edge.from.label())
        .with_evidence("toState", edge.to.label())
        .with_evidence("allowedTargets", allowed_targets(profile, edge.from));
    Some(violation)
}

fn allowed_targets(profile: &MarketPolicyProfile, from: WorkflowState) -> String {
    profile
        .transition_graph
        .get(&from)
        .map(|targets| {
            targets
                .iter()
                .map(|state| state.label())
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default()
}

pub(crate) fn blocked_reason(edge: Edge, code: ViolationCode) -> String {
    match code {
        ViolationCode::FchaInvalidStateTransition | ViolationCode::FchaStageOrderViolation => {
            format!("transition blocked: {} → {} not permitted", edge.from, edge.to)
        }
        other => format!(
            "transition blocked: {} → {} prerequisites not met ({other})",
            edge.from, edge.to
        ),
    }
}

fn evidence_for(
    profile: &MarketPolicyProfile,
    request: &TransitionRequest,
    edge: Edge,
    now: DateTime<Utc>,
) -> EvidenceRecord {
    let notices = profile.notices_for(edge);
    let notices_issued = notices
        .filter(|config| !config.notices.is_empty())
        .map(|config| config.notices.clone());
    let response_window = notices
        .filter(|config| config.opens_response_window)
        .map(|_| ResponseWindow {
            days_allowed: profile.response_window_days,
        });

    EvidenceRecord {
        transition_id: Uuid::new_v4(),
        timestamp: now,
        actor_id: request.actor_id.clone(),
        actor_type: request.actor_type,
        from_state: edge.from,
        to_state: edge.to,
        notices_issued,
        response_window,
    }
}
