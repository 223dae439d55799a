use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::decision::{
    Decision, DecisionMetadata, DecisionSubject, GateOutcome, Violation, ViolationCode,
    CHECK_FCHA_CRIMINAL, CHECK_FCHA_WORKFLOW,
};
use super::domain::CheckRequest;
use super::policy::{CheckClassification, MarketPolicyProfile, PolicyRegistry};

/// Decides whether a screening operation may run in the application's
/// current state.
#[derive(Debug, Clone)]
pub struct CheckGate {
    registry: Arc<PolicyRegistry>,
}

impl CheckGate {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    pub fn gate(&self, request: &CheckRequest) -> GateOutcome {
        self.gate_at(request, Utc::now())
    }

    pub fn gate_at(&self, request: &CheckRequest, now: DateTime<Utc>) -> GateOutcome {
        let profile = self.registry.lookup(&request.market_id);
        Self::gate_with_profile(&profile, request, now)
    }

    /// Evaluate against an already resolved profile.
    pub(crate) fn gate_with_profile(
        profile: &MarketPolicyProfile,
        request: &CheckRequest,
        now: DateTime<Utc>,
    ) -> GateOutcome {
        let metadata = DecisionMetadata {
            application_id: request.application_id.clone(),
            subject: DecisionSubject::Check {
                check_type: request.check_type,
                current_state: request.current_state,
            },
            fcha_enforced: profile.requires_gate,
        };
        let mut checks = vec![CHECK_FCHA_WORKFLOW.to_string()];

        if !profile.requires_gate {
            return GateOutcome {
                allowed: true,
                decision: Decision::new(profile, metadata, checks, Vec::new(), now),
                blocked_reason: None,
            };
        }

        if profile.classify(request.check_type) == CheckClassification::Unrestricted {
            debug!(
                application_id = %request.application_id,
                check_type = %request.check_type,
                "unrestricted check allowed"
            );
            return GateOutcome {
                allowed: true,
                decision: Decision::new(profile, metadata, checks, Vec::new(), now),
                blocked_reason: None,
            };
        }

        if !profile.unlocks_restricted_checks(request.current_state) {
            let required_state = profile
                .restricted_unlock_state
                .map(|state| state.label())
                .unwrap_or("none");
            let violation = Violation::cited(ViolationCode::FchaBackgroundCheckNotAllowed, profile)
                .with_evidence("checkType", request.check_type.label())
                .with_evidence("currentState", request.current_state.label())
                .with_evidence("requiredState", required_state);
            info!(
                application_id = %request.application_id,
                market_id = %request.market_id,
                check_type = %request.check_type,
                current_state = %request.current_state,
                violation_code = %violation.code,
                "restricted check blocked"
            );
            return GateOutcome {
                allowed: false,
                decision: Decision::new(profile, metadata, checks, vec![violation], now),
                blocked_reason: Some(format!(
                    "{} not permitted in state {}; requires {}",
                    request.check_type, request.current_state, required_state
                )),
            };
        }

        checks.push(CHECK_FCHA_CRIMINAL.to_string());
        debug!(
            application_id = %request.application_id,
            check_type = %request.check_type,
            "restricted check allowed after conditional offer"
        );
        GateOutcome {
            allowed: true,
            decision: Decision::new(profile, metadata, checks, Vec::new(), now),
            blocked_reason: None,
        }
    }
}
