use serde::{Deserialize, Serialize};

use super::super::decision::{Violation, ViolationCode};
use super::super::domain::{FinalDecisionKind, TransitionPayload, WorkflowState};
use super::{Edge, MarketPolicyProfile};

/// Validator attached to an edge of the transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prerequisite {
    /// All four pre-offer screens passed and the offer letter went out.
    PrequalificationComplete,
    /// Applicant signed the background check authorization.
    BackgroundCheckAuthorized,
    /// Adverse information was found and the applicant was notified.
    AdverseNoticeDelivered,
    /// A final decision matching the target state with its rationale, plus
    /// Article 23-A factors on denial when the profile asks for them.
    FinalDecisionRecorded,
}

impl Prerequisite {
    pub const fn violation_code(self) -> ViolationCode {
        match self {
            Prerequisite::PrequalificationComplete => ViolationCode::FchaPrequalificationIncomplete,
            Prerequisite::BackgroundCheckAuthorized => ViolationCode::FchaNoticeNotIssued,
            Prerequisite::AdverseNoticeDelivered => ViolationCode::FchaAdverseNoticeIncomplete,
            Prerequisite::FinalDecisionRecorded => ViolationCode::FchaFinalDecisionIncomplete,
        }
    }

    /// Missing payload sections fail the same way as unmet ones.
    pub(crate) fn evaluate(
        self,
        edge: Edge,
        payload: &TransitionPayload,
        profile: &MarketPolicyProfile,
    ) -> Result<(), Violation> {
        let unmet = |detail: &str| {
            Violation::cited(self.violation_code(), profile)
                .with_evidence("fromState", edge.from.label())
                .with_evidence("toState", edge.to.label())
                .with_evidence("detail", detail)
        };

        match self {
            Prerequisite::PrequalificationComplete => {
                let results = payload
                    .prequalification_results
                    .ok_or_else(|| unmet("prequalification results missing"))?;
                if !results.all_verified() {
                    return Err(unmet(&format!(
                        "unverified prequalification steps: {}",
                        unverified_steps(&results).join(", ")
                    )));
                }
                let delivered = payload
                    .conditional_offer_details
                    .as_ref()
                    .is_some_and(|details| details.offer_letter_delivered);
                if !delivered {
                    return Err(unmet("conditional offer letter not delivered"));
                }
                Ok(())
            }
            Prerequisite::BackgroundCheckAuthorized => {
                match payload.background_check_authorization {
                    Some(authorization) if authorization.authorization_signed => Ok(()),
                    Some(_) => Err(unmet("background check authorization not signed")),
                    None => Err(unmet("background check authorization missing")),
                }
            }
            Prerequisite::AdverseNoticeDelivered => {
                let details = payload
                    .adverse_info_details
                    .as_ref()
                    .ok_or_else(|| unmet("adverse information details missing"))?;
                if !details.adverse_info_found {
                    return Err(unmet("no adverse information recorded"));
                }
                if !details.notice_delivered {
                    return Err(unmet("adverse information notice not delivered"));
                }
                Ok(())
            }
            Prerequisite::FinalDecisionRecorded => {
                let decision = payload
                    .final_decision
                    .as_ref()
                    .ok_or_else(|| unmet("final decision missing"))?;
                if decision.decision.target_state() != edge.to {
                    return Err(unmet(&format!(
                        "final decision does not match target state {}",
                        edge.to
                    )));
                }
                if decision.rationale.trim().is_empty() {
                    return Err(unmet("final decision rationale is blank"));
                }
                let denial_after_assessment = profile.require_article_23a_factors_on_denial
                    && decision.decision == FinalDecisionKind::Denied
                    && edge.from == WorkflowState::IndividualizedAssessment;
                let factors_weighed = decision
                    .article_23a_factors_considered
                    .as_ref()
                    .is_some_and(|factors| !factors.is_empty());
                if denial_after_assessment && !factors_weighed {
                    return Err(unmet("denial requires Article 23-A factors considered"));
                }
                Ok(())
            }
        }
    }
}

fn unverified_steps(results: &super::super::domain::PrequalificationResults) -> Vec<&'static str> {
    [
        ("incomeVerified", results.income_verified),
        ("creditCheckPassed", results.credit_check_passed),
        ("rentalHistoryVerified", results.rental_history_verified),
        ("employmentVerified", results.employment_verified),
    ]
    .into_iter()
    .filter(|(_, verified)| !verified)
    .map(|(name, _)| name)
    .collect()
}
