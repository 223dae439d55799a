use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{ActorType, ApplicationId, CheckType, WorkflowState};
use super::policy::{MarketPolicyProfile, NoticeKind};

pub const CHECK_FCHA_WORKFLOW: &str = "fcha_workflow";
pub const CHECK_FCHA_CRIMINAL: &str = "fcha_criminal_check";
pub const CHECK_FCHA_STAGE_ORDER: &str = "fcha_stage_order";

/// Closed set of violation codes emitted by the gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    FchaInvalidStateTransition,
    FchaPrequalificationIncomplete,
    FchaNoticeNotIssued,
    FchaAdverseNoticeIncomplete,
    FchaFinalDecisionIncomplete,
    FchaBackgroundCheckNotAllowed,
    FchaCriminalCheckBeforeOffer,
    FchaStageOrderViolation,
}

impl ViolationCode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FchaInvalidStateTransition => "FCHA_INVALID_STATE_TRANSITION",
            Self::FchaPrequalificationIncomplete => "FCHA_PREQUALIFICATION_INCOMPLETE",
            Self::FchaNoticeNotIssued => "FCHA_NOTICE_NOT_ISSUED",
            Self::FchaAdverseNoticeIncomplete => "FCHA_ADVERSE_NOTICE_INCOMPLETE",
            Self::FchaFinalDecisionIncomplete => "FCHA_FINAL_DECISION_INCOMPLETE",
            Self::FchaBackgroundCheckNotAllowed => "FCHA_BACKGROUND_CHECK_NOT_ALLOWED",
            Self::FchaCriminalCheckBeforeOffer => "FCHA_CRIMINAL_CHECK_BEFORE_OFFER",
            Self::FchaStageOrderViolation => "FCHA_STAGE_ORDER_VIOLATION",
        }
    }

    /// Section of the statute the code enforces.
    pub const fn section(self) -> &'static str {
        match self {
            Self::FchaInvalidStateTransition | Self::FchaStageOrderViolation => {
                "§ 8-107(11-a)(b) (sequencing of inquiries)"
            }
            Self::FchaPrequalificationIncomplete => {
                "§ 8-107(11-a)(b)(1) (conditional offer after non-criminal screening)"
            }
            Self::FchaNoticeNotIssued => "§ 8-107(11-a)(c) (notice before criminal inquiry)",
            Self::FchaAdverseNoticeIncomplete => {
                "§ 8-107(11-a)(d) (adverse information notice and response period)"
            }
            Self::FchaFinalDecisionIncomplete => "Correction Law Art. 23-A § 753 (factors)",
            Self::FchaBackgroundCheckNotAllowed | Self::FchaCriminalCheckBeforeOffer => {
                "§ 8-107(11-a)(b) (no criminal history inquiry before conditional offer)"
            }
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub code: ViolationCode,
    pub evidence: BTreeMap<String, String>,
    pub rule_reference: String,
    pub documentation_url: String,
}

impl Violation {
    pub(crate) fn cited(code: ViolationCode, profile: &MarketPolicyProfile) -> Self {
        Self {
            code,
            evidence: BTreeMap::new(),
            rule_reference: format!("{} {}", profile.citation.statute, code.section()),
            documentation_url: profile.citation.documentation_url.clone(),
        }
    }

    pub(crate) fn with_evidence(mut self, key: &str, value: impl Into<String>) -> Self {
        self.evidence.insert(key.to_string(), value.into());
        self
    }

    /// Same violation reported under a different code; used when translating
    /// between calling conventions.
    pub(crate) fn recoded(mut self, code: ViolationCode, statute: &str) -> Self {
        self.code = code;
        self.rule_reference = format!("{} {}", statute, code.section());
        self
    }
}

/// What a decision was about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecisionSubject {
    #[serde(rename_all = "camelCase")]
    Transition {
        from_state: WorkflowState,
        to_state: WorkflowState,
    },
    #[serde(rename_all = "camelCase")]
    Check {
        check_type: CheckType,
        current_state: WorkflowState,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMetadata {
    pub application_id: ApplicationId,
    #[serde(flatten)]
    pub subject: DecisionSubject,
    pub fcha_enforced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub passed: bool,
    pub violations: Vec<Violation>,
    pub checks_performed: Vec<String>,
    pub policy_version: String,
    pub market_pack: String,
    pub market_pack_version: String,
    pub checked_at: DateTime<Utc>,
    pub metadata: DecisionMetadata,
}

impl Decision {
    pub(crate) fn new(
        profile: &MarketPolicyProfile,
        metadata: DecisionMetadata,
        checks_performed: Vec<String>,
        violations: Vec<Violation>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
            checks_performed,
            policy_version: profile.policy_version.clone(),
            market_pack: profile.market_pack_id.clone(),
            market_pack_version: profile.market_pack_version.clone(),
            checked_at,
            metadata,
        }
    }

    pub fn violation_codes(&self) -> Vec<ViolationCode> {
        self.violations
            .iter()
            .map(|violation| violation.code)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseWindow {
    pub days_allowed: u16,
}

/// Audit artifact for an allowed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    pub transition_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub actor_type: ActorType,
    pub from_state: WorkflowState,
    pub to_state: WorkflowState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notices_issued: Option<Vec<NoticeKind>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_window: Option<ResponseWindow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub allowed: bool,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidenceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

/// Outcome of the check gate and of both legacy entry points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateOutcome {
    pub allowed: bool,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}
