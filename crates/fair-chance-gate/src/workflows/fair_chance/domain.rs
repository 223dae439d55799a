use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for rental applications passing through the gates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Jurisdiction key. Normalised to upper case so lookups ignore caller casing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MarketId(String);

impl MarketId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MarketId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for MarketId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<MarketId> for String {
    fn from(value: MarketId) -> Self {
        value.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle states of an application under a fair chance workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Prequalification,
    ConditionalOffer,
    BackgroundCheckAllowed,
    IndividualizedAssessment,
    Approved,
    Denied,
}

impl WorkflowState {
    pub const fn all() -> [Self; 6] {
        [
            Self::Prequalification,
            Self::ConditionalOffer,
            Self::BackgroundCheckAllowed,
            Self::IndividualizedAssessment,
            Self::Approved,
            Self::Denied,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Prequalification => "PREQUALIFICATION",
            Self::ConditionalOffer => "CONDITIONAL_OFFER",
            Self::BackgroundCheckAllowed => "BACKGROUND_CHECK_ALLOWED",
            Self::IndividualizedAssessment => "INDIVIDUALIZED_ASSESSMENT",
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Denied)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown workflow state '{0}'")]
pub struct UnknownWorkflowState(pub String);

impl FromStr for WorkflowState {
    type Err = UnknownWorkflowState;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        Self::all()
            .into_iter()
            .find(|state| state.label() == normalized)
            .ok_or_else(|| UnknownWorkflowState(raw.to_string()))
    }
}

/// Screening operations a caller may ask to run. The list is closed: an
/// unrecognised name is rejected at parse time instead of defaulting to
/// unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    CriminalBackgroundCheck,
    CriminalHistory,
    ArrestRecord,
    ConvictionRecord,
    IncomeVerification,
    CreditCheck,
    RentalHistory,
    EmploymentVerification,
    IdentityVerification,
}

impl CheckType {
    pub const fn all() -> [Self; 9] {
        [
            Self::CriminalBackgroundCheck,
            Self::CriminalHistory,
            Self::ArrestRecord,
            Self::ConvictionRecord,
            Self::IncomeVerification,
            Self::CreditCheck,
            Self::RentalHistory,
            Self::EmploymentVerification,
            Self::IdentityVerification,
        ]
    }

    /// Checks that reveal criminal history.
    pub const fn criminal() -> [Self; 4] {
        [
            Self::CriminalBackgroundCheck,
            Self::CriminalHistory,
            Self::ArrestRecord,
            Self::ConvictionRecord,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CriminalBackgroundCheck => "criminal_background_check",
            Self::CriminalHistory => "criminal_history",
            Self::ArrestRecord => "arrest_record",
            Self::ConvictionRecord => "conviction_record",
            Self::IncomeVerification => "income_verification",
            Self::CreditCheck => "credit_check",
            Self::RentalHistory => "rental_history",
            Self::EmploymentVerification => "employment_verification",
            Self::IdentityVerification => "identity_verification",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown check type '{0}'")]
pub struct UnknownCheckType(pub String);

impl FromStr for CheckType {
    type Err = UnknownCheckType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::all()
            .into_iter()
            .find(|check| check.label() == normalized)
            .ok_or_else(|| UnknownCheckType(raw.to_string()))
    }
}

/// Who asked for the transition; recorded on evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    PropertyManager,
    LeasingAgent,
    ComplianceOfficer,
    Applicant,
    System,
}

impl ActorType {
    pub const fn label(self) -> &'static str {
        match self {
            ActorType::PropertyManager => "property_manager",
            ActorType::LeasingAgent => "leasing_agent",
            ActorType::ComplianceOfficer => "compliance_officer",
            ActorType::Applicant => "applicant",
            ActorType::System => "system",
        }
    }
}

/// Results of the lawful pre-offer screening steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrequalificationResults {
    pub income_verified: bool,
    pub credit_check_passed: bool,
    pub rental_history_verified: bool,
    pub employment_verified: bool,
}

impl PrequalificationResults {
    pub fn all_verified(&self) -> bool {
        self.income_verified
            && self.credit_check_passed
            && self.rental_history_verified
            && self.employment_verified
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalOfferDetails {
    pub offer_letter_delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_terms: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundCheckAuthorization {
    pub authorization_signed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdverseInfoDetails {
    pub adverse_info_found: bool,
    pub notice_delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalDecisionKind {
    Approved,
    Denied,
}

impl FinalDecisionKind {
    pub const fn target_state(self) -> WorkflowState {
        match self {
            FinalDecisionKind::Approved => WorkflowState::Approved,
            FinalDecisionKind::Denied => WorkflowState::Denied,
        }
    }
}

/// Factors Article 23-A requires an assessor to weigh before denying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Article23AFactor {
    PublicPolicyEncouragingLicensure,
    BearingOnTenancy,
    TimeElapsed,
    AgeAtOffense,
    Seriousness,
    Rehabilitation,
    PublicSafety,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalDecision {
    pub decision: FinalDecisionKind,
    pub rationale: String,
    #[serde(
        default,
        rename = "article23AFactorsConsidered",
        skip_serializing_if = "Option::is_none"
    )]
    pub article_23a_factors_considered: Option<Vec<Article23AFactor>>,
}

/// Edge-specific payload sections. Each edge reads the section it needs; a
/// missing section counts as an unmet prerequisite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prequalification_results: Option<PrequalificationResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_offer_details: Option<ConditionalOfferDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_check_authorization: Option<BackgroundCheckAuthorization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adverse_info_details: Option<AdverseInfoDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<FinalDecision>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub application_id: ApplicationId,
    pub market_id: MarketId,
    pub current_state: WorkflowState,
    pub target_state: WorkflowState,
    pub actor_id: String,
    pub actor_type: ActorType,
    #[serde(flatten)]
    pub payload: TransitionPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub application_id: ApplicationId,
    pub market_id: MarketId,
    pub current_state: WorkflowState,
    pub check_type: CheckType,
    pub actor_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_ids_ignore_caller_casing() {
        assert_eq!(MarketId::new("nyc"), MarketId::new(" NYC "));
        assert_eq!(MarketId::from("Nyc").as_str(), "NYC");
    }

    #[test]
    fn check_types_parse_only_known_names() {
        assert_eq!(
            "Criminal_History".parse::<CheckType>(),
            Ok(CheckType::CriminalHistory)
        );
        assert_eq!(
            "tarot_reading".parse::<CheckType>(),
            Err(UnknownCheckType("tarot_reading".to_string()))
        );
    }

    #[test]
    fn workflow_states_use_screaming_snake_case_on_the_wire() {
        let json = serde_json::to_string(&WorkflowState::BackgroundCheckAllowed).expect("json");
        assert_eq!(json, "\"BACKGROUND_CHECK_ALLOWED\"");
        assert_eq!(
            "individualized_assessment".parse::<WorkflowState>(),
            Ok(WorkflowState::IndividualizedAssessment)
        );
    }

    #[test]
    fn transition_requests_accept_flattened_payload_sections() {
        let raw = serde_json::json!({
            "applicationId": "app-1",
            "marketId": "nyc",
            "currentState": "CONDITIONAL_OFFER",
            "targetState": "BACKGROUND_CHECK_ALLOWED",
            "actorId": "agent-7",
            "actorType": "leasing_agent",
            "backgroundCheckAuthorization": { "authorizationSigned": true }
        });

        let request: TransitionRequest = serde_json::from_value(raw).expect("request parses");
        assert_eq!(request.market_id.as_str(), "NYC");
        assert_eq!(
            request.payload.background_check_authorization,
            Some(BackgroundCheckAuthorization {
                authorization_signed: true
            })
        );
        assert!(request.payload.final_decision.is_none());
    }
}
