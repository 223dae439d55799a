//! Per-jurisdiction policy profiles and the registry that resolves them.
//!
//! A [`MarketPolicyProfile`] is the single rule table every gate reads: the
//! transition graph, the prerequisite attached to each edge, the check
//! classifier, and the notice obligations. Profiles are immutable once loaded.

mod packs;
pub(crate) mod prerequisites;
mod registry;

pub use packs::{nyc_fcha_profile, unenforced_profile, PolicyLoadError, PolicyPackFile};
pub use prerequisites::Prerequisite;
pub use registry::{PolicyRegistry, PolicyRegistryBuilder, SharedPolicyRegistry, UnknownMarketPolicy};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{CheckType, MarketId, WorkflowState};

/// Directed pair of workflow states. Serialised as `"FROM->TO"` so it can key
/// JSON objects in policy pack files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Edge {
    pub from: WorkflowState,
    pub to: WorkflowState,
}

impl Edge {
    pub const fn new(from: WorkflowState, to: WorkflowState) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

impl From<Edge> for String {
    fn from(value: Edge) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Edge {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (from, to) = value
            .split_once("->")
            .ok_or_else(|| format!("edge '{value}' must look like FROM->TO"))?;
        let from = from.parse().map_err(|err| format!("{err}"))?;
        let to = to.parse().map_err(|err| format!("{err}"))?;
        Ok(Self { from, to })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckClassification {
    Restricted,
    Unrestricted,
}

/// Notices a transition puts on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    ConditionalOfferLetter,
    FairChanceNotice,
    AdverseInformationNotice,
    FinalDecisionNotice,
}

impl NoticeKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ConditionalOfferLetter => "conditional_offer_letter",
            Self::FairChanceNotice => "fair_chance_notice",
            Self::AdverseInformationNotice => "adverse_information_notice",
            Self::FinalDecisionNotice => "final_decision_notice",
        }
    }
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeConfig {
    #[serde(default)]
    pub notices: Vec<NoticeKind>,
    /// Starts the applicant's statutory response period.
    #[serde(default)]
    pub opens_response_window: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCitation {
    pub statute: String,
    pub documentation_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPolicyProfile {
    pub market_id: MarketId,
    pub requires_gate: bool,
    #[serde(default)]
    pub transition_graph: BTreeMap<WorkflowState, BTreeSet<WorkflowState>>,
    #[serde(default)]
    pub prerequisite_validators: BTreeMap<Edge, Prerequisite>,
    /// Checks listed here are restricted; anything else is unrestricted.
    #[serde(default)]
    pub restricted_checks: BTreeSet<CheckType>,
    /// `None` keeps restricted checks locked in every state.
    #[serde(default)]
    pub restricted_unlock_state: Option<WorkflowState>,
    #[serde(default)]
    pub notice_config: BTreeMap<Edge, NoticeConfig>,
    pub response_window_days: u16,
    /// Denials out of individualized assessment must list the Article 23-A
    /// factors weighed.
    #[serde(default, rename = "requireArticle23AFactorsOnDenial")]
    pub require_article_23a_factors_on_denial: bool,
    pub policy_version: String,
    pub market_pack_id: String,
    pub market_pack_version: String,
    pub citation: RuleCitation,
}

impl MarketPolicyProfile {
    pub fn allows_edge(&self, from: WorkflowState, to: WorkflowState) -> bool {
        self.transition_graph
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
    }

    pub fn prerequisite_for(&self, edge: Edge) -> Option<Prerequisite> {
        self.prerequisite_validators.get(&edge).copied()
    }

    pub fn classify(&self, check: CheckType) -> CheckClassification {
        if self.restricted_checks.contains(&check) {
            CheckClassification::Restricted
        } else {
            CheckClassification::Unrestricted
        }
    }

    /// Whether a restricted check may run while the application sits in `state`.
    pub fn unlocks_restricted_checks(&self, state: WorkflowState) -> bool {
        self.restricted_unlock_state == Some(state)
    }

    pub fn notices_for(&self, edge: Edge) -> Option<&NoticeConfig> {
        self.notice_config.get(&edge)
    }

    /// Structural checks run when a profile is loaded from outside the binary.
    pub fn validate(&self) -> Result<(), String> {
        if self.response_window_days == 0 {
            return Err("responseWindowDays must be positive".to_string());
        }

        for (from, targets) in &self.transition_graph {
            if from.is_terminal() && !targets.is_empty() {
                return Err(format!("terminal state {from} cannot have outgoing edges"));
            }
        }

        for edge in self
            .prerequisite_validators
            .keys()
            .chain(self.notice_config.keys())
        {
            if !self.allows_edge(edge.from, edge.to) {
                return Err(format!("{edge} is configured but not in the transition graph"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_round_trip_through_their_string_form() {
        let edge = Edge::new(
            WorkflowState::ConditionalOffer,
            WorkflowState::BackgroundCheckAllowed,
        );
        assert_eq!(edge.to_string(), "CONDITIONAL_OFFER->BACKGROUND_CHECK_ALLOWED");
        assert_eq!(Edge::try_from(edge.to_string()), Ok(edge));
        assert!(Edge::try_from("CONDITIONAL_OFFER".to_string()).is_err());
    }

    #[test]
    fn validate_rejects_edges_out_of_terminal_states() {
        let mut profile = nyc_fcha_profile();
        profile
            .transition_graph
            .entry(WorkflowState::Denied)
            .or_default()
            .insert(WorkflowState::Prequalification);

        let error = profile.validate().expect_err("terminal edge rejected");
        assert!(error.contains("DENIED"));
    }

    #[test]
    fn validate_rejects_prerequisites_on_missing_edges() {
        let mut profile = nyc_fcha_profile();
        profile.prerequisite_validators.insert(
            Edge::new(WorkflowState::Prequalification, WorkflowState::Approved),
            Prerequisite::FinalDecisionRecorded,
        );

        assert!(profile.validate().is_err());
    }

    #[test]
    fn nyc_profile_is_structurally_valid() {
        assert_eq!(nyc_fcha_profile().validate(), Ok(()));
    }
}
