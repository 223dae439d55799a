use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::super::domain::{CheckType, MarketId, WorkflowState};
use super::{Edge, MarketPolicyProfile, NoticeConfig, NoticeKind, Prerequisite, RuleCitation};

pub const NYC_MARKET: &str = "NYC";
pub const NYC_RESPONSE_WINDOW_DAYS: u16 = 10;
const NYC_STATUTE: &str = "NYC Admin. Code";
const NYC_DOCUMENTATION_URL: &str =
    "https://www.nyc.gov/site/cchr/law/fair-chance-housing.page";

pub(crate) const DEFAULT_PACK_ID: &str = "default";
const DEFAULT_PACK_VERSION: &str = "0.0.0";
const DEFAULT_POLICY_VERSION: &str = "unregulated";

/// The NYC Fair Chance Housing Act pack.
pub fn nyc_fcha_profile() -> MarketPolicyProfile {
    use WorkflowState::*;

    let graph = [
        (Prequalification, vec![ConditionalOffer]),
        (ConditionalOffer, vec![BackgroundCheckAllowed]),
        (
            BackgroundCheckAllowed,
            vec![Approved, IndividualizedAssessment],
        ),
        (IndividualizedAssessment, vec![Approved, Denied]),
    ]
    .into_iter()
    .map(|(from, targets)| (from, targets.into_iter().collect::<BTreeSet<_>>()))
    .collect();

    let prerequisites = BTreeMap::from([
        (
            Edge::new(Prequalification, ConditionalOffer),
            Prerequisite::PrequalificationComplete,
        ),
        (
            Edge::new(ConditionalOffer, BackgroundCheckAllowed),
            Prerequisite::BackgroundCheckAuthorized,
        ),
        (
            Edge::new(BackgroundCheckAllowed, IndividualizedAssessment),
            Prerequisite::AdverseNoticeDelivered,
        ),
        (
            Edge::new(BackgroundCheckAllowed, Approved),
            Prerequisite::FinalDecisionRecorded,
        ),
        (
            Edge::new(IndividualizedAssessment, Approved),
            Prerequisite::FinalDecisionRecorded,
        ),
        (
            Edge::new(IndividualizedAssessment, Denied),
            Prerequisite::FinalDecisionRecorded,
        ),
    ]);

    let notices = BTreeMap::from([
        (
            Edge::new(Prequalification, ConditionalOffer),
            NoticeConfig {
                notices: vec![NoticeKind::ConditionalOfferLetter],
                opens_response_window: false,
            },
        ),
        (
            Edge::new(ConditionalOffer, BackgroundCheckAllowed),
            NoticeConfig {
                notices: vec![NoticeKind::FairChanceNotice],
                opens_response_window: false,
            },
        ),
        (
            Edge::new(BackgroundCheckAllowed, IndividualizedAssessment),
            NoticeConfig {
                notices: vec![NoticeKind::AdverseInformationNotice],
                opens_response_window: true,
            },
        ),
        (
            Edge::new(IndividualizedAssessment, Denied),
            NoticeConfig {
                notices: vec![NoticeKind::FinalDecisionNotice],
                opens_response_window: false,
            },
        ),
    ]);

    MarketPolicyProfile {
        market_id: MarketId::new(NYC_MARKET),
        requires_gate: true,
        transition_graph: graph,
        prerequisite_validators: prerequisites,
        restricted_checks: CheckType::criminal().into_iter().collect(),
        restricted_unlock_state: Some(BackgroundCheckAllowed),
        notice_config: notices,
        response_window_days: NYC_RESPONSE_WINDOW_DAYS,
        require_article_23a_factors_on_denial: false,
        policy_version: "2025.1".to_string(),
        market_pack_id: "nyc_fcha".to_string(),
        market_pack_version: "1.0.0".to_string(),
        citation: RuleCitation {
            statute: NYC_STATUTE.to_string(),
            documentation_url: NYC_DOCUMENTATION_URL.to_string(),
        },
    }
}

/// Profile for markets without fair chance obligations.
pub fn unenforced_profile(market_id: MarketId) -> MarketPolicyProfile {
    MarketPolicyProfile {
        market_id,
        requires_gate: false,
        transition_graph: BTreeMap::new(),
        prerequisite_validators: BTreeMap::new(),
        restricted_checks: BTreeSet::new(),
        restricted_unlock_state: None,
        notice_config: BTreeMap::new(),
        response_window_days: NYC_RESPONSE_WINDOW_DAYS,
        require_article_23a_factors_on_denial: false,
        policy_version: DEFAULT_POLICY_VERSION.to_string(),
        market_pack_id: DEFAULT_PACK_ID.to_string(),
        market_pack_version: DEFAULT_PACK_VERSION.to_string(),
        citation: RuleCitation {
            statute: "none".to_string(),
            documentation_url: String::new(),
        },
    }
}

/// Enforced profile with no edges and every check locked, used when unknown
/// markets must fail closed.
pub(crate) fn fail_closed_profile(market_id: MarketId) -> MarketPolicyProfile {
    MarketPolicyProfile {
        market_id,
        requires_gate: true,
        restricted_checks: CheckType::all().into_iter().collect(),
        policy_version: "unconfigured-fail-closed".to_string(),
        citation: RuleCitation {
            statute: NYC_STATUTE.to_string(),
            documentation_url: NYC_DOCUMENTATION_URL.to_string(),
        },
        ..unenforced_profile(MarketId::new(DEFAULT_PACK_ID))
    }
}

/// On-disk policy pack: a list of market profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyPackFile {
    pub profiles: Vec<MarketPolicyProfile>,
}

impl PolicyPackFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PolicyLoadError> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PolicyLoadError> {
        let pack: Self = serde_json::from_reader(reader)?;
        for profile in &pack.profiles {
            profile
                .validate()
                .map_err(|reason| PolicyLoadError::InvalidProfile {
                    market_id: profile.market_id.clone(),
                    reason,
                })?;
        }
        Ok(pack)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyLoadError {
    #[error("failed to read policy pack: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid policy pack JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("market {0} is registered more than once")]
    DuplicateMarket(MarketId),
    #[error("profile for market {market_id} is invalid: {reason}")]
    InvalidProfile { market_id: MarketId, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn pack_files_round_trip_the_nyc_profile() {
        let pack = PolicyPackFile {
            profiles: vec![nyc_fcha_profile()],
        };
        let json = serde_json::to_string_pretty(&pack).expect("serialises");
        assert!(json.contains("\"PREQUALIFICATION->CONDITIONAL_OFFER\""));

        let loaded = PolicyPackFile::from_reader(Cursor::new(json)).expect("loads");
        assert_eq!(loaded, pack);
    }

    #[test]
    fn pack_files_reject_invalid_profiles() {
        let mut profile = nyc_fcha_profile();
        profile.response_window_days = 0;
        let json = serde_json::to_string(&PolicyPackFile {
            profiles: vec![profile],
        })
        .expect("serialises");

        match PolicyPackFile::from_reader(Cursor::new(json)) {
            Err(PolicyLoadError::InvalidProfile { market_id, reason }) => {
                assert_eq!(market_id.as_str(), NYC_MARKET);
                assert!(reason.contains("responseWindowDays"));
            }
            other => panic!("expected invalid profile, got {other:?}"),
        }
    }

    #[test]
    fn pack_files_reject_malformed_json() {
        let result = PolicyPackFile::from_reader(Cursor::new("{\"profiles\": 3}"));
        assert!(matches!(result, Err(PolicyLoadError::Json(_))));
    }

    #[test]
    fn fail_closed_profile_restricts_every_check() {
        let profile = fail_closed_profile(MarketId::new("mars"));
        assert!(profile.requires_gate);
        assert!(profile.transition_graph.is_empty());
        assert_eq!(profile.restricted_checks.len(), CheckType::all().len());
        assert!(profile.restricted_unlock_state.is_none());
    }
}
