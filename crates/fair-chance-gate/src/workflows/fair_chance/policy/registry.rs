use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::super::domain::MarketId;
use super::packs::{fail_closed_profile, nyc_fcha_profile, unenforced_profile};
use super::{MarketPolicyProfile, PolicyLoadError, PolicyPackFile};

/// How a market without a registered profile is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownMarketPolicy {
    /// Resolve to an unenforced profile; every request is allowed.
    #[default]
    FailOpen,
    /// Resolve to an enforced profile that blocks every request.
    FailClosed,
}

impl UnknownMarketPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            UnknownMarketPolicy::FailOpen => "fail_open",
            UnknownMarketPolicy::FailClosed => "fail_closed",
        }
    }
}

impl fmt::Display for UnknownMarketPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UnknownMarketPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_open" | "open" => Ok(Self::FailOpen),
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            other => Err(format!("unknown market policy '{other}'")),
        }
    }
}

/// Read-only table of market profiles, injected into each gate.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    profiles: HashMap<MarketId, Arc<MarketPolicyProfile>>,
    unknown_market: UnknownMarketPolicy,
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl PolicyRegistry {
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::default()
    }

    /// Built-in packs with unknown markets failing open.
    pub fn standard() -> Self {
        Self {
            profiles: HashMap::from([(
                MarketId::new(super::packs::NYC_MARKET),
                Arc::new(nyc_fcha_profile()),
            )]),
            unknown_market: UnknownMarketPolicy::FailOpen,
        }
    }

    pub fn unknown_market_policy(&self) -> UnknownMarketPolicy {
        self.unknown_market
    }

    pub fn is_registered(&self, market_id: &MarketId) -> bool {
        self.profiles.contains_key(market_id)
    }

    pub fn markets(&self) -> Vec<&MarketId> {
        let mut markets: Vec<_> = self.profiles.keys().collect();
        markets.sort();
        markets
    }

    /// Resolve the profile for `market_id`. Never fails: unknown markets fall
    /// back according to [`UnknownMarketPolicy`], and the fallback is logged.
    pub fn lookup(&self, market_id: &MarketId) -> Arc<MarketPolicyProfile> {
        if let Some(profile) = self.profiles.get(market_id) {
            return Arc::clone(profile);
        }

        warn!(
            market_id = %market_id,
            unknown_market_policy = %self.unknown_market,
            "no policy profile registered for market; applying default"
        );

        let profile = match self.unknown_market {
            UnknownMarketPolicy::FailOpen => unenforced_profile(market_id.clone()),
            UnknownMarketPolicy::FailClosed => fail_closed_profile(market_id.clone()),
        };
        Arc::new(profile)
    }
}

/// Collects profiles from the built-in packs and from configured sources.
/// A configured profile replaces the built-in one for the same market; two
/// configured profiles for one market are an error.
#[derive(Debug, Default)]
pub struct PolicyRegistryBuilder {
    builtin: Vec<MarketPolicyProfile>,
    configured: Vec<MarketPolicyProfile>,
    unknown_market: UnknownMarketPolicy,
}

impl PolicyRegistryBuilder {
    pub fn with_profile(mut self, profile: MarketPolicyProfile) -> Self {
        self.configured.push(profile);
        self
    }

    pub fn with_pack(mut self, pack: PolicyPackFile) -> Self {
        self.configured.extend(pack.profiles);
        self
    }

    pub fn with_builtin_packs(mut self) -> Self {
        self.builtin.push(nyc_fcha_profile());
        self
    }

    pub fn unknown_market(mut self, policy: UnknownMarketPolicy) -> Self {
        self.unknown_market = policy;
        self
    }

    pub fn build(self) -> Result<PolicyRegistry, PolicyLoadError> {
        let mut profiles = HashMap::with_capacity(self.builtin.len() + self.configured.len());
        for profile in self.builtin {
            profiles.insert(profile.market_id.clone(), Arc::new(profile));
        }

        let mut configured = HashSet::with_capacity(self.configured.len());
        for profile in self.configured {
            profile
                .validate()
                .map_err(|reason| PolicyLoadError::InvalidProfile {
                    market_id: profile.market_id.clone(),
                    reason,
                })?;
            let market_id = profile.market_id.clone();
            if !configured.insert(market_id.clone()) {
                return Err(PolicyLoadError::DuplicateMarket(market_id));
            }
            if let Some(replaced) = profiles.insert(market_id.clone(), Arc::new(profile)) {
                info!(
                    market_id = %market_id,
                    replaced_policy_version = %replaced.policy_version,
                    "configured profile replaces built-in pack"
                );
            }
        }

        Ok(PolicyRegistry {
            profiles,
            unknown_market: self.unknown_market,
        })
    }
}

/// Registry handle whose table can be replaced while gates are running.
/// Readers take a snapshot per evaluation; a reload swaps the whole table.
#[derive(Debug, Clone)]
pub struct SharedPolicyRegistry {
    current: Arc<RwLock<Arc<PolicyRegistry>>>,
}

impl SharedPolicyRegistry {
    pub fn new(registry: PolicyRegistry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    pub fn snapshot(&self) -> Arc<PolicyRegistry> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn replace(&self, registry: PolicyRegistry) {
        let next = Arc::new(registry);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::fair_chance::domain::WorkflowState;

    #[test]
    fn lookup_matches_market_ids_case_insensitively() {
        let registry = PolicyRegistry::standard();
        let upper = registry.lookup(&MarketId::new("NYC"));
        let lower = registry.lookup(&MarketId::new("nyc"));
        assert!(upper.requires_gate);
        assert_eq!(upper, lower);
    }

    #[test]
    fn unknown_markets_fail_open_by_default() {
        let registry = PolicyRegistry::standard();
        let profile = registry.lookup(&MarketId::new("des-moines"));
        assert!(!profile.requires_gate);
        assert_eq!(profile.market_id.as_str(), "DES-MOINES");
        assert_eq!(profile.market_pack_id, "default");
    }

    #[test]
    fn unknown_markets_can_fail_closed() {
        let registry = PolicyRegistry::builder()
            .with_builtin_packs()
            .unknown_market(UnknownMarketPolicy::FailClosed)
            .build()
            .expect("registry builds");
        let profile = registry.lookup(&MarketId::new("des-moines"));
        assert!(profile.requires_gate);
        assert!(!profile.allows_edge(
            WorkflowState::Prequalification,
            WorkflowState::ConditionalOffer
        ));
    }

    #[test]
    fn builder_rejects_duplicate_configured_markets() {
        let result = PolicyRegistry::builder()
            .with_builtin_packs()
            .with_profile(nyc_fcha_profile())
            .with_profile(nyc_fcha_profile())
            .build();
        match result {
            Err(PolicyLoadError::DuplicateMarket(market)) => assert_eq!(market.as_str(), "NYC"),
            other => panic!("expected duplicate market error, got {other:?}"),
        }
    }

    #[test]
    fn configured_profile_replaces_builtin_pack() {
        let mut updated = nyc_fcha_profile();
        updated.policy_version = "2026.1".to_string();
        updated.response_window_days = 14;

        let registry = PolicyRegistry::builder()
            .with_builtin_packs()
            .with_pack(PolicyPackFile {
                profiles: vec![updated],
            })
            .build()
            .expect("override accepted");

        let nyc = registry.lookup(&MarketId::new("nyc"));
        assert_eq!(nyc.policy_version, "2026.1");
        assert_eq!(nyc.response_window_days, 14);
        assert_eq!(registry.markets().len(), 1);
    }

    #[test]
    fn shared_registry_swaps_whole_tables() {
        let shared = SharedPolicyRegistry::new(PolicyRegistry::standard());
        let before = shared.snapshot();

        let mut relaxed = nyc_fcha_profile();
        relaxed.requires_gate = false;
        shared.replace(
            PolicyRegistry::builder()
                .with_profile(relaxed)
                .build()
                .expect("registry builds"),
        );

        let nyc = MarketId::new("nyc");
        assert!(before.lookup(&nyc).requires_gate);
        assert!(!shared.snapshot().lookup(&nyc).requires_gate);
    }

    #[test]
    fn unknown_market_policy_parses_config_values() {
        assert_eq!(
            "fail-closed".parse::<UnknownMarketPolicy>(),
            Ok(UnknownMarketPolicy::FailClosed)
        );
        assert_eq!(
            "FAIL_OPEN".parse::<UnknownMarketPolicy>(),
            Ok(UnknownMarketPolicy::FailOpen)
        );
        assert!("maybe".parse::<UnknownMarketPolicy>().is_err());
    }
}
