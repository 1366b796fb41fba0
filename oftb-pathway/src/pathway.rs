//! Tier classification, network pairing and directed pathway resolution.
//!
//! Each tier (production, test) has exactly one canonical-token chain (the
//! source, where the adapter lives) and one representation chain (the target).
//! Pathways only exist inside a tier.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chains::{self, ChainProfile, ChainRegistry};
use crate::PathwayError;

/// Deployment tier of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Production,
    Test,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Production => write!(f, "Mainnet"),
            Tier::Test => write!(f, "Testnet"),
        }
    }
}

/// The fixed (source, target) pair of a tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPair {
    /// Chain holding the canonical token and the adapter
    pub source_chain_id: String,
    /// Chain holding the representation
    pub target_chain_id: String,
}

impl NetworkPair {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source_chain_id: source.to_string(),
            target_chain_id: target.to_string(),
        }
    }

    pub fn is_source(&self, chain_id: &str) -> bool {
        self.source_chain_id == chain_id
    }

    pub fn is_target(&self, chain_id: &str) -> bool {
        self.target_chain_id == chain_id
    }

    /// The other member of the pair, if `chain_id` belongs to it.
    pub fn counterpart(&self, chain_id: &str) -> Option<&str> {
        if self.is_source(chain_id) {
            Some(&self.target_chain_id)
        } else if self.is_target(chain_id) {
            Some(&self.source_chain_id)
        } else {
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TIER TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Static chain → tier classification plus the tier → pair table.
#[derive(Debug, Clone)]
pub struct TierTable {
    tiers: HashMap<String, Tier>,
    pairs: HashMap<Tier, NetworkPair>,
}

impl TierTable {
    /// Build a table; every paired chain must be classified in the pair's tier.
    pub fn new(
        tiers: impl IntoIterator<Item = (String, Tier)>,
        pairs: impl IntoIterator<Item = (Tier, NetworkPair)>,
    ) -> Result<Self, PathwayError> {
        let mut tier_map = HashMap::new();
        for (chain_id, tier) in tiers {
            if tier_map.insert(chain_id.clone(), tier).is_some() {
                return Err(PathwayError::InvalidTable(format!(
                    "chain {chain_id} classified twice"
                )));
            }
        }

        let mut pair_map = HashMap::new();
        for (tier, pair) in pairs {
            for chain_id in [&pair.source_chain_id, &pair.target_chain_id] {
                if tier_map.get(chain_id) != Some(&tier) {
                    return Err(PathwayError::InvalidTable(format!(
                        "{tier:?} pair member {chain_id} is not classified as {tier:?}"
                    )));
                }
            }
            if pair.source_chain_id == pair.target_chain_id {
                return Err(PathwayError::InvalidTable(format!(
                    "{tier:?} pair uses {} on both sides",
                    pair.source_chain_id
                )));
            }
            if pair_map.insert(tier, pair).is_some() {
                return Err(PathwayError::InvalidTable(format!("{tier:?} paired twice")));
            }
        }

        Ok(Self {
            tiers: tier_map,
            pairs: pair_map,
        })
    }

    /// Ethereum → Etherlink for production, Sepolia → Etherlink testnet for test.
    pub fn default_table() -> Self {
        let tiers = [
            (chains::ETHEREUM, Tier::Production),
            (chains::ETHERLINK_MAINNET, Tier::Production),
            (chains::SEPOLIA, Tier::Test),
            (chains::ETHERLINK_TESTNET, Tier::Test),
        ]
        .into_iter()
        .map(|(c, t)| (c.to_string(), t))
        .collect();

        let pairs = [
            (
                Tier::Production,
                NetworkPair::new(chains::ETHEREUM, chains::ETHERLINK_MAINNET),
            ),
            (
                Tier::Test,
                NetworkPair::new(chains::SEPOLIA, chains::ETHERLINK_TESTNET),
            ),
        ]
        .into_iter()
        .collect();

        Self { tiers, pairs }
    }

    pub fn tier_of(&self, chain_id: &str) -> Option<Tier> {
        self.tiers.get(chain_id).copied()
    }

    pub fn pair_for(&self, tier: Tier) -> Option<&NetworkPair> {
        self.pairs.get(&tier)
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::default_table()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATHWAY
// ═══════════════════════════════════════════════════════════════════════════════

/// Directed local → remote pathway: the local profile plus the remote eid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pathway {
    pub local: ChainProfile,
    pub remote_endpoint_id: u32,
}

impl Pathway {
    pub fn local_chain_id(&self) -> &str {
        &self.local.chain_id
    }

    pub fn local_endpoint_id(&self) -> u32 {
        self.local.endpoint_id
    }
}

/// Resolves chain ids into tiers, pairs and pathways.
///
/// Cheap to clone; the registry is shared read-only.
#[derive(Debug, Clone)]
pub struct PathwayResolver {
    registry: Arc<ChainRegistry>,
    tiers: Arc<TierTable>,
}

impl PathwayResolver {
    pub fn new(registry: Arc<ChainRegistry>, tiers: Arc<TierTable>) -> Self {
        Self { registry, tiers }
    }

    /// Resolver over the built-in profiles and tier table.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(ChainRegistry::with_defaults()),
            Arc::new(TierTable::default_table()),
        )
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn lookup(&self, chain_id: &str) -> Result<&ChainProfile, PathwayError> {
        self.registry.lookup(chain_id)
    }

    /// Tier of a chain. A chain with a profile but no tier entry cannot form
    /// a pathway.
    pub fn classify(&self, chain_id: &str) -> Result<Tier, PathwayError> {
        match self.tiers.tier_of(chain_id) {
            Some(tier) => Ok(tier),
            None if self.registry.contains(chain_id) => Err(PathwayError::InvalidPathway(
                format!("chain {chain_id} has no tier classification"),
            )),
            None => Err(PathwayError::UnknownChain(chain_id.to_string())),
        }
    }

    /// The fixed source/target pair of the tier `chain_id` belongs to.
    pub fn pair(&self, chain_id: &str) -> Result<NetworkPair, PathwayError> {
        let tier = self.classify(chain_id)?;
        self.tiers.pair_for(tier).cloned().ok_or_else(|| {
            PathwayError::InvalidPathway(format!("no network pair configured for {tier:?}"))
        })
    }

    /// Directed pathway from `local_chain_id` to `remote_chain_id`.
    pub fn resolve(
        &self,
        local_chain_id: &str,
        remote_chain_id: &str,
    ) -> Result<Pathway, PathwayError> {
        let local = self.registry.lookup(local_chain_id)?;
        let remote = self.registry.lookup(remote_chain_id)?;

        if local_chain_id == remote_chain_id {
            return Err(PathwayError::InvalidPathway(format!(
                "{local_chain_id} cannot be its own remote"
            )));
        }

        let local_tier = self.classify(local_chain_id)?;
        let remote_tier = self.classify(remote_chain_id)?;
        if local_tier != remote_tier {
            return Err(PathwayError::InvalidPathway(format!(
                "{local_chain_id} ({local_tier:?}) -> {remote_chain_id} ({remote_tier:?}) crosses tiers"
            )));
        }

        Ok(Pathway {
            local: local.clone(),
            remote_endpoint_id: remote.endpoint_id,
        })
    }

    /// Pathway from `chain_id` to the other member of its pair.
    pub fn resolve_to_counterpart(&self, chain_id: &str) -> Result<Pathway, PathwayError> {
        let pair = self.pair(chain_id)?;
        let remote = pair.counterpart(chain_id).ok_or_else(|| {
            PathwayError::InvalidPathway(format!("{chain_id} is not part of its tier's pair"))
        })?;
        self.resolve(chain_id, remote)
    }
}
