//! Chain identifiers and LayerZero v2 deployment profiles
//!
//! One [`ChainProfile`] per network: where the messaging endpoint lives, the
//! endpoint id the protocol routes by, the verifier (DVN) sets and the
//! send/receive message libraries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::PathwayError;

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Ethereum mainnet
pub const ETHEREUM: &str = "ethereum";
/// Ethereum Sepolia testnet
pub const SEPOLIA: &str = "sepolia";
/// Etherlink mainnet
pub const ETHERLINK_MAINNET: &str = "etherlink-mainnet";
/// Etherlink testnet (ghostnet)
pub const ETHERLINK_TESTNET: &str = "etherlink-testnet";

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN PROFILE
// ═══════════════════════════════════════════════════════════════════════════════

/// LayerZero deployment parameters for a single chain.
///
/// Addresses are kept as the strings they were authored as; they are parsed
/// (and rejected if malformed) when encoded for the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainProfile {
    /// Network name, as used on the command line and in record file names
    pub chain_id: String,
    /// EndpointV2 contract address
    pub messaging_endpoint_address: String,
    /// LayerZero endpoint id (eid)
    pub endpoint_id: u32,
    /// DVNs that must all verify a message
    pub required_verifiers: Vec<String>,
    /// DVNs of which `optional_verifier_threshold` must verify
    #[serde(default)]
    pub optional_verifiers: Vec<String>,
    #[serde(default)]
    pub optional_verifier_threshold: u8,
    /// SendUln302 address
    pub send_library_address: String,
    /// ReceiveUln302 address
    pub receive_library_address: String,
    /// Block confirmations; 0 selects the protocol default
    #[serde(default)]
    pub required_confirmations: u64,
}

impl ChainProfile {
    /// Send library first, then receive library, in the order the
    /// security config is applied.
    pub fn libraries(&self) -> [&str; 2] {
        [&self.send_library_address, &self.receive_library_address]
    }
}

/// Profiles for the production pair (Ethereum ↔ Etherlink) and the test pair
/// (Sepolia ↔ Etherlink testnet).
///
/// Source: <https://docs.layerzero.network/v2/developers/evm/technical-reference/deployed-contracts>
pub fn default_profiles() -> Vec<ChainProfile> {
    vec![
        ChainProfile {
            chain_id: ETHEREUM.to_string(),
            messaging_endpoint_address: "0x1a44076050125825900e736c501f859c50fE728c".to_string(),
            endpoint_id: 30101,
            // LayerZero Labs
            required_verifiers: vec!["0x589dEDbD617e0CBcB916A9223F4d1300c294236b".to_string()],
            optional_verifiers: Vec::new(),
            optional_verifier_threshold: 0,
            send_library_address: "0xbB2Ea70C9E858123480642Cf96acbcCE1372dCe1".to_string(),
            receive_library_address: "0xc02Ab410f0734EFa3F14628780e6e695156024C2".to_string(),
            required_confirmations: 0,
        },
        ChainProfile {
            chain_id: SEPOLIA.to_string(),
            messaging_endpoint_address: "0x6EDCE65403992e310A62460808c4b910D972f10f".to_string(),
            endpoint_id: 40161,
            required_verifiers: vec!["0x8eebf8b423b73bfca51a1db4b7354aa0bfca9193".to_string()],
            optional_verifiers: Vec::new(),
            optional_verifier_threshold: 0,
            send_library_address: "0x9A84c0dC1f58C75bF1db19621bbB5a1642A91217".to_string(),
            receive_library_address: "0x9C44Ec2656bc6D6B9E47A07ac701c61bBEF5132A".to_string(),
            required_confirmations: 0,
        },
        ChainProfile {
            chain_id: ETHERLINK_TESTNET.to_string(),
            messaging_endpoint_address: "0xec28645346D781674B4272706D8a938dB2BAA2C6".to_string(),
            endpoint_id: 40239,
            required_verifiers: vec!["0x4d97186cd94047e285b7cb78fa63c93e69e7aad0".to_string()],
            optional_verifiers: Vec::new(),
            optional_verifier_threshold: 0,
            send_library_address: "0xE62d066e71fcA410eD48ad2f2A5A860443C04035".to_string(),
            receive_library_address: "0x2072a32Df77bAE5713853d666f26bA5e47E54717".to_string(),
            required_confirmations: 0,
        },
        ChainProfile {
            chain_id: ETHERLINK_MAINNET.to_string(),
            messaging_endpoint_address: "0xAaB5A48CFC03Efa9cC34A2C1aAcCCB84b4b770e4".to_string(),
            endpoint_id: 30292,
            required_verifiers: vec!["0xc097ab8cd7b053326dfe9fb3e3a31a0cce3b526f".to_string()],
            optional_verifiers: Vec::new(),
            optional_verifier_threshold: 0,
            send_library_address: "0xc1B621b18187F74c8F6D52a6F709Dd2780C09821".to_string(),
            receive_library_address: "0x2072a32Df77bAE5713853d666f26bA5e47E54717".to_string(),
            required_confirmations: 0,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable chain id → profile map, built once at startup.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    profiles: HashMap<String, ChainProfile>,
}

impl ChainRegistry {
    /// Build a registry, rejecting a table that names the same chain twice.
    pub fn new(profiles: Vec<ChainProfile>) -> Result<Self, PathwayError> {
        let mut map = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            if map.contains_key(&profile.chain_id) {
                return Err(PathwayError::DuplicateChain(profile.chain_id));
            }
            map.insert(profile.chain_id.clone(), profile);
        }
        Ok(Self { profiles: map })
    }

    /// Registry over [`default_profiles`].
    pub fn with_defaults() -> Self {
        let profiles = default_profiles()
            .into_iter()
            .map(|p| (p.chain_id.clone(), p))
            .collect();
        Self { profiles }
    }

    /// Parse a JSON array of profiles.
    pub fn from_json(json: &str) -> Result<Self, PathwayError> {
        let profiles: Vec<ChainProfile> = serde_json::from_str(json)?;
        Self::new(profiles)
    }

    /// Look up the profile for a chain.
    pub fn lookup(&self, chain_id: &str) -> Result<&ChainProfile, PathwayError> {
        self.profiles
            .get(chain_id)
            .ok_or_else(|| PathwayError::UnknownChain(chain_id.to_string()))
    }

    pub fn contains(&self, chain_id: &str) -> bool {
        self.profiles.contains_key(chain_id)
    }

    /// Chain ids in sorted order.
    pub fn chain_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
