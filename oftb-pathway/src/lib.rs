//! oftb-pathway
//!
//! Static chain profiles, pathway resolution and security-stack encoding for
//! an OFT adapter / representation bridge running over LayerZero v2.
//!
//! Everything in this crate is pure: no I/O, no logging, no chain access.
//! Callers (the setup orchestrator and the CLI) decide what to log and when
//! to touch a chain.

use thiserror::Error;

pub mod chains;
pub mod encoding;
pub mod options;
pub mod pathway;
pub mod revert;

pub use chains::{default_profiles, ChainProfile, ChainRegistry};
pub use encoding::{
    address_to_bytes32, bytes32_to_hex, decode_security_stack, encode_security_stack, left_pad_32,
    parse_address, SecurityStackConfig,
};
pub use options::{send_options, EnforcedOption, ExecutorOptions};
pub use pathway::{NetworkPair, Pathway, PathwayResolver, Tier, TierTable};
pub use revert::{describe_revert, selector};

/// `configType` of the ULN (quorum/verifier) config on the messaging endpoint.
pub const CONFIG_TYPE_ULN: u32 = 2;

/// `msgType` of a standard OFT send.
pub const MSG_TYPE_SEND: u16 = 1;

/// Default gas granted to `lzReceive` on the destination chain.
pub const DEFAULT_LZ_RECEIVE_GAS: u128 = 200_000;

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathwayError {
    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("duplicate chain profile: {0}")]
    DuplicateChain(String),

    #[error("invalid pathway: {0}")]
    InvalidPathway(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("invalid profile table: {0}")]
    InvalidTable(String),
}

impl From<serde_json::Error> for PathwayError {
    fn from(err: serde_json::Error) -> Self {
        PathwayError::InvalidTable(err.to_string())
    }
}
