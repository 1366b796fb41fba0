//! ABI encoding of the ULN security-stack config
//!
//! Layout (a single ABI tuple, as consumed by `EndpointV2.setConfig` with
//! `configType = 2`):
//!
//! ```text
//! tuple(uint64 confirmations, uint8 requiredDVNCount, uint8 optionalDVNCount,
//!       uint8 optionalDVNThreshold, address[] requiredDVNs, address[] optionalDVNs)
//! ```

use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::chains::ChainProfile;
use crate::PathwayError;

/// Quorum/verifier configuration derived from a [`ChainProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityStackConfig {
    pub confirmations: u64,
    pub required_verifier_count: u8,
    pub optional_verifier_count: u8,
    pub optional_verifier_threshold: u8,
    pub required_verifiers: Vec<Address>,
    pub optional_verifiers: Vec<Address>,
}

impl SecurityStackConfig {
    /// Derive the config from a profile.
    ///
    /// EndpointV2 currently reverts `setConfig` whenever optional DVNs are
    /// supplied, so a profile listing any is rejected here.
    pub fn from_profile(profile: &ChainProfile) -> Result<Self, PathwayError> {
        if !profile.optional_verifiers.is_empty() {
            return Err(PathwayError::Encoding(format!(
                "{}: optional verifiers are not accepted by the endpoint ({} configured)",
                profile.chain_id,
                profile.optional_verifiers.len()
            )));
        }
        if profile.optional_verifier_threshold != 0 {
            return Err(PathwayError::Encoding(format!(
                "{}: optional verifier threshold {} exceeds optional verifier count 0",
                profile.chain_id, profile.optional_verifier_threshold
            )));
        }

        let required_verifiers = profile
            .required_verifiers
            .iter()
            .map(|a| parse_address(a))
            .collect::<Result<Vec<_>, _>>()?;
        let required_verifier_count = u8::try_from(required_verifiers.len()).map_err(|_| {
            PathwayError::Encoding(format!(
                "{}: {} required verifiers do not fit in a uint8 count",
                profile.chain_id,
                required_verifiers.len()
            ))
        })?;

        Ok(Self {
            confirmations: profile.required_confirmations,
            required_verifier_count,
            optional_verifier_count: 0,
            optional_verifier_threshold: 0,
            required_verifiers,
            optional_verifiers: Vec::new(),
        })
    }

    fn param_type() -> ParamType {
        ParamType::Tuple(vec![
            ParamType::Uint(64),
            ParamType::Uint(8),
            ParamType::Uint(8),
            ParamType::Uint(8),
            ParamType::Array(Box::new(ParamType::Address)),
            ParamType::Array(Box::new(ParamType::Address)),
        ])
    }

    /// ABI-encode as the endpoint's `UlnConfig` struct.
    pub fn abi_encode(&self) -> Vec<u8> {
        fn addresses(list: &[Address]) -> Token {
            Token::Array(list.iter().copied().map(Token::Address).collect())
        }

        abi::encode(&[Token::Tuple(vec![
            Token::Uint(U256::from(self.confirmations)),
            Token::Uint(U256::from(self.required_verifier_count)),
            Token::Uint(U256::from(self.optional_verifier_count)),
            Token::Uint(U256::from(self.optional_verifier_threshold)),
            addresses(&self.required_verifiers),
            addresses(&self.optional_verifiers),
        ])])
    }
}

/// Encode the security stack of `profile` for `setConfig`.
pub fn encode_security_stack(profile: &ChainProfile) -> Result<Vec<u8>, PathwayError> {
    Ok(SecurityStackConfig::from_profile(profile)?.abi_encode())
}

/// Inverse of [`encode_security_stack`]. Used for verification only.
pub fn decode_security_stack(bytes: &[u8]) -> Result<SecurityStackConfig, PathwayError> {
    let mut tokens = abi::decode(&[SecurityStackConfig::param_type()], bytes)
        .map_err(|e| PathwayError::Encoding(format!("malformed security config: {e}")))?;

    let fields = match tokens.pop() {
        Some(Token::Tuple(fields)) if fields.len() == 6 => fields,
        _ => return Err(PathwayError::Encoding("expected a 6-field tuple".into())),
    };
    let mut fields = fields.into_iter();
    let mut next = || fields.next().ok_or_else(|| PathwayError::Encoding("truncated tuple".into()));

    let confirmations = uint_field::<u64>(next()?, "confirmations")?;
    let required_verifier_count = uint_field::<u8>(next()?, "requiredDVNCount")?;
    let optional_verifier_count = uint_field::<u8>(next()?, "optionalDVNCount")?;
    let optional_verifier_threshold = uint_field::<u8>(next()?, "optionalDVNThreshold")?;
    let required_verifiers = address_list(next()?, "requiredDVNs")?;
    let optional_verifiers = address_list(next()?, "optionalDVNs")?;

    if usize::from(required_verifier_count) != required_verifiers.len() {
        return Err(PathwayError::Encoding(format!(
            "requiredDVNCount {} does not match {} required DVNs",
            required_verifier_count,
            required_verifiers.len()
        )));
    }
    if usize::from(optional_verifier_count) != optional_verifiers.len() {
        return Err(PathwayError::Encoding(format!(
            "optionalDVNCount {} does not match {} optional DVNs",
            optional_verifier_count,
            optional_verifiers.len()
        )));
    }

    Ok(SecurityStackConfig {
        confirmations,
        required_verifier_count,
        optional_verifier_count,
        optional_verifier_threshold,
        required_verifiers,
        optional_verifiers,
    })
}

fn uint_field<T: TryFrom<u64>>(token: Token, name: &str) -> Result<T, PathwayError> {
    match token {
        Token::Uint(value) if value <= U256::from(u64::MAX) => T::try_from(value.as_u64())
            .map_err(|_| PathwayError::Encoding(format!("{name} out of range: {value}"))),
        other => Err(PathwayError::Encoding(format!("{name}: unexpected token {other:?}"))),
    }
}

fn address_list(token: Token, name: &str) -> Result<Vec<Address>, PathwayError> {
    match token {
        Token::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Token::Address(address) => Ok(address),
                other => Err(PathwayError::Encoding(format!(
                    "{name}: unexpected token {other:?}"
                ))),
            })
            .collect(),
        other => Err(PathwayError::Encoding(format!("{name}: unexpected token {other:?}"))),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a `0x`-prefixed (or bare) 20-byte hex address.
pub fn parse_address(hex_str: &str) -> Result<Address, PathwayError> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(stripped)
        .map_err(|e| PathwayError::Encoding(format!("malformed address {hex_str}: {e}")))?;

    if bytes.len() != 20 {
        return Err(PathwayError::Encoding(format!(
            "malformed address {hex_str}: expected 20 bytes, got {}",
            bytes.len()
        )));
    }

    Ok(Address::from_slice(&bytes))
}

/// Left-pad a 20-byte address to the 32-byte form used for peers and
/// OFT recipients.
pub fn left_pad_32(address: &Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..].copy_from_slice(address.as_bytes());
    padded
}

/// Parse then left-pad.
pub fn address_to_bytes32(hex_str: &str) -> Result<[u8; 32], PathwayError> {
    parse_address(hex_str).map(|a| left_pad_32(&a))
}

pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}
