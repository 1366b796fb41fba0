//! Human-readable revert reasons
//!
//! Matches the 4-byte selector of revert data against the errors the OFT,
//! endpoint and Solidity runtime raise. Anything else comes back as raw hex.

use ethers_core::abi::{self, ParamType, Token};
use sha3::{Digest, Keccak256};

struct KnownError {
    signature: &'static str,
    params: &'static [fn() -> ParamType],
}

fn uint256() -> ParamType {
    ParamType::Uint(256)
}
fn uint32() -> ParamType {
    ParamType::Uint(32)
}
fn uint16() -> ParamType {
    ParamType::Uint(16)
}
fn bytes32() -> ParamType {
    ParamType::FixedBytes(32)
}
fn bytes() -> ParamType {
    ParamType::Bytes
}
fn string() -> ParamType {
    ParamType::String
}

const KNOWN_ERRORS: &[KnownError] = &[
    KnownError { signature: "Error(string)", params: &[string] },
    KnownError { signature: "Panic(uint256)", params: &[uint256] },
    KnownError { signature: "NoPeer(uint32)", params: &[uint32] },
    KnownError { signature: "OnlyPeer(uint32,bytes32)", params: &[uint32, bytes32] },
    KnownError { signature: "InvalidOptions(bytes)", params: &[bytes] },
    KnownError { signature: "InvalidOptionType(uint16)", params: &[uint16] },
    KnownError { signature: "SlippageExceeded(uint256,uint256)", params: &[uint256, uint256] },
    KnownError { signature: "NotEnoughNative(uint256)", params: &[uint256] },
    KnownError { signature: "LzTokenUnavailable()", params: &[] },
    KnownError { signature: "InvalidDelegate()", params: &[] },
    KnownError { signature: "InvalidEndpointCall()", params: &[] },
    KnownError { signature: "LZ_DefaultSendLibUnavailable()", params: &[] },
    KnownError { signature: "LZ_DefaultReceiveLibUnavailable()", params: &[] },
    KnownError { signature: "LZ_InvalidPayloadHash()", params: &[] },
];

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Describe revert data, e.g. `NoPeer(40239)` or `Error("ERC20: insufficient allowance")`.
pub fn describe_revert(data: &[u8]) -> String {
    if data.len() < 4 {
        return raw(data);
    }
    let (sel, args) = data.split_at(4);

    for known in KNOWN_ERRORS {
        if selector(known.signature) != sel {
            continue;
        }
        let name = known.signature.split('(').next().unwrap_or(known.signature);
        let params: Vec<ParamType> = known.params.iter().map(|p| p()).collect();

        return match abi::decode(&params, args) {
            Ok(tokens) => {
                let rendered: Vec<String> = tokens.iter().map(render_token).collect();
                format!("{name}({})", rendered.join(", "))
            }
            Err(_) => format!("{name}(<undecodable {}>)", raw(args)),
        };
    }

    raw(data)
}

fn render_token(token: &Token) -> String {
    match token {
        Token::String(s) => format!("{s:?}"),
        Token::Uint(v) => v.to_string(),
        Token::FixedBytes(b) | Token::Bytes(b) => raw(b),
        other => other.to_string(),
    }
}

fn raw(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}
