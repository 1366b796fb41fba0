//! Calldata for the OFT, ERC20 and endpoint calls issued during setup.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, U256};
use ethers::utils::keccak256;
use oftb_pathway::{EnforcedOption, CONFIG_TYPE_ULN};

use crate::{Result, SetupError};

pub const SET_PEER: &str = "setPeer(uint32,bytes32)";
pub const SET_ENFORCED_OPTIONS: &str = "setEnforcedOptions((uint32,uint16,bytes)[])";
pub const SET_CONFIG: &str = "setConfig(address,address,(uint32,uint32,bytes)[])";
pub const APPROVE: &str = "approve(address,uint256)";
pub const QUOTE_SEND: &str = "quoteSend((uint32,bytes32,uint256,uint256,bytes,bytes,bytes),bool)";
pub const SEND: &str = "send((uint32,bytes32,uint256,uint256,bytes,bytes,bytes),(uint256,uint256),address)";

pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature);
    [hash[0], hash[1], hash[2], hash[3]]
}

fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut calldata = function_selector(signature).to_vec();
    calldata.extend_from_slice(&abi::encode(args));
    calldata
}

// ═══════════════════════════════════════════════════════════════════════════════
// OAPP CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// `setPeer(eid, peer)` on the adapter or representation.
pub fn set_peer(eid: u32, peer: [u8; 32]) -> Vec<u8> {
    encode_call(SET_PEER, &[Token::Uint(U256::from(eid)), Token::FixedBytes(peer.to_vec())])
}

pub fn set_enforced_options(options: &[EnforcedOption]) -> Vec<u8> {
    let entries = options
        .iter()
        .map(|o| {
            Token::Tuple(vec![
                Token::Uint(U256::from(o.eid)),
                Token::Uint(U256::from(o.msg_type)),
                Token::Bytes(o.options.clone()),
            ])
        })
        .collect();
    encode_call(SET_ENFORCED_OPTIONS, &[Token::Array(entries)])
}

/// `setConfig(oapp, lib, [(eid, 2, config)])` on the messaging endpoint.
pub fn set_uln_config(oapp: Address, library: Address, remote_eid: u32, config: &[u8]) -> Vec<u8> {
    let param = Token::Tuple(vec![
        Token::Uint(U256::from(remote_eid)),
        Token::Uint(U256::from(CONFIG_TYPE_ULN)),
        Token::Bytes(config.to_vec()),
    ]);
    encode_call(
        SET_CONFIG,
        &[Token::Address(oapp), Token::Address(library), Token::Array(vec![param])],
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn approve(spender: Address, amount: U256) -> Vec<u8> {
    encode_call(APPROVE, &[Token::Address(spender), Token::Uint(amount)])
}

/// OFT `SendParam`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendParam {
    pub dst_eid: u32,
    pub to: [u8; 32],
    pub amount_ld: U256,
    pub min_amount_ld: U256,
    pub extra_options: Vec<u8>,
    pub compose_msg: Vec<u8>,
    pub oft_cmd: Vec<u8>,
}

impl SendParam {
    fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Uint(U256::from(self.dst_eid)),
            Token::FixedBytes(self.to.to_vec()),
            Token::Uint(self.amount_ld),
            Token::Uint(self.min_amount_ld),
            Token::Bytes(self.extra_options.clone()),
            Token::Bytes(self.compose_msg.clone()),
            Token::Bytes(self.oft_cmd.clone()),
        ])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessagingFee {
    pub native_fee: U256,
    pub lz_token_fee: U256,
}

pub fn quote_send(param: &SendParam, pay_in_lz_token: bool) -> Vec<u8> {
    encode_call(QUOTE_SEND, &[param.to_token(), Token::Bool(pay_in_lz_token)])
}

/// Decode the `MessagingFee` returned by `quoteSend`.
pub fn decode_messaging_fee(data: &[u8]) -> Result<MessagingFee> {
    let tokens = abi::decode(&[ParamType::Uint(256), ParamType::Uint(256)], data)
        .map_err(|e| SetupError::ProtocolCall {
            call: "quoteSend".into(),
            reason: format!("undecodable fee: {e}"),
        })?;
    match tokens.as_slice() {
        [Token::Uint(native_fee), Token::Uint(lz_token_fee)] => Ok(MessagingFee {
            native_fee: *native_fee,
            lz_token_fee: *lz_token_fee,
        }),
        _ => Err(SetupError::ProtocolCall {
            call: "quoteSend".into(),
            reason: "unexpected fee layout".into(),
        }),
    }
}

pub fn send(param: &SendParam, fee: &MessagingFee, refund: Address) -> Vec<u8> {
    encode_call(
        SEND,
        &[
            param.to_token(),
            Token::Tuple(vec![Token::Uint(fee.native_fee), Token::Uint(fee.lz_token_fee)]),
            Token::Address(refund),
        ],
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTRUCTORS
// ═══════════════════════════════════════════════════════════════════════════════

/// `MyToken(string name, string symbol, uint256 initialSupply, address owner)`
pub fn token_constructor(name: &str, symbol: &str, supply: U256, owner: Address) -> Vec<u8> {
    abi::encode(&[
        Token::String(name.to_string()),
        Token::String(symbol.to_string()),
        Token::Uint(supply),
        Token::Address(owner),
    ])
}

/// `MyOFTAdapter(address token, address endpoint, address delegate)`
pub fn adapter_constructor(token: Address, endpoint: Address, delegate: Address) -> Vec<u8> {
    abi::encode(&[Token::Address(token), Token::Address(endpoint), Token::Address(delegate)])
}

/// `MyOFT(string name, string symbol, address endpoint, address delegate)`
pub fn representation_constructor(
    name: &str,
    symbol: &str,
    endpoint: Address,
    delegate: Address,
) -> Vec<u8> {
    abi::encode(&[
        Token::String(name.to_string()),
        Token::String(symbol.to_string()),
        Token::Address(endpoint),
        Token::Address(delegate),
    ])
}
