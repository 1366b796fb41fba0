//! Type-3 executor options
//!
//! Byte layout:
//!
//! ```text
//! u16 type (= 3)
//! repeated: u8 workerId (= 1, executor) | u16 size | u8 optionType | params
//! ```
//!
//! `size` covers `optionType` plus `params`.

use serde::{Deserialize, Serialize};

use crate::encoding::left_pad_32;
use crate::{PathwayError, MSG_TYPE_SEND};

const TYPE_3: u16 = 3;
const EXECUTOR_WORKER_ID: u8 = 1;

const OPTION_TYPE_LZRECEIVE: u8 = 1;
const OPTION_TYPE_NATIVE_DROP: u8 = 2;

/// Builder for type-3 options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    entries: Vec<(u8, Vec<u8>)>,
}

impl ExecutorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gas (and optional msg.value) for `lzReceive` on the destination.
    /// `value` is only written when non-zero.
    pub fn add_executor_lz_receive_option(mut self, gas: u128, value: u128) -> Self {
        let mut params = gas.to_be_bytes().to_vec();
        if value != 0 {
            params.extend_from_slice(&value.to_be_bytes());
        }
        self.entries.push((OPTION_TYPE_LZRECEIVE, params));
        self
    }

    /// Airdrop `amount` native wei to `receiver` on the destination.
    pub fn add_executor_native_drop_option(mut self, amount: u128, receiver: &str) -> Result<Self, PathwayError> {
        let receiver = crate::encoding::parse_address(receiver)?;
        let mut params = amount.to_be_bytes().to_vec();
        params.extend_from_slice(&left_pad_32(&receiver));
        self.entries.push((OPTION_TYPE_NATIVE_DROP, params));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = TYPE_3.to_be_bytes().to_vec();
        for (option_type, params) in &self.entries {
            // params are at most 48 bytes, so the size always fits
            let size = (params.len() + 1) as u16;
            out.push(EXECUTOR_WORKER_ID);
            out.extend_from_slice(&size.to_be_bytes());
            out.push(*option_type);
            out.extend_from_slice(params);
        }
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

/// One entry of `setEnforcedOptions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcedOption {
    pub eid: u32,
    pub msg_type: u16,
    #[serde(with = "hex_bytes")]
    pub options: Vec<u8>,
}

impl EnforcedOption {
    /// The standard send enforcement: `lzReceive(gas, 0)` on every message
    /// of type SEND towards `eid`.
    pub fn standard_send(eid: u32, gas: u128) -> Self {
        Self {
            eid,
            msg_type: MSG_TYPE_SEND,
            options: ExecutorOptions::new()
                .add_executor_lz_receive_option(gas, 0)
                .to_bytes(),
        }
    }
}

/// Per-send extra options: native drop first, then `lzReceive(gas, 0)`.
pub fn send_options(gas: u128, native_drop: u128, receiver: &str) -> Result<ExecutorOptions, PathwayError> {
    Ok(ExecutorOptions::new()
        .add_executor_native_drop_option(native_drop, receiver)?
        .add_executor_lz_receive_option(gas, 0))
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}
