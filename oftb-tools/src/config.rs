//! Tool configuration.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use ethers::signers::{coins_bip39::English, LocalWallet, MnemonicBuilder};
use tracing::warn;

/// Mnemonic used when neither `MNEMONIC` nor `PRIVATE_KEY` is set.
pub const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// BIP-44 path of the signing account when a mnemonic is used.
pub const DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// Built-in RPC endpoints, overridden by `<NETWORK>_RPC_URL`.
const DEFAULT_RPC_URLS: &[(&str, &str)] = &[
    ("ethereum", "https://eth.llamarpc.com"),
    ("sepolia", "https://rpc.ankr.com/eth_sepolia"),
    ("etherlink-testnet", "https://node.ghostnet.etherlink.com"),
    ("etherlink-mainnet", "https://node.mainnet.etherlink.com"),
];

#[derive(Clone, Debug)]
pub struct ToolsConfig {
    /// BIP-39 phrase; account 0 signs.
    pub mnemonic: Option<String>,
    /// Hex private key. Takes precedence over the mnemonic.
    pub private_key: Option<String>,
    /// `<NETWORK>_RPC_URL` overrides, keyed by network name.
    pub rpc_urls: HashMap<String, String>,
    /// Where `contracts.<network>.json` and run state live.
    pub records_dir: PathBuf,
    /// Where `<ContractName>.json` artifacts live.
    pub artifacts_dir: PathBuf,
}

impl ToolsConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();

        let rpc_urls = vars
            .iter()
            .filter_map(|(key, value)| {
                key.strip_suffix("_RPC_URL")
                    .map(|network| (network.to_lowercase().replace('_', "-"), value.clone()))
            })
            .collect();

        Self {
            mnemonic: vars.get("MNEMONIC").cloned(),
            private_key: vars.get("PRIVATE_KEY").cloned(),
            rpc_urls,
            records_dir: vars
                .get("OFTB_RECORDS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            artifacts_dir: vars
                .get("OFTB_ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("artifacts")),
        }
    }

    /// RPC URL for `network`: the env override, else the built-in default.
    pub fn rpc_url(&self, network: &str) -> Result<String> {
        if let Some(url) = self.rpc_urls.get(network) {
            return Ok(url.clone());
        }
        DEFAULT_RPC_URLS
            .iter()
            .find(|(name, _)| *name == network)
            .map(|(_, url)| url.to_string())
            .ok_or_else(|| {
                anyhow!(
                    "no RPC URL for {network}; set {}_RPC_URL",
                    network.to_uppercase().replace('-', "_")
                )
            })
    }

    /// Derivation path of the signer, `None` when it comes from a private key.
    pub fn derivation_path(&self) -> Option<&'static str> {
        match self.private_key {
            Some(_) => None,
            None => Some(DERIVATION_PATH),
        }
    }

    /// Signing wallet, chain id unset.
    pub fn wallet(&self) -> Result<LocalWallet> {
        if let Some(key) = &self.private_key {
            return key
                .trim_start_matches("0x")
                .parse::<LocalWallet>()
                .context("Invalid private key");
        }

        let phrase = match &self.mnemonic {
            Some(phrase) => phrase.as_str(),
            None => {
                warn!("MNEMONIC not set, using the public test mnemonic");
                TEST_MNEMONIC
            }
        };

        MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .derivation_path(DERIVATION_PATH)
            .context("Invalid derivation path")?
            .build()
            .context("Invalid mnemonic")
    }
}
