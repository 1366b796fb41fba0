//! Chain client seam.

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The node reported a revert, or the receipt came back with status 0.
    /// `data` is the raw revert payload and may be empty.
    #[error("execution reverted: 0x{}", hex::encode(.data))]
    Reverted { data: Vec<u8> },

    #[error("transport error: {0}")]
    Transport(String),
}

/// One signer connected to one network.
///
/// Every write waits for its receipt before returning.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Network name the client is connected to.
    fn network(&self) -> &str;

    /// Address transactions are sent from.
    fn sender(&self) -> Address;

    /// Deploy a contract, returning its address.
    async fn deploy(&self, init_code: Vec<u8>) -> Result<Address, ClientError>;

    /// Send a transaction and wait for it to be mined.
    async fn send(&self, to: Address, calldata: Vec<u8>, value: U256) -> Result<H256, ClientError>;

    /// Read-only call.
    async fn call(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>, ClientError>;
}
