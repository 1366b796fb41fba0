//! EVM chain client.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::MiddlewareError;
use ethers::types::transaction::eip2718::TypedTransaction;
use tracing::{debug, info};

use crate::client::{ChainClient, ClientError};

pub type EvmSigner = SignerMiddleware<Provider<Http>, LocalWallet>;

/// [`ChainClient`] over an HTTP provider and a local wallet.
pub struct EvmChainClient {
    network: String,
    client: Arc<EvmSigner>,
}

impl EvmChainClient {
    /// Connect to `rpc_url`, binding the wallet to the chain id the node
    /// reports.
    pub async fn connect(network: &str, rpc_url: &str, wallet: LocalWallet) -> Result<Self, ClientError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ClientError::Transport(format!("invalid RPC URL {rpc_url}: {e}")))?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| ClientError::Transport(format!("failed to fetch chain id: {e}")))?;

        let wallet = wallet.with_chain_id(chain_id.as_u64());
        info!(network, %chain_id, sender = ?wallet.address(), "connected");

        Ok(Self {
            network: network.to_string(),
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
        })
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TransactionReceipt, ClientError> {
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(classify_error)?;
        let tx_hash = pending.tx_hash();
        debug!(network = %self.network, ?tx_hash, "transaction submitted");

        let receipt = pending
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?
            .ok_or_else(|| ClientError::Transport(format!("transaction {tx_hash:?} dropped")))?;

        if receipt.status == Some(U64::zero()) {
            return Err(ClientError::Reverted { data: Vec::new() });
        }
        Ok(receipt)
    }
}

/// Node-reported reverts carry their payload in the JSON-RPC error data.
fn classify_error<E: MiddlewareError>(err: E) -> ClientError {
    match err.as_error_response().and_then(|resp| resp.as_revert_data()) {
        Some(data) => ClientError::Reverted { data: data.to_vec() },
        None => ClientError::Transport(err.to_string()),
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn network(&self) -> &str {
        &self.network
    }

    fn sender(&self) -> Address {
        self.client.address()
    }

    async fn deploy(&self, init_code: Vec<u8>) -> Result<Address, ClientError> {
        let tx = TransactionRequest::new()
            .from(self.sender())
            .data(Bytes::from(init_code));
        let receipt = self.submit(tx).await?;

        receipt.contract_address.ok_or_else(|| {
            ClientError::Transport(format!(
                "receipt {:?} has no contract address",
                receipt.transaction_hash
            ))
        })
    }

    async fn send(&self, to: Address, calldata: Vec<u8>, value: U256) -> Result<H256, ClientError> {
        let tx = TransactionRequest::new()
            .from(self.sender())
            .to(to)
            .data(Bytes::from(calldata))
            .value(value);
        let receipt = self.submit(tx).await?;
        Ok(receipt.transaction_hash)
    }

    async fn call(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>, ClientError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .from(self.sender())
            .to(to)
            .data(Bytes::from(calldata))
            .into();
        let output = self.client.call(&tx, None).await.map_err(classify_error)?;
        Ok(output.to_vec())
    }
}
