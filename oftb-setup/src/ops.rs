//! Bridge operations.
//!
//! One method per command. Each method is bound to the chain the client is
//! connected to and checks, before anything is sent, that it is the chain
//! the operation belongs on. The adapter side always lives on the source
//! chain of the pair, the representation side on the target chain.

use ethers::types::{Address, H256, U256};
use ethers::utils::{parse_ether, to_checksum};
use oftb_pathway::{
    address_to_bytes32, encode_security_stack, left_pad_32, parse_address, send_options,
    EnforcedOption, NetworkPair, PathwayResolver,
};
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactLoader, ContractKind};
use crate::calls::{self, MessagingFee, SendParam};
use crate::client::ChainClient;
use crate::record::{DeploymentStore, RecordField};
use crate::tracker::MessageTracker;
use crate::{Result, SetupError};

/// Which end of the bridge an operation configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeSide {
    /// The adapter wrapping the canonical token, on the source chain.
    Adapter,
    /// The representation token, on the target chain.
    Representation,
}

impl BridgeSide {
    pub fn chain(self, pair: &NetworkPair) -> &str {
        match self {
            BridgeSide::Adapter => &pair.source_chain_id,
            BridgeSide::Representation => &pair.target_chain_id,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            BridgeSide::Adapter => BridgeSide::Representation,
            BridgeSide::Representation => BridgeSide::Adapter,
        }
    }

    /// Record field holding this side's bridge contract.
    pub fn contract_field(self) -> RecordField {
        match self {
            BridgeSide::Adapter => RecordField::Adapter,
            BridgeSide::Representation => RecordField::Representation,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BridgeSide::Adapter => "adapter",
            BridgeSide::Representation => "representation",
        }
    }
}

/// Parameters of a test transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferParams {
    /// Whole tokens, 18 decimals
    pub amount: String,
    pub receiver: String,
    /// Native wei dropped on the receiver at the destination
    pub gas_drop: u128,
    /// Gas for `lzReceive` at the destination
    pub max_gas: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub approve_tx: Option<H256>,
    pub send_tx: H256,
    pub native_fee: U256,
    pub dst_eid: u32,
    /// Destination transaction that executed the message, when delivery was
    /// awaited.
    pub dst_tx: Option<H256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Deployed { field: RecordField, address: Address },
    Transactions(Vec<H256>),
    Transferred(TransferReceipt),
    /// The record already holds the field this step would write.
    AlreadySatisfied { field: RecordField, address: String },
}

pub struct BridgeOps<'a> {
    resolver: &'a PathwayResolver,
    store: &'a dyn DeploymentStore,
    artifacts: &'a ArtifactLoader,
    client: &'a dyn ChainClient,
    tracker: Option<&'a dyn MessageTracker>,
}

impl<'a> BridgeOps<'a> {
    pub fn new(
        resolver: &'a PathwayResolver,
        store: &'a dyn DeploymentStore,
        artifacts: &'a ArtifactLoader,
        client: &'a dyn ChainClient,
    ) -> Self {
        Self {
            resolver,
            store,
            artifacts,
            client,
            tracker: None,
        }
    }

    /// Wait for transfers to be delivered on the destination chain.
    pub fn with_tracker(mut self, tracker: &'a dyn MessageTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn active_chain(&self) -> &str {
        self.client.network()
    }

    pub fn resolver(&self) -> &PathwayResolver {
        self.resolver
    }

    /// The network pair of the active chain's tier.
    pub fn pair(&self) -> Result<NetworkPair> {
        Ok(self.resolver.pair(self.client.network())?)
    }

    /// Resolve the pair and fail with [`SetupError::WrongChain`] unless the
    /// active chain is `side`'s chain.
    fn enter(&self, step: &str, side: BridgeSide) -> Result<NetworkPair> {
        let pair = self.pair()?;
        let expected = side.chain(&pair);
        let active = self.client.network();
        if active != expected {
            return Err(SetupError::WrongChain {
                step: step.to_string(),
                expected: expected.to_string(),
                active: active.to_string(),
            });
        }
        Ok(pair)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEPLOYMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deploy the canonical token on the source chain. `supply` is in whole
    /// tokens and is minted to the sender.
    pub async fn deploy_token(&self, name: &str, symbol: &str, supply: &str) -> Result<StepOutcome> {
        let pair = self.enter("deploy-token", BridgeSide::Adapter)?;
        let chain = pair.source_chain_id.as_str();

        if let Some(done) = self.already_deployed(chain, RecordField::Token)? {
            return Ok(done);
        }

        let supply = parse_amount(supply)?;
        let owner = self.client.sender();
        let args = calls::token_constructor(name, symbol, supply, owner);
        let init_code = self.artifacts.init_code(ContractKind::Token, &args)?;

        info!(network = chain, name, symbol, %supply, owner = ?owner, "deploying token");
        self.deploy(chain, RecordField::Token, "deploy token", init_code).await
    }

    /// Deploy the adapter for `token` (or the recorded token) on the source
    /// chain.
    pub async fn deploy_adapter(&self, token: Option<&str>) -> Result<StepOutcome> {
        let pair = self.enter("deploy-adapter", BridgeSide::Adapter)?;
        let chain = pair.source_chain_id.as_str();

        if let Some(done) = self.already_deployed(chain, RecordField::Adapter)? {
            return Ok(done);
        }

        let record = self.store.load(chain)?;
        let token = match (token, record.get(RecordField::Token)) {
            (Some(given), Some(recorded)) => {
                let given = parse_address(given)?;
                if given != parse_address(recorded)? {
                    return Err(SetupError::InvalidInput(format!(
                        "token {} differs from the token recorded for {chain} ({recorded})",
                        to_checksum(&given, None)
                    )));
                }
                given
            }
            (Some(given), None) => {
                let given = parse_address(given)?;
                // later steps read the token from the record
                self.store
                    .write_field(chain, RecordField::Token, &to_checksum(&given, None))?;
                info!(network = chain, token = ?given, "recorded external token");
                given
            }
            (None, _) => parse_address(record.require(chain, RecordField::Token)?)?,
        };
        let endpoint = self.local_endpoint(chain)?;
        let delegate = self.client.sender();

        let args = calls::adapter_constructor(token, endpoint, delegate);
        let init_code = self.artifacts.init_code(ContractKind::Adapter, &args)?;

        info!(network = chain, token = ?token, endpoint = ?endpoint, "deploying adapter");
        self.deploy(chain, RecordField::Adapter, "deploy adapter", init_code).await
    }

    /// Deploy the representation token on the target chain.
    pub async fn deploy_representation(&self, name: &str, symbol: &str) -> Result<StepOutcome> {
        let pair = self.enter("deploy-representation", BridgeSide::Representation)?;
        let chain = pair.target_chain_id.as_str();

        if let Some(done) = self.already_deployed(chain, RecordField::Representation)? {
            return Ok(done);
        }

        let endpoint = self.local_endpoint(chain)?;
        let delegate = self.client.sender();
        let args = calls::representation_constructor(name, symbol, endpoint, delegate);
        let init_code = self.artifacts.init_code(ContractKind::Representation, &args)?;

        info!(network = chain, name, symbol, endpoint = ?endpoint, "deploying representation");
        self.deploy(chain, RecordField::Representation, "deploy representation", init_code)
            .await
    }

    fn already_deployed(&self, chain: &str, field: RecordField) -> Result<Option<StepOutcome>> {
        let record = self.store.load(chain)?;
        Ok(record.get(field).map(|address| {
            info!(network = chain, %field, address, "already deployed, skipping");
            StepOutcome::AlreadySatisfied {
                field,
                address: address.to_string(),
            }
        }))
    }

    async fn deploy(
        &self,
        chain: &str,
        field: RecordField,
        call: &str,
        init_code: Vec<u8>,
    ) -> Result<StepOutcome> {
        let address = self
            .client
            .deploy(init_code)
            .await
            .map_err(|e| SetupError::from_client(call, e))?;

        self.store.write_field(chain, field, &to_checksum(&address, None))?;
        info!(network = chain, %field, address = ?address, "deployed");

        Ok(StepOutcome::Deployed { field, address })
    }

    /// Messaging endpoint from the chain profile. A record that names a
    /// different endpoint is only warned about.
    fn local_endpoint(&self, chain: &str) -> Result<Address> {
        let profile = self.resolver.lookup(chain)?;
        let record = self.store.load(chain)?;
        if let Some(recorded) = record.get(RecordField::Endpoint) {
            if !recorded.eq_ignore_ascii_case(&profile.messaging_endpoint_address) {
                warn!(
                    network = chain,
                    recorded,
                    profile = %profile.messaging_endpoint_address,
                    "recorded endpoint differs from profile, using profile"
                );
            }
        }
        Ok(parse_address(&profile.messaging_endpoint_address)?)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PATHWAY CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register the representation as the adapter's peer.
    pub async fn set_local_peer(&self) -> Result<StepOutcome> {
        self.set_peer("set-local-peer", BridgeSide::Adapter).await
    }

    /// Register the adapter as the representation's peer.
    pub async fn set_remote_peer(&self) -> Result<StepOutcome> {
        self.set_peer("set-remote-peer", BridgeSide::Representation).await
    }

    async fn set_peer(&self, step: &str, side: BridgeSide) -> Result<StepOutcome> {
        let pair = self.enter(step, side)?;
        let local_chain = side.chain(&pair);
        let remote_chain = side.opposite().chain(&pair);

        let local = self.recorded(local_chain, side.contract_field())?;
        let remote_record = self.store.load(remote_chain)?;
        let peer = address_to_bytes32(
            remote_record.require(remote_chain, side.opposite().contract_field())?,
        )?;
        let pathway = self.resolver.resolve(local_chain, remote_chain)?;

        info!(
            network = local_chain,
            contract = ?local,
            remote_eid = pathway.remote_endpoint_id,
            peer = %oftb_pathway::bytes32_to_hex(&peer),
            "setting peer"
        );
        let calldata = calls::set_peer(pathway.remote_endpoint_id, peer);
        let tx = self.transact(local, calldata, "setPeer").await?;

        Ok(StepOutcome::Transactions(vec![tx]))
    }

    /// Enforce `lzReceive(max_gas)` on sends from `side` to its counterpart.
    pub async fn set_enforced_options(&self, side: BridgeSide, max_gas: u128) -> Result<StepOutcome> {
        let pair = self.enter("set-enforced-options", side)?;
        let local_chain = side.chain(&pair);
        let remote_chain = side.opposite().chain(&pair);

        let local = self.recorded(local_chain, side.contract_field())?;
        let pathway = self.resolver.resolve(local_chain, remote_chain)?;
        let options = [EnforcedOption::standard_send(pathway.remote_endpoint_id, max_gas)];

        info!(
            network = local_chain,
            contract = ?local,
            remote_eid = pathway.remote_endpoint_id,
            max_gas,
            "setting enforced options"
        );
        let tx = self
            .transact(local, calls::set_enforced_options(&options), "setEnforcedOptions")
            .await?;

        Ok(StepOutcome::Transactions(vec![tx]))
    }

    /// Apply the local profile's security stack to the send library and then
    /// the receive library, through the local messaging endpoint.
    pub async fn set_security_config(&self, side: BridgeSide) -> Result<StepOutcome> {
        let pair = self.enter("set-security-config", side)?;
        let local_chain = side.chain(&pair);
        let remote_chain = side.opposite().chain(&pair);

        let oapp = self.recorded(local_chain, side.contract_field())?;
        let pathway = self.resolver.resolve(local_chain, remote_chain)?;
        let config = encode_security_stack(&pathway.local)?;
        let endpoint = parse_address(&pathway.local.messaging_endpoint_address)?;
        let libraries = pathway
            .local
            .libraries()
            .iter()
            .map(|lib| parse_address(lib))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(config = %hex::encode(&config), "encoded security stack");

        let mut txs = Vec::with_capacity(libraries.len());
        for library in libraries {
            info!(
                network = local_chain,
                oapp = ?oapp,
                library = ?library,
                remote_eid = pathway.remote_endpoint_id,
                "setting security config"
            );
            let calldata = calls::set_uln_config(oapp, library, pathway.remote_endpoint_id, &config);
            txs.push(self.transact(endpoint, calldata, "setConfig").await?);
        }

        Ok(StepOutcome::Transactions(txs))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSFERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Bridge tokens from the source chain through the adapter.
    pub async fn send(&self, params: &TransferParams) -> Result<StepOutcome> {
        self.transfer("send", BridgeSide::Adapter, params).await
    }

    /// Bridge representation tokens back to the source chain.
    pub async fn send_back(&self, params: &TransferParams) -> Result<StepOutcome> {
        self.transfer("send-back", BridgeSide::Representation, params).await
    }

    async fn transfer(&self, step: &str, side: BridgeSide, params: &TransferParams) -> Result<StepOutcome> {
        let pair = self.enter(step, side)?;
        let local_chain = side.chain(&pair);
        let remote_chain = side.opposite().chain(&pair);

        let local_record = self.store.load(local_chain)?;
        let contract = parse_address(local_record.require(local_chain, side.contract_field())?)?;
        // the counterpart must exist for the message to land anywhere
        self.store
            .load(remote_chain)?
            .require(remote_chain, side.opposite().contract_field())?;
        let token = match side {
            BridgeSide::Adapter => Some(parse_address(
                local_record.require(local_chain, RecordField::Token)?,
            )?),
            BridgeSide::Representation => None,
        };

        let amount = parse_amount(&params.amount)?;
        let receiver = parse_address(&params.receiver)?;
        let pathway = self.resolver.resolve(local_chain, remote_chain)?;
        let options = send_options(params.max_gas, params.gas_drop, &params.receiver)?;

        let param = SendParam {
            dst_eid: pathway.remote_endpoint_id,
            to: left_pad_32(&receiver),
            amount_ld: amount,
            min_amount_ld: amount,
            extra_options: options.to_bytes(),
            compose_msg: Vec::new(),
            oft_cmd: Vec::new(),
        };

        info!(
            from = local_chain,
            to = remote_chain,
            dst_eid = param.dst_eid,
            %amount,
            receiver = ?receiver,
            gas_drop = params.gas_drop,
            max_gas = params.max_gas,
            "sending tokens"
        );

        let approve_tx = match token {
            Some(token) => {
                let tx = self
                    .transact(token, calls::approve(contract, amount), "approve")
                    .await?;
                info!(?tx, "approved");
                Some(tx)
            }
            None => None,
        };

        let quote = self
            .client
            .call(contract, calls::quote_send(&param, false))
            .await
            .map_err(|e| SetupError::from_client("quoteSend", e))?;
        let quoted = calls::decode_messaging_fee(&quote)?;
        info!(native_fee = %quoted.native_fee, "quoted fee");

        let fee = MessagingFee {
            native_fee: quoted.native_fee,
            lz_token_fee: U256::zero(),
        };
        let send_tx = self
            .client
            .send(
                contract,
                calls::send(&param, &fee, self.client.sender()),
                fee.native_fee,
            )
            .await
            .map_err(|e| SetupError::from_client("send", e))?;
        info!(tx = ?send_tx, "send submitted");

        let dst_tx = match self.tracker {
            Some(tracker) => {
                let delivered = tracker
                    .wait_for_delivery(send_tx, param.dst_eid)
                    .await
                    .map_err(|source| SetupError::Delivery {
                        src_tx: format!("{send_tx:?}"),
                        source,
                    })?;
                info!(dst_tx = ?delivered.dst_tx, network = remote_chain, "message delivered");
                Some(delivered.dst_tx)
            }
            None => None,
        };

        Ok(StepOutcome::Transferred(TransferReceipt {
            approve_tx,
            send_tx,
            native_fee: fee.native_fee,
            dst_eid: param.dst_eid,
            dst_tx,
        }))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn recorded(&self, chain: &str, field: RecordField) -> Result<Address> {
        let record = self.store.load(chain)?;
        Ok(parse_address(record.require(chain, field)?)?)
    }

    async fn transact(&self, to: Address, calldata: Vec<u8>, call: &str) -> Result<H256> {
        debug!(to = ?to, calldata = %hex::encode(&calldata), call, "sending transaction");
        let tx = self
            .client
            .send(to, calldata, U256::zero())
            .await
            .map_err(|e| SetupError::from_client(call, e))?;
        info!(?tx, call, "transaction confirmed");
        Ok(tx)
    }
}

/// Whole tokens to base units (18 decimals).
pub fn parse_amount(amount: &str) -> Result<U256> {
    parse_ether(amount).map_err(|e| SetupError::InvalidInput(format!("invalid amount {amount:?}: {e}")))
}
