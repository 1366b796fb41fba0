//! Drives the bridge operations and the setup run against an in-memory
//! chain client.

use std::fs;
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::types::{Address, H256, U256};
use oftb_pathway::{selector, PathwayResolver};
use oftb_setup::calls::{self, function_selector};
use oftb_setup::{
    ArtifactLoader, ArtifactNames, BridgeOps, BridgeSide, ChainClient, ClientError,
    DeliveredMessage, DeploymentRecord, DeploymentStore, MemoryDeploymentStore, MessageTracker,
    OrchestrationRun, RecordField, RunStatus, SetupError, SetupParams, SetupStep, StepOutcome,
    TrackerError,
};
use tempfile::TempDir;

const SEPOLIA: &str = "sepolia";
const ETHERLINK_TESTNET: &str = "etherlink-testnet";

const ADAPTER: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
const REPRESENTATION: &str = "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
const TOKEN: &str = "0xCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Recorded {
    Deploy(Vec<u8>),
    Send { to: Address, calldata: Vec<u8>, value: U256 },
    Call { to: Address, calldata: Vec<u8> },
}

struct RecordingClient {
    network: String,
    calls: Mutex<Vec<Recorded>>,
    quote: Result<Vec<u8>, ClientError>,
}

impl RecordingClient {
    fn new(network: &str) -> Self {
        Self {
            network: network.to_string(),
            calls: Mutex::new(Vec::new()),
            quote: Ok(abi::encode(&[Token::Uint(U256::from(1_000u32)), Token::Uint(U256::zero())])),
        }
    }

    fn with_quote_error(mut self, data: Vec<u8>) -> Self {
        self.quote = Err(ClientError::Reverted { data });
        self
    }

    fn recorded(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    fn sends(&self) -> Vec<(Address, Vec<u8>, U256)> {
        self.recorded()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Send { to, calldata, value } => Some((to, calldata, value)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChainClient for RecordingClient {
    fn network(&self) -> &str {
        &self.network
    }

    fn sender(&self) -> Address {
        Address::repeat_byte(0x5e)
    }

    async fn deploy(&self, init_code: Vec<u8>) -> Result<Address, ClientError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Recorded::Deploy(init_code));
        Ok(Address::repeat_byte(0x10 + calls.len() as u8))
    }

    async fn send(&self, to: Address, calldata: Vec<u8>, value: U256) -> Result<H256, ClientError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Recorded::Send { to, calldata, value });
        Ok(H256::repeat_byte(calls.len() as u8))
    }

    async fn call(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>, ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push(Recorded::Call { to, calldata });
        self.quote.clone()
    }
}

/// Reports every message as delivered, or as failed, and remembers what it
/// was asked about.
struct StubTracker {
    outcome: Result<H256, TrackerError>,
    asked: Mutex<Vec<(H256, u32)>>,
}

impl StubTracker {
    fn delivering(dst_tx: H256) -> Self {
        Self {
            outcome: Ok(dst_tx),
            asked: Mutex::new(Vec::new()),
        }
    }

    fn failing(err: TrackerError) -> Self {
        Self {
            outcome: Err(err),
            asked: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MessageTracker for StubTracker {
    async fn wait_for_delivery(
        &self,
        src_tx: H256,
        dst_eid: u32,
    ) -> Result<DeliveredMessage, TrackerError> {
        self.asked.lock().unwrap().push((src_tx, dst_eid));
        self.outcome.clone().map(|dst_tx| DeliveredMessage {
            src_tx,
            dst_eid,
            dst_tx,
        })
    }
}

fn artifacts() -> (TempDir, ArtifactLoader) {
    let dir = tempfile::tempdir().unwrap();
    for (name, code) in [("MyToken", "0x01"), ("MyOFTAdapter", "0x02"), ("MyOFT", "0x03")] {
        fs::write(
            dir.path().join(format!("{name}.json")),
            format!(r#"{{"bytecode": "{code}"}}"#),
        )
        .unwrap();
    }
    let loader = ArtifactLoader::new(dir.path(), ArtifactNames::default());
    (dir, loader)
}

fn record(field: RecordField, address: &str) -> DeploymentRecord {
    let mut record = DeploymentRecord::default();
    record.set(field, address);
    record
}

fn addr(hex: &str) -> Address {
    oftb_pathway::parse_address(hex).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_deploy_adapter_on_target_is_wrong_chain() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new().with_record(SEPOLIA, record(RecordField::Token, TOKEN));
    let before = store.snapshot();
    let client = RecordingClient::new(ETHERLINK_TESTNET);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    match ops.deploy_adapter(None).await {
        Err(SetupError::WrongChain { expected, active, .. }) => {
            assert_eq!(expected, SEPOLIA);
            assert_eq!(active, ETHERLINK_TESTNET);
        }
        other => panic!("expected WrongChain, got {other:?}"),
    }
    assert_eq!(store.snapshot(), before);
    assert!(client.recorded().is_empty());
}

#[tokio::test]
async fn test_remote_peer_on_source_is_wrong_chain() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new();
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    assert!(matches!(
        ops.set_remote_peer().await,
        Err(SetupError::WrongChain { .. })
    ));
    assert!(matches!(
        ops.send_back(&SetupParams::default().transfer()).await,
        Err(SetupError::WrongChain { .. })
    ));
    assert!(client.recorded().is_empty());
}

#[tokio::test]
async fn test_unknown_chain_fails_before_any_call() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new();
    let client = RecordingClient::new("polygon");
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    assert!(matches!(
        ops.deploy_token("T", "T", "1").await,
        Err(SetupError::Pathway(oftb_pathway::PathwayError::UnknownChain(_)))
    ));
    assert!(client.recorded().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEPLOYMENT
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_deploy_adapter_already_satisfied() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let mut existing = record(RecordField::Token, TOKEN);
    existing.set(RecordField::Adapter, ADAPTER);
    let store = MemoryDeploymentStore::new().with_record(SEPOLIA, existing.clone());
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    assert_eq!(
        ops.deploy_adapter(None).await.unwrap(),
        StepOutcome::AlreadySatisfied {
            field: RecordField::Adapter,
            address: ADAPTER.to_string(),
        }
    );
    assert!(client.recorded().is_empty());
    assert_eq!(store.load(SEPOLIA).unwrap(), existing);
}

#[tokio::test]
async fn test_deploy_adapter_writes_only_its_field() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new().with_record(SEPOLIA, record(RecordField::Token, TOKEN));
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    let outcome = ops.deploy_adapter(None).await.unwrap();
    let StepOutcome::Deployed { field, address } = outcome else {
        panic!("expected a deployment, got {outcome:?}");
    };
    assert_eq!(field, RecordField::Adapter);

    let stored = store.load(SEPOLIA).unwrap();
    assert_eq!(stored.token_address.as_deref(), Some(TOKEN));
    assert_eq!(addr(stored.adapter_address.as_deref().unwrap()), address);
    assert!(stored.representation_address.is_none());
    assert!(stored.endpoint_address.is_none());

    // bytecode then (token, endpoint, delegate)
    let recorded = client.recorded();
    let [Recorded::Deploy(init_code)] = recorded.as_slice() else {
        panic!("expected exactly one deployment");
    };
    assert_eq!(init_code[0], 0x02);
    let expected_args = calls::adapter_constructor(
        addr(TOKEN),
        addr("0x6EDCE65403992e310A62460808c4b910D972f10f"),
        Address::repeat_byte(0x5e),
    );
    assert_eq!(&init_code[1..], expected_args.as_slice());
}

#[tokio::test]
async fn test_deploy_adapter_without_token_is_missing_deployment() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new();
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    assert!(matches!(
        ops.deploy_adapter(None).await,
        Err(SetupError::MissingDeployment { field: RecordField::Token, .. })
    ));
    assert!(client.recorded().is_empty());
}

#[tokio::test]
async fn test_deploy_adapter_records_given_token() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new()
        .with_record(ETHERLINK_TESTNET, record(RecordField::Representation, REPRESENTATION));
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    ops.deploy_adapter(Some(TOKEN.to_lowercase().as_str())).await.unwrap();

    let source = store.load(SEPOLIA).unwrap();
    assert_eq!(addr(source.get(RecordField::Token).unwrap()), addr(TOKEN));
    assert!(source.get(RecordField::Adapter).is_some());

    // the token is now known to the transfer that follows
    let outcome = ops.send(&SetupParams::default().transfer()).await.unwrap();
    assert!(matches!(outcome, StepOutcome::Transferred(_)));
    assert_eq!(client.sends()[0].0, addr(TOKEN));
}

#[tokio::test]
async fn test_deploy_adapter_rejects_conflicting_token() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new().with_record(SEPOLIA, record(RecordField::Token, TOKEN));
    let before = store.snapshot();
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    assert!(matches!(
        ops.deploy_adapter(Some("0xDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDD")).await,
        Err(SetupError::InvalidInput(_))
    ));
    assert_eq!(store.snapshot(), before);
    assert!(client.recorded().is_empty());

    // the same token, in any case, is accepted
    ops.deploy_adapter(Some(TOKEN.to_lowercase().as_str())).await.unwrap();
    assert_eq!(client.recorded().len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATHWAY CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_local_peer_is_left_padded_representation() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new()
        .with_record(SEPOLIA, record(RecordField::Adapter, ADAPTER))
        .with_record(ETHERLINK_TESTNET, record(RecordField::Representation, REPRESENTATION));
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    ops.set_local_peer().await.unwrap();

    let sends = client.sends();
    assert_eq!(sends.len(), 1);
    let (to, calldata, value) = &sends[0];
    assert_eq!(*to, addr(ADAPTER));
    assert!(value.is_zero());
    assert_eq!(&calldata[..4], &function_selector(calls::SET_PEER));
    assert_eq!(U256::from_big_endian(&calldata[4..36]), U256::from(40239u32));

    let mut expected_peer = [0u8; 32];
    expected_peer[12..].copy_from_slice(&[0xbb; 20]);
    assert_eq!(&calldata[36..68], &expected_peer);
}

#[tokio::test]
async fn test_remote_peer_points_at_adapter() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new()
        .with_record(SEPOLIA, record(RecordField::Adapter, ADAPTER))
        .with_record(ETHERLINK_TESTNET, record(RecordField::Representation, REPRESENTATION));
    let client = RecordingClient::new(ETHERLINK_TESTNET);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    ops.set_remote_peer().await.unwrap();

    let (to, calldata, _) = &client.sends()[0];
    assert_eq!(*to, addr(REPRESENTATION));
    assert_eq!(U256::from_big_endian(&calldata[4..36]), U256::from(40161u32));
    assert_eq!(&calldata[48..68], &[0xaa; 20]);
}

#[tokio::test]
async fn test_peer_requires_counterpart_record() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new().with_record(SEPOLIA, record(RecordField::Adapter, ADAPTER));
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    match ops.set_local_peer().await {
        Err(SetupError::MissingDeployment { chain, field }) => {
            assert_eq!(chain, ETHERLINK_TESTNET);
            assert_eq!(field, RecordField::Representation);
        }
        other => panic!("expected MissingDeployment, got {other:?}"),
    }
    assert!(client.recorded().is_empty());
}

#[tokio::test]
async fn test_enforced_options_target_remote_eid() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new()
        .with_record(ETHERLINK_TESTNET, record(RecordField::Representation, REPRESENTATION));
    let client = RecordingClient::new(ETHERLINK_TESTNET);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    ops.set_enforced_options(BridgeSide::Representation, 200_000)
        .await
        .unwrap();

    let (to, calldata, _) = &client.sends()[0];
    assert_eq!(*to, addr(REPRESENTATION));
    let expected = calls::set_enforced_options(&[oftb_pathway::EnforcedOption::standard_send(
        40161, 200_000,
    )]);
    assert_eq!(calldata, &expected);
}

#[tokio::test]
async fn test_security_config_uses_local_endpoint_and_both_libraries() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new()
        .with_record(ETHERLINK_TESTNET, record(RecordField::Representation, REPRESENTATION));
    let client = RecordingClient::new(ETHERLINK_TESTNET);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    let outcome = ops.set_security_config(BridgeSide::Representation).await.unwrap();
    assert!(matches!(outcome, StepOutcome::Transactions(ref txs) if txs.len() == 2));

    let profile = resolver.lookup(ETHERLINK_TESTNET).unwrap();
    let config = oftb_pathway::encode_security_stack(profile).unwrap();
    let endpoint = addr(&profile.messaging_endpoint_address);

    let sends = client.sends();
    assert_eq!(sends.len(), 2);
    for ((to, calldata, _), library) in sends.iter().zip(profile.libraries()) {
        assert_eq!(*to, endpoint);
        assert_eq!(
            calldata,
            &calls::set_uln_config(addr(REPRESENTATION), addr(library), 40161, &config)
        );
    }
}

#[tokio::test]
async fn test_security_config_rejects_optional_verifiers_before_sending() {
    let mut profiles = oftb_pathway::default_profiles();
    for profile in profiles.iter_mut().filter(|p| p.chain_id == SEPOLIA) {
        profile.optional_verifiers = vec![ADAPTER.to_string()];
        profile.optional_verifier_threshold = 1;
    }
    let resolver = PathwayResolver::new(
        std::sync::Arc::new(oftb_pathway::ChainRegistry::new(profiles).unwrap()),
        std::sync::Arc::new(oftb_pathway::TierTable::default_table()),
    );
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new().with_record(SEPOLIA, record(RecordField::Adapter, ADAPTER));
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    assert!(matches!(
        ops.set_security_config(BridgeSide::Adapter).await,
        Err(SetupError::Pathway(oftb_pathway::PathwayError::Encoding(_)))
    ));
    assert!(client.recorded().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFERS
// ═══════════════════════════════════════════════════════════════════════════════

fn transfer_store() -> MemoryDeploymentStore {
    let mut source = record(RecordField::Token, TOKEN);
    source.set(RecordField::Adapter, ADAPTER);
    MemoryDeploymentStore::new()
        .with_record(SEPOLIA, source)
        .with_record(ETHERLINK_TESTNET, record(RecordField::Representation, REPRESENTATION))
}

#[tokio::test]
async fn test_send_approves_quotes_and_pays_fee() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = transfer_store();
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    let outcome = ops.send(&SetupParams::default().transfer()).await.unwrap();
    let StepOutcome::Transferred(receipt) = outcome else {
        panic!("expected a transfer, got {outcome:?}");
    };
    assert!(receipt.approve_tx.is_some());
    assert_eq!(receipt.native_fee, U256::from(1_000u32));
    assert_eq!(receipt.dst_eid, 40239);

    let recorded = client.recorded();
    assert_eq!(recorded.len(), 3);
    match &recorded[0] {
        Recorded::Send { to, calldata, .. } => {
            assert_eq!(*to, addr(TOKEN));
            assert_eq!(
                calldata,
                &calls::approve(addr(ADAPTER), U256::from(100u64) * U256::exp10(18))
            );
        }
        other => panic!("expected approve, got {other:?}"),
    }
    match &recorded[1] {
        Recorded::Call { to, calldata } => {
            assert_eq!(*to, addr(ADAPTER));
            assert_eq!(&calldata[..4], &function_selector(calls::QUOTE_SEND));
        }
        other => panic!("expected quoteSend, got {other:?}"),
    }
    match &recorded[2] {
        Recorded::Send { to, calldata, value } => {
            assert_eq!(*to, addr(ADAPTER));
            assert_eq!(&calldata[..4], &function_selector(calls::SEND));
            assert_eq!(*value, U256::from(1_000u32));
        }
        other => panic!("expected send, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_waits_for_delivery() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = transfer_store();
    let client = RecordingClient::new(SEPOLIA);
    let tracker = StubTracker::delivering(H256::repeat_byte(0xd5));
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client).with_tracker(&tracker);

    let outcome = ops.send(&SetupParams::default().transfer()).await.unwrap();
    let StepOutcome::Transferred(receipt) = outcome else {
        panic!("expected a transfer, got {outcome:?}");
    };
    assert_eq!(receipt.dst_tx, Some(H256::repeat_byte(0xd5)));
    assert_eq!(
        tracker.asked.lock().unwrap().as_slice(),
        &[(receipt.send_tx, 40239)]
    );
}

#[tokio::test]
async fn test_send_without_tracker_has_no_destination_tx() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = transfer_store();
    let client = RecordingClient::new(ETHERLINK_TESTNET);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    let outcome = ops.send_back(&SetupParams::default().transfer()).await.unwrap();
    let StepOutcome::Transferred(receipt) = outcome else {
        panic!("expected a transfer, got {outcome:?}");
    };
    assert_eq!(receipt.dst_tx, None);
}

#[tokio::test]
async fn test_failed_delivery_is_reported() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = transfer_store();
    let client = RecordingClient::new(ETHERLINK_TESTNET);
    let tracker = StubTracker::failing(TrackerError::Failed {
        status: "PAYLOAD_STORED".into(),
        reason: "lzReceive reverted".into(),
    });
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client).with_tracker(&tracker);

    match ops.send_back(&SetupParams::default().transfer()).await {
        Err(SetupError::Delivery { source, .. }) => {
            assert!(matches!(source, TrackerError::Failed { .. }));
        }
        other => panic!("expected Delivery, got {other:?}"),
    }
    assert_eq!(tracker.asked.lock().unwrap()[0].1, 40161);
}

#[tokio::test]
async fn test_send_back_skips_approval() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = transfer_store();
    let client = RecordingClient::new(ETHERLINK_TESTNET);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    let outcome = ops.send_back(&SetupParams::default().transfer()).await.unwrap();
    let StepOutcome::Transferred(receipt) = outcome else {
        panic!("expected a transfer, got {outcome:?}");
    };
    assert!(receipt.approve_tx.is_none());
    assert_eq!(receipt.dst_eid, 40161);
    assert_eq!(client.sends().len(), 1);
    assert_eq!(client.sends()[0].0, addr(REPRESENTATION));
}

#[tokio::test]
async fn test_quote_revert_is_decoded() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = transfer_store();
    let mut revert = selector("NoPeer(uint32)").to_vec();
    revert.extend(abi::encode(&[Token::Uint(U256::from(40239u32))]));
    let client = RecordingClient::new(SEPOLIA).with_quote_error(revert);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    match ops.send(&SetupParams::default().transfer()).await {
        Err(SetupError::ProtocolCall { call, reason }) => {
            assert_eq!(call, "quoteSend");
            assert_eq!(reason, "NoPeer(40239)");
        }
        other => panic!("expected ProtocolCall, got {other:?}"),
    }
    // approve went out, send did not
    assert_eq!(client.sends().len(), 1);
}

#[tokio::test]
async fn test_send_rejects_bad_receiver_before_any_call() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = transfer_store();
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    let mut params = SetupParams::default().transfer();
    params.receiver = "0x1234".to_string();
    assert!(ops.send(&params).await.is_err());

    params = SetupParams::default().transfer();
    params.amount = "a lot".to_string();
    assert!(matches!(ops.send(&params).await, Err(SetupError::InvalidInput(_))));

    assert!(client.recorded().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETUP RUN
// ═══════════════════════════════════════════════════════════════════════════════

fn expect_blocked(status: RunStatus, step: SetupStep) -> String {
    match status {
        RunStatus::Blocked {
            step: blocked_at,
            chain,
            command,
        } => {
            assert_eq!(blocked_at, step);
            assert_eq!(chain, ETHERLINK_TESTNET);
            command
        }
        RunStatus::Done => panic!("expected to block at {step}"),
    }
}

#[tokio::test]
async fn test_full_setup_run() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new();
    let source = RecordingClient::new(SEPOLIA);
    let target = RecordingClient::new(ETHERLINK_TESTNET);
    let source_ops = BridgeOps::new(&resolver, &store, &artifacts, &source);
    let target_ops = BridgeOps::new(&resolver, &store, &artifacts, &target);

    let mut run = OrchestrationRun::new(&resolver, SEPOLIA, SetupParams::default()).unwrap();

    let command = expect_blocked(
        run.advance(&source_ops).await.unwrap(),
        SetupStep::AwaitRemoteRepresentation,
    );
    assert!(command.contains("deploy-representation"));
    let sepolia = store.load(SEPOLIA).unwrap();
    assert!(sepolia.token_address.is_some());
    assert!(sepolia.adapter_address.is_some());

    // still blocked until confirmed
    expect_blocked(
        run.advance(&source_ops).await.unwrap(),
        SetupStep::AwaitRemoteRepresentation,
    );

    target_ops.deploy_representation("TestOFT", "TOFT").await.unwrap();
    run.confirm_checkpoint().unwrap();
    expect_blocked(run.advance(&source_ops).await.unwrap(), SetupStep::AwaitRemotePeer);

    target_ops.set_remote_peer().await.unwrap();
    run.confirm_checkpoint().unwrap();
    expect_blocked(
        run.advance(&source_ops).await.unwrap(),
        SetupStep::AwaitRemoteEnforcedOptions,
    );

    target_ops
        .set_enforced_options(BridgeSide::Representation, 200_000)
        .await
        .unwrap();
    run.confirm_checkpoint().unwrap();
    expect_blocked(
        run.advance(&source_ops).await.unwrap(),
        SetupStep::AwaitRemoteSecurityConfig,
    );

    target_ops
        .set_security_config(BridgeSide::Representation)
        .await
        .unwrap();
    run.confirm_checkpoint().unwrap();
    assert_eq!(run.advance(&source_ops).await.unwrap(), RunStatus::Done);
    assert!(run.is_done());

    let source_calls = source.recorded();
    let deploys = source_calls
        .iter()
        .filter(|c| matches!(c, Recorded::Deploy(_)))
        .count();
    // token, adapter
    assert_eq!(deploys, 2);
    // setPeer, setEnforcedOptions, setConfig x2, approve, send
    assert_eq!(source.sends().len(), 6);

    assert!(store.load(ETHERLINK_TESTNET).unwrap().representation_address.is_some());
}

#[tokio::test]
async fn test_rerun_skips_recorded_deployments() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let mut existing = record(RecordField::Token, TOKEN);
    existing.set(RecordField::Adapter, ADAPTER);
    let store = MemoryDeploymentStore::new().with_record(SEPOLIA, existing);
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    let mut run = OrchestrationRun::new(&resolver, SEPOLIA, SetupParams::default()).unwrap();
    expect_blocked(
        run.advance(&ops).await.unwrap(),
        SetupStep::AwaitRemoteRepresentation,
    );
    assert!(client.recorded().is_empty());
}

#[tokio::test]
async fn test_failed_step_stays_current() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let mut existing = record(RecordField::Token, TOKEN);
    existing.set(RecordField::Adapter, ADAPTER);
    let store = MemoryDeploymentStore::new().with_record(SEPOLIA, existing);
    let client = RecordingClient::new(SEPOLIA);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    let mut run = OrchestrationRun::new(&resolver, SEPOLIA, SetupParams::default()).unwrap();
    run.advance(&ops).await.unwrap();
    // confirm without the representation actually deployed
    run.confirm_checkpoint().unwrap();

    assert!(matches!(
        run.advance(&ops).await,
        Err(SetupError::MissingDeployment { field: RecordField::Representation, .. })
    ));
    assert_eq!(run.step, SetupStep::SetLocalPeer);
    assert!(!run.blocked);
}

#[tokio::test]
async fn test_run_on_target_chain_client_is_wrong_chain() {
    let resolver = PathwayResolver::with_defaults();
    let (_dir, artifacts) = artifacts();
    let store = MemoryDeploymentStore::new();
    let client = RecordingClient::new(ETHERLINK_TESTNET);
    let ops = BridgeOps::new(&resolver, &store, &artifacts, &client);

    let mut run = OrchestrationRun::new(&resolver, SEPOLIA, SetupParams::default()).unwrap();
    assert!(matches!(
        run.advance(&ops).await,
        Err(SetupError::WrongChain { .. })
    ));
    assert_eq!(run.step, SetupStep::DeployToken);
    assert!(store.snapshot().is_empty());
}
