//! oftb-setup
//!
//! Everything that touches a chain or a deployment record:
//!
//! 1. Per-network deployment records (`contracts.<network>.json`)
//! 2. Calldata for the OFT, ERC20 and endpoint calls the bridge needs
//! 3. A [`ChainClient`] seam with an ethers-backed implementation
//! 4. [`BridgeOps`], one method per bridge command
//! 5. [`OrchestrationRun`], the resumable two-chain setup sequence
//! 6. [`MessageTracker`], waiting for a transfer to land on the destination

use oftb_pathway::{describe_revert, PathwayError};
use thiserror::Error;

pub mod artifacts;
pub mod calls;
pub mod client;
pub mod evm;
pub mod ops;
pub mod record;
pub mod setup;
pub mod tracker;

pub use artifacts::{ArtifactLoader, ArtifactNames, ContractKind};
pub use client::{ChainClient, ClientError};
pub use evm::EvmChainClient;
pub use ops::{BridgeOps, BridgeSide, StepOutcome, TransferParams, TransferReceipt};
pub use record::{
    DeploymentRecord, DeploymentStore, FileDeploymentStore, MemoryDeploymentStore, RecordField,
};
pub use setup::{OrchestrationRun, RunStatus, SetupParams, SetupStep};
pub use tracker::{DeliveredMessage, MessageTracker, ScanTracker, TrackerError};

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Pathway(#[from] PathwayError),

    #[error("{step} must run on {expected}, active chain is {active}")]
    WrongChain {
        step: String,
        expected: String,
        active: String,
    },

    #[error("missing deployment: no {field} recorded for {chain}")]
    MissingDeployment { chain: String, field: RecordField },

    #[error("{call} failed: {reason}")]
    ProtocolCall { call: String, reason: String },

    #[error("deployment record error: {0}")]
    Record(String),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("client error: {0}")]
    Client(String),

    #[error("delivery of {src_tx} failed: {source}")]
    Delivery {
        src_tx: String,
        #[source]
        source: TrackerError,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SetupError {
    /// Attribute a client failure to the contract call that caused it.
    /// Reverts become [`SetupError::ProtocolCall`] with the decoded reason.
    pub fn from_client(call: &str, err: ClientError) -> Self {
        match err {
            ClientError::Reverted { data } => SetupError::ProtocolCall {
                call: call.to_string(),
                reason: if data.is_empty() {
                    "execution reverted without data".to_string()
                } else {
                    describe_revert(&data)
                },
            },
            ClientError::Transport(msg) => SetupError::Client(format!("{call}: {msg}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, SetupError>;
