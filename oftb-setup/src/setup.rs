//! Two-chain bridge setup sequence.
//!
//! ```text
//! DeployToken → DeployAdapter → AwaitRemoteRepresentation*
//!   → SetLocalPeer → AwaitRemotePeer*
//!   → SetLocalEnforcedOptions → AwaitRemoteEnforcedOptions*
//!   → SetLocalSecurityConfig → AwaitRemoteSecurityConfig*
//!   → TestTransfer → Done
//! ```
//!
//! Action steps run on the source chain. Checkpoints (`*`) stand for the
//! matching step on the target chain, which has to be run by a separate
//! invocation connected to that chain. [`OrchestrationRun::advance`] stops
//! at a checkpoint and returns [`RunStatus::Blocked`]; the caller resumes
//! with [`OrchestrationRun::confirm_checkpoint`] once the counterpart step
//! is done. Nothing polls the other chain.

use std::fmt;
use std::fs;
use std::path::Path;

use oftb_pathway::{PathwayResolver, DEFAULT_LZ_RECEIVE_GAS};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ops::{BridgeOps, BridgeSide, StepOutcome, TransferParams};
use crate::{Result, SetupError};

/// Name the counterpart commands are printed with.
pub const CLI_NAME: &str = "oftb";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupStep {
    DeployToken,
    DeployAdapter,
    AwaitRemoteRepresentation,
    SetLocalPeer,
    AwaitRemotePeer,
    SetLocalEnforcedOptions,
    AwaitRemoteEnforcedOptions,
    SetLocalSecurityConfig,
    AwaitRemoteSecurityConfig,
    TestTransfer,
    Done,
}

impl SetupStep {
    pub const ALL: [SetupStep; 11] = [
        SetupStep::DeployToken,
        SetupStep::DeployAdapter,
        SetupStep::AwaitRemoteRepresentation,
        SetupStep::SetLocalPeer,
        SetupStep::AwaitRemotePeer,
        SetupStep::SetLocalEnforcedOptions,
        SetupStep::AwaitRemoteEnforcedOptions,
        SetupStep::SetLocalSecurityConfig,
        SetupStep::AwaitRemoteSecurityConfig,
        SetupStep::TestTransfer,
        SetupStep::Done,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(Self::ALL.len() - 1)
    }

    /// The following step. `Done` is terminal.
    pub fn next(self) -> SetupStep {
        Self::ALL
            .get(self.index() + 1)
            .copied()
            .unwrap_or(SetupStep::Done)
    }

    pub fn is_checkpoint(self) -> bool {
        matches!(
            self,
            SetupStep::AwaitRemoteRepresentation
                | SetupStep::AwaitRemotePeer
                | SetupStep::AwaitRemoteEnforcedOptions
                | SetupStep::AwaitRemoteSecurityConfig
        )
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SetupStep::DeployToken => "deploy token",
            SetupStep::DeployAdapter => "deploy adapter",
            SetupStep::AwaitRemoteRepresentation => "await remote representation",
            SetupStep::SetLocalPeer => "set local peer",
            SetupStep::AwaitRemotePeer => "await remote peer",
            SetupStep::SetLocalEnforcedOptions => "set local enforced options",
            SetupStep::AwaitRemoteEnforcedOptions => "await remote enforced options",
            SetupStep::SetLocalSecurityConfig => "set local security config",
            SetupStep::AwaitRemoteSecurityConfig => "await remote security config",
            SetupStep::TestTransfer => "test transfer",
            SetupStep::Done => "done",
        };
        f.write_str(label)
    }
}

/// Inputs of a setup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupParams {
    pub token_name: String,
    pub token_symbol: String,
    /// Whole tokens
    pub token_supply: String,
    pub representation_name: String,
    pub representation_symbol: String,
    /// Whole tokens sent by the test transfer
    pub test_amount: String,
    pub receiver: String,
    #[serde(default = "default_max_gas")]
    pub max_gas: u128,
    #[serde(default)]
    pub gas_drop: u128,
}

fn default_max_gas() -> u128 {
    DEFAULT_LZ_RECEIVE_GAS
}

impl Default for SetupParams {
    fn default() -> Self {
        Self {
            token_name: "TestOPN".to_string(),
            token_symbol: "TSTOPN".to_string(),
            token_supply: "2200000".to_string(),
            representation_name: "TestOFT".to_string(),
            representation_symbol: "TOFT".to_string(),
            test_amount: "100".to_string(),
            receiver: "0x947226984c8008C16547c9Fe3b9EF5d84DF4Af55".to_string(),
            max_gas: DEFAULT_LZ_RECEIVE_GAS,
            gas_drop: 0,
        }
    }
}

impl SetupParams {
    pub fn transfer(&self) -> TransferParams {
        TransferParams {
            amount: self.test_amount.clone(),
            receiver: self.receiver.clone(),
            gas_drop: self.gas_drop,
            max_gas: self.max_gas,
        }
    }

    /// Command-line names of the parameters where `other` differs.
    pub fn differing(&self, other: &SetupParams) -> Vec<&'static str> {
        [
            ("token-name", self.token_name != other.token_name),
            ("token-symbol", self.token_symbol != other.token_symbol),
            ("token-supply", self.token_supply != other.token_supply),
            ("representation-name", self.representation_name != other.representation_name),
            ("representation-symbol", self.representation_symbol != other.representation_symbol),
            ("test-amount", self.test_amount != other.test_amount),
            ("receiver", !self.receiver.eq_ignore_ascii_case(&other.receiver)),
            ("max-gas", self.max_gas != other.max_gas),
            ("gas-drop", self.gas_drop != other.gas_drop),
        ]
        .into_iter()
        .filter_map(|(name, differs)| differs.then_some(name))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Waiting on the operator to run `command` on `chain`.
    Blocked {
        step: SetupStep,
        chain: String,
        command: String,
    },
    Done,
}

/// State of one setup run. Serializable so a blocked run can be resumed by
/// a later process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationRun {
    pub source_chain_id: String,
    pub target_chain_id: String,
    pub step: SetupStep,
    pub blocked: bool,
    pub params: SetupParams,
}

impl OrchestrationRun {
    /// Start a run from `active_chain`, which must be the source chain of
    /// its tier's pair.
    pub fn new(resolver: &PathwayResolver, active_chain: &str, params: SetupParams) -> Result<Self> {
        let pair = resolver.pair(active_chain)?;
        if !pair.is_source(active_chain) {
            return Err(SetupError::WrongChain {
                step: "run-setup".to_string(),
                expected: pair.source_chain_id,
                active: active_chain.to_string(),
            });
        }

        Ok(Self {
            source_chain_id: pair.source_chain_id,
            target_chain_id: pair.target_chain_id,
            step: SetupStep::DeployToken,
            blocked: false,
            params,
        })
    }

    pub fn step_index(&self) -> usize {
        self.step.index()
    }

    pub fn is_done(&self) -> bool {
        self.step == SetupStep::Done
    }

    /// Execute steps until a checkpoint or the end.
    ///
    /// A failing step leaves the run at that step; advancing again retries
    /// it. Deploy steps whose record field is already set are skipped.
    pub async fn advance(&mut self, ops: &BridgeOps<'_>) -> Result<RunStatus> {
        loop {
            if self.blocked {
                return Ok(self.blocked_status());
            }

            let step = self.step;
            if step == SetupStep::Done {
                return Ok(RunStatus::Done);
            }
            if step.is_checkpoint() {
                self.blocked = true;
                info!(%step, chain = %self.target_chain_id, "waiting for counterpart step");
                return Ok(self.blocked_status());
            }

            info!(%step, index = self.step_index(), chain = %self.source_chain_id, "running step");
            let outcome = self.execute(step, ops).await?;
            if let StepOutcome::AlreadySatisfied { field, address } = &outcome {
                info!(%step, %field, %address, "step already satisfied");
            }
            self.step = step.next();
        }
    }

    /// Release the pending checkpoint.
    pub fn confirm_checkpoint(&mut self) -> Result<()> {
        if !self.blocked {
            return Err(SetupError::InvalidInput(format!(
                "no checkpoint pending (current step: {})",
                self.step
            )));
        }
        info!(step = %self.step, "checkpoint confirmed");
        self.blocked = false;
        self.step = self.step.next();
        Ok(())
    }

    async fn execute(&self, step: SetupStep, ops: &BridgeOps<'_>) -> Result<StepOutcome> {
        let p = &self.params;
        match step {
            SetupStep::DeployToken => {
                ops.deploy_token(&p.token_name, &p.token_symbol, &p.token_supply)
                    .await
            }
            SetupStep::DeployAdapter => ops.deploy_adapter(None).await,
            SetupStep::SetLocalPeer => ops.set_local_peer().await,
            SetupStep::SetLocalEnforcedOptions => {
                ops.set_enforced_options(BridgeSide::Adapter, p.max_gas).await
            }
            SetupStep::SetLocalSecurityConfig => ops.set_security_config(BridgeSide::Adapter).await,
            SetupStep::TestTransfer => ops.send(&p.transfer()).await,
            SetupStep::AwaitRemoteRepresentation
            | SetupStep::AwaitRemotePeer
            | SetupStep::AwaitRemoteEnforcedOptions
            | SetupStep::AwaitRemoteSecurityConfig
            | SetupStep::Done => Err(SetupError::InvalidInput(format!("{step} is not an action step"))),
        }
    }

    fn blocked_status(&self) -> RunStatus {
        RunStatus::Blocked {
            step: self.step,
            chain: self.target_chain_id.clone(),
            command: self.counterpart_command(self.step).unwrap_or_default(),
        }
    }

    /// The command the operator runs on the target chain to satisfy
    /// checkpoint `step`.
    pub fn counterpart_command(&self, step: SetupStep) -> Option<String> {
        let network = &self.target_chain_id;
        let p = &self.params;
        let command = match step {
            SetupStep::AwaitRemoteRepresentation => format!(
                "{CLI_NAME} --network {network} deploy-representation --name \"{}\" --symbol \"{}\"",
                p.representation_name, p.representation_symbol
            ),
            SetupStep::AwaitRemotePeer => format!("{CLI_NAME} --network {network} set-remote-peer"),
            SetupStep::AwaitRemoteEnforcedOptions => format!(
                "{CLI_NAME} --network {network} set-enforced-options --side representation --max-gas {}",
                p.max_gas
            ),
            SetupStep::AwaitRemoteSecurityConfig => {
                format!("{CLI_NAME} --network {network} set-security-config --side representation")
            }
            _ => return None,
        };
        Some(command)
    }

    /// The command that bridges the test amount back once the run is done.
    pub fn send_back_command(&self) -> String {
        format!(
            "{CLI_NAME} --network {} send-back --amount {} --receiver {}",
            self.target_chain_id, self.params.test_amount, self.params.receiver
        )
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PERSISTENCE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Load a persisted run, if one exists at `path`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| SetupError::Record(format!("failed to read {}: {e}", path.display())))?;
        let run = serde_json::from_str(&contents)
            .map_err(|e| SetupError::Record(format!("failed to parse {}: {e}", path.display())))?;
        Ok(Some(run))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SetupError::Record(format!("failed to serialize run: {e}")))?;
        fs::write(path, json + "\n")
            .map_err(|e| SetupError::Record(format!("failed to write {}: {e}", path.display())))
    }
}
