//! oftb
//!
//! Deploys and wires an OFT adapter bridge between a source chain (canonical
//! token + adapter) and a target chain (representation), one chain per
//! invocation.

mod config;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::Signer;
use ethers::utils::format_ether;
use oftb_pathway::{
    encode_security_stack, ChainRegistry, EnforcedOption, PathwayResolver, TierTable,
    DEFAULT_LZ_RECEIVE_GAS,
};
use oftb_setup::{
    ArtifactLoader, ArtifactNames, BridgeOps, BridgeSide, EvmChainClient, FileDeploymentStore,
    OrchestrationRun, RunStatus, ScanTracker, SetupParams, StepOutcome, TransferParams,
};
use tracing::{info, warn};

use crate::config::ToolsConfig;

#[derive(Parser)]
#[command(
    name = "oftb",
    about = "Deploy and configure an OFT adapter bridge over LayerZero v2"
)]
struct Cli {
    /// Network to run against (ethereum, sepolia, etherlink-mainnet, etherlink-testnet).
    #[arg(long, global = true)]
    network: Option<String>,
    /// JSON file with chain profiles, replacing the built-in table.
    #[arg(long, global = true)]
    profiles: Option<PathBuf>,
    /// Directory holding contracts.<network>.json (default: $OFTB_RECORDS_DIR or .).
    #[arg(long, global = true)]
    records_dir: Option<PathBuf>,
    /// Directory holding compiled contract artifacts (default: $OFTB_ARTIFACTS_DIR or artifacts).
    #[arg(long, global = true)]
    artifacts_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the canonical token on the source chain.
    DeployToken(DeployTokenArgs),
    /// Deploy the adapter on the source chain.
    DeployAdapter(DeployAdapterArgs),
    /// Deploy the representation on the target chain.
    DeployRepresentation(DeployRepresentationArgs),
    /// Register the representation as the adapter's peer (source chain).
    SetLocalPeer,
    /// Register the adapter as the representation's peer (target chain).
    SetRemotePeer,
    /// Enforce lzReceive gas on sends from one side.
    SetEnforcedOptions(EnforcedOptionsArgs),
    /// Apply the security stack to the send and receive libraries.
    SetSecurityConfig(SideArgs),
    /// Bridge tokens from the source chain.
    Send(TransferArgs),
    /// Bridge tokens back from the target chain.
    SendBack(TransferArgs),
    /// Run the whole setup from the source chain, pausing for target-chain steps.
    RunSetup(RunSetupArgs),
    /// Print the resolved pathway and encoded config without touching a chain.
    ShowPathway(ShowPathwayArgs),
    /// Print the signing account and its balance on the network.
    Accounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Side {
    /// The adapter, on the source chain.
    Adapter,
    /// The representation, on the target chain.
    Representation,
}

impl From<Side> for BridgeSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Adapter => BridgeSide::Adapter,
            Side::Representation => BridgeSide::Representation,
        }
    }
}

#[derive(Args)]
struct DeployTokenArgs {
    #[arg(long, default_value = "TestOPN")]
    name: String,
    #[arg(long, default_value = "TSTOPN")]
    symbol: String,
    /// Initial supply in whole tokens.
    #[arg(long, default_value = "2200000")]
    supply: String,
}

#[derive(Args)]
struct DeployAdapterArgs {
    /// Token address; defaults to the recorded token.
    #[arg(long)]
    token: Option<String>,
}

#[derive(Args)]
struct DeployRepresentationArgs {
    #[arg(long, default_value = "TestOFT")]
    name: String,
    #[arg(long, default_value = "TOFT")]
    symbol: String,
}

#[derive(Args)]
struct SideArgs {
    #[arg(long, value_enum)]
    side: Side,
}

#[derive(Args)]
struct EnforcedOptionsArgs {
    #[arg(long, value_enum)]
    side: Side,
    /// Gas for lzReceive on the destination.
    #[arg(long, default_value_t = DEFAULT_LZ_RECEIVE_GAS)]
    max_gas: u128,
}

#[derive(Args)]
struct TransferArgs {
    /// Amount in whole tokens.
    #[arg(long)]
    amount: String,
    /// Receiver on the destination chain.
    #[arg(long)]
    receiver: String,
    /// Native wei dropped on the receiver at the destination.
    #[arg(long, default_value_t = 0)]
    gas_drop: u128,
    /// Gas for lzReceive on the destination.
    #[arg(long, default_value_t = DEFAULT_LZ_RECEIVE_GAS)]
    max_gas: u128,
    /// Return once the send is mined instead of waiting for delivery.
    #[arg(long)]
    no_wait: bool,
}

impl From<TransferArgs> for TransferParams {
    fn from(args: TransferArgs) -> Self {
        TransferParams {
            amount: args.amount,
            receiver: args.receiver,
            gas_drop: args.gas_drop,
            max_gas: args.max_gas,
        }
    }
}

#[derive(Args)]
struct RunSetupArgs {
    #[arg(long, default_value = "TestOPN")]
    token_name: String,
    #[arg(long, default_value = "TSTOPN")]
    token_symbol: String,
    #[arg(long, default_value = "2200000")]
    token_supply: String,
    #[arg(long, default_value = "TestOFT")]
    representation_name: String,
    #[arg(long, default_value = "TOFT")]
    representation_symbol: String,
    #[arg(long, default_value = "100")]
    test_amount: String,
    #[arg(long, default_value = "0x947226984c8008C16547c9Fe3b9EF5d84DF4Af55")]
    receiver: String,
    #[arg(long, default_value_t = DEFAULT_LZ_RECEIVE_GAS)]
    max_gas: u128,
    #[arg(long, default_value_t = 0)]
    gas_drop: u128,
    /// Mark the pending checkpoint as done before continuing.
    #[arg(long)]
    confirm_checkpoint: bool,
    /// Discard any persisted run and start over.
    #[arg(long)]
    reset: bool,
    /// Exit at a checkpoint instead of waiting for Enter.
    #[arg(long)]
    no_prompt: bool,
}

impl RunSetupArgs {
    fn params(&self) -> SetupParams {
        SetupParams {
            token_name: self.token_name.clone(),
            token_symbol: self.token_symbol.clone(),
            token_supply: self.token_supply.clone(),
            representation_name: self.representation_name.clone(),
            representation_symbol: self.representation_symbol.clone(),
            test_amount: self.test_amount.clone(),
            receiver: self.receiver.clone(),
            max_gas: self.max_gas,
            gas_drop: self.gas_drop,
        }
    }
}

#[derive(Args)]
struct ShowPathwayArgs {
    /// Remote chain; defaults to the counterpart in the network's pair.
    #[arg(long)]
    remote: Option<String>,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oftb=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let mut config = ToolsConfig::from_env();

    let cli = Cli::parse();
    if let Some(dir) = cli.records_dir {
        config.records_dir = dir;
    }
    if let Some(dir) = cli.artifacts_dir {
        config.artifacts_dir = dir;
    }

    let resolver = load_resolver(cli.profiles.as_deref())?;
    let network = cli
        .network
        .context("--network is required")?;

    if let Commands::ShowPathway(args) = &cli.command {
        return show_pathway(&resolver, &network, args);
    }

    if let Commands::Accounts = &cli.command {
        return accounts(&config, &network).await;
    }

    let store = FileDeploymentStore::new(&config.records_dir);
    let artifacts = ArtifactLoader::new(&config.artifacts_dir, ArtifactNames::default());
    let client = EvmChainClient::connect(&network, &config.rpc_url(&network)?, config.wallet()?)
        .await
        .with_context(|| format!("failed to connect to {network}"))?;
    let tracker = ScanTracker::for_tier(resolver.classify(&network)?);
    let wait_for_delivery = match &cli.command {
        Commands::Send(args) | Commands::SendBack(args) => !args.no_wait,
        _ => true,
    };
    let mut ops = BridgeOps::new(&resolver, &store, &artifacts, &client);
    if wait_for_delivery {
        ops = ops.with_tracker(&tracker);
    }

    let outcome = match cli.command {
        Commands::DeployToken(args) => ops.deploy_token(&args.name, &args.symbol, &args.supply).await?,
        Commands::DeployAdapter(args) => ops.deploy_adapter(args.token.as_deref()).await?,
        Commands::DeployRepresentation(args) => {
            ops.deploy_representation(&args.name, &args.symbol).await?
        }
        Commands::SetLocalPeer => ops.set_local_peer().await?,
        Commands::SetRemotePeer => ops.set_remote_peer().await?,
        Commands::SetEnforcedOptions(args) => {
            ops.set_enforced_options(args.side.into(), args.max_gas).await?
        }
        Commands::SetSecurityConfig(args) => ops.set_security_config(args.side.into()).await?,
        Commands::Send(args) => ops.send(&args.into()).await?,
        Commands::SendBack(args) => ops.send_back(&args.into()).await?,
        Commands::RunSetup(args) => return run_setup(&ops, &resolver, &config.records_dir, &network, args).await,
        Commands::ShowPathway(_) | Commands::Accounts => return Ok(()),
    };

    report(&network, &outcome);
    Ok(())
}

fn load_resolver(profiles: Option<&Path>) -> Result<PathwayResolver> {
    let Some(path) = profiles else {
        return Ok(PathwayResolver::with_defaults());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let registry = ChainRegistry::from_json(&json)
        .with_context(|| format!("invalid profile table {}", path.display()))?;
    info!(path = %path.display(), chains = registry.len(), "loaded chain profiles");
    Ok(PathwayResolver::new(
        Arc::new(registry),
        Arc::new(TierTable::default_table()),
    ))
}

fn report(network: &str, outcome: &StepOutcome) {
    match outcome {
        StepOutcome::Deployed { field, address } => {
            println!("Deployed on {network}: {field} = {address:?}");
        }
        StepOutcome::Transactions(txs) => {
            for tx in txs {
                println!("Transaction confirmed on {network}: {tx:?}");
            }
        }
        StepOutcome::Transferred(receipt) => {
            if let Some(tx) = receipt.approve_tx {
                println!("Approval transaction: {tx:?}");
            }
            println!("Native fee paid: {} wei", receipt.native_fee);
            println!("Send transaction: {:?}", receipt.send_tx);
            println!("Destination eid: {}", receipt.dst_eid);
            if let Some(tx) = receipt.dst_tx {
                println!("Message delivered! Destination transaction: {tx:?}");
            }
        }
        StepOutcome::AlreadySatisfied { field, address } => {
            println!("Nothing to do on {network}: {field} already recorded as {address}");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUN SETUP
// ═══════════════════════════════════════════════════════════════════════════════

async fn run_setup(
    ops: &BridgeOps<'_>,
    resolver: &PathwayResolver,
    records_dir: &Path,
    network: &str,
    args: RunSetupArgs,
) -> Result<()> {
    fs::create_dir_all(records_dir)
        .with_context(|| format!("failed to create {}", records_dir.display()))?;
    let path = records_dir.join(format!("setup-run.{network}.json"));

    if args.reset && path.exists() {
        fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
        info!(path = %path.display(), "discarded persisted run");
    }

    let mut run = match OrchestrationRun::load(&path)? {
        Some(run) => {
            info!(step = %run.step, "resuming persisted run");
            let ignored = run.params.differing(&args.params());
            if !ignored.is_empty() {
                warn!(
                    path = %path.display(),
                    ignored = %ignored.join(", "),
                    "persisted run keeps its original parameters, pass --reset to use the new ones"
                );
            }
            run
        }
        None => OrchestrationRun::new(resolver, network, args.params())?,
    };

    println!("\n=== Bridge setup ===");
    println!("Environment: {}", resolver.classify(network)?);
    println!("Source network: {}", run.source_chain_id);
    println!("Target network: {}", run.target_chain_id);

    if args.confirm_checkpoint {
        run.confirm_checkpoint()?;
        run.save(&path)?;
    }

    loop {
        let status = run.advance(ops).await;
        run.save(&path)?;

        match status? {
            RunStatus::Done => {
                println!("\n=== Bridge setup complete ===");
                println!("To send tokens back from the target chain, use:");
                println!("  {}", run.send_back_command());
                return Ok(());
            }
            RunStatus::Blocked {
                step,
                chain,
                command,
            } => {
                println!("\n=== {step} ===");
                println!("Run the following on {chain}:");
                println!("  {command}");

                if args.no_prompt {
                    println!("Then resume with:");
                    println!("  oftb --network {network} run-setup --confirm-checkpoint");
                    return Ok(());
                }

                print!("Press Enter once it has completed...");
                io::stdout().flush()?;
                let mut line = String::new();
                io::stdin().lock().read_line(&mut line)?;

                run.confirm_checkpoint()?;
                run.save(&path)?;
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNTS
// ═══════════════════════════════════════════════════════════════════════════════

async fn accounts(config: &ToolsConfig, network: &str) -> Result<()> {
    let wallet = config.wallet()?;
    let url = config.rpc_url(network)?;
    let provider = Provider::<Http>::try_from(url.as_str())
        .with_context(|| format!("invalid RPC URL {url}"))?;
    let balance = provider
        .get_balance(wallet.address(), None)
        .await
        .with_context(|| format!("failed to fetch balance on {network}"))?;

    println!("Address: {:?}", wallet.address());
    match config.derivation_path() {
        Some(path) => println!("Path:    {path}"),
        None => println!("Path:    (private key)"),
    }
    println!("Balance: {} ETH on {network}", format_ether(balance));
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHOW PATHWAY
// ═══════════════════════════════════════════════════════════════════════════════

fn show_pathway(resolver: &PathwayResolver, network: &str, args: &ShowPathwayArgs) -> Result<()> {
    let tier = resolver.classify(network)?;
    let pair = resolver.pair(network)?;
    let pathway = match &args.remote {
        Some(remote) => resolver.resolve(network, remote)?,
        None => resolver.resolve_to_counterpart(network)?,
    };
    let security_config = encode_security_stack(&pathway.local)?;
    let enforced = EnforcedOption::standard_send(pathway.remote_endpoint_id, DEFAULT_LZ_RECEIVE_GAS);

    if args.json {
        let out = serde_json::json!({
            "tier": tier,
            "pair": pair,
            "pathway": pathway,
            "securityConfig": format!("0x{}", hex::encode(&security_config)),
            "enforcedOptions": [enforced],
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Network:          {network}");
    println!("Environment:      {tier}");
    println!("Source network:   {}", pair.source_chain_id);
    println!("Target network:   {}", pair.target_chain_id);
    println!("Local eid:        {}", pathway.local_endpoint_id());
    println!("Remote eid:       {}", pathway.remote_endpoint_id);
    println!("Endpoint:         {}", pathway.local.messaging_endpoint_address);
    println!("Send library:     {}", pathway.local.send_library_address);
    println!("Receive library:  {}", pathway.local.receive_library_address);
    println!("Required DVNs:    {}", pathway.local.required_verifiers.join(", "));
    println!("Confirmations:    {}", pathway.local.required_confirmations);
    println!("Security config:  0x{}", hex::encode(&security_config));
    println!("Enforced options: 0x{}", hex::encode(&enforced.options));
    Ok(())
}
