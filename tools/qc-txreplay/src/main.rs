//! QC-TxReplay: Quantum-Chain Transaction Replay
//!
//! Replays an exported transaction log:
//!
//! - `tximport`: resubmit every transaction to a node over JSON-RPC
//! - `ledgerimport`: rebuild the transactions into signed blocks on a local ledger
//! - `walletnew`: create an encrypted bookkeeper wallet for `ledgerimport`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use qc_txreplay::adapters::{
    load_wallets, CompressionScheme, JsonRpcClient, LocalCommitDispatcher, LocalLedger,
    RemoteDispatcher, WalletFile,
};
use qc_txreplay::config::{DEFAULT_EXPORT_FILE, DEFAULT_LEDGER_DIR, DEFAULT_WALLETS_FILE};
use qc_txreplay::domain::{build_genesis_block, DEFAULT_GENESIS_TIMESTAMP};
use qc_txreplay::ports::{ChainState, RemoteSubmitter};
use qc_txreplay::{ReplayConfig, ReplayDriver, ReplaySummary, WalletsConfig};
use shared_crypto::Ed25519KeyPair;

/// QC-TxReplay: Quantum-Chain transaction replay tool
#[derive(Parser, Debug)]
#[command(name = "qc-txreplay")]
#[command(about = "Replay exported transactions over JSON-RPC or into a local ledger")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resubmit exported transactions to a node over JSON-RPC
    Tximport {
        /// Export file to replay
        #[arg(long = "importtxsfile", alias = "file", default_value = DEFAULT_EXPORT_FILE)]
        file: PathBuf,

        /// Node host (overrides QC_TXREPLAY_IP)
        #[arg(long)]
        ip: Option<String>,

        /// Node JSON-RPC port (overrides QC_TXREPLAY_RPC_PORT)
        #[arg(long)]
        rpcport: Option<u16>,

        /// Number of submission workers
        #[arg(long, default_value_t = qc_txreplay::DEFAULT_WORKERS)]
        routines: usize,

        /// Delay between submissions of one worker, in milliseconds
        #[arg(long, default_value_t = qc_txreplay::DEFAULT_DELAY_MS)]
        timer: u64,
    },

    /// Rebuild exported transactions into signed blocks on a local ledger
    Ledgerimport {
        /// Export file to replay
        #[arg(long, default_value = DEFAULT_EXPORT_FILE)]
        file: PathBuf,

        /// Bookkeeper wallet list
        #[arg(long, default_value = DEFAULT_WALLETS_FILE)]
        wallets: PathBuf,

        /// Ledger data directory
        #[arg(long, default_value = DEFAULT_LEDGER_DIR)]
        datadir: PathBuf,

        /// Archive of the rebuilt chain (default: <datadir>/replay.qcba)
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Archive compression (none, zstd)
        #[arg(long, default_value_t = CompressionScheme::Zstd)]
        compression: CompressionScheme,

        /// Delay between blocks, in milliseconds
        #[arg(long, default_value_t = qc_txreplay::DEFAULT_DELAY_MS)]
        timer: u64,
    },

    /// Create an encrypted bookkeeper wallet
    Walletnew {
        /// Wallet file to create
        #[arg(long)]
        path: PathBuf,

        /// Bookkeeper label
        #[arg(long)]
        label: String,

        /// Wallet password
        #[arg(long, env = "QC_TXREPLAY_WALLET_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Args::parse().command {
        Command::Tximport {
            file,
            ip,
            rpcport,
            routines,
            timer,
        } => {
            let mut config = ReplayConfig {
                input: file,
                delay: Duration::from_millis(timer),
                ..Default::default()
            };
            config.rpc.apply_env_overrides();
            if let Some(ip) = ip {
                config.rpc.host = ip;
            }
            if let Some(port) = rpcport {
                config.rpc.port = port;
            }
            config.pool.workers = routines;
            run_rpc(config).await?;
        }
        Command::Ledgerimport {
            file,
            wallets,
            datadir,
            archive,
            compression,
            timer,
        } => {
            let mut config = ReplayConfig {
                input: file,
                delay: Duration::from_millis(timer),
                ..Default::default()
            };
            config.ledger.wallets_file = wallets;
            config.ledger.data_dir = datadir;
            config.ledger.archive_path = archive;
            config.ledger.compression = compression;
            run_direct(config).await?;
        }
        Command::Walletnew {
            path,
            label,
            password,
        } => new_wallet(&path, &label, &password)?,
    }
    Ok(())
}

async fn run_rpc(config: ReplayConfig) -> Result<ReplaySummary> {
    config.validate().context("Invalid configuration")?;
    info!(
        "[qc-txreplay] Target node {} ({} workers, {:?} delay)",
        config.rpc.endpoint(),
        config.pool.workers,
        config.delay
    );

    let client: Arc<dyn RemoteSubmitter> =
        Arc::new(JsonRpcClient::new(&config.rpc).context("Failed to create RPC client")?);
    let dispatcher = RemoteDispatcher::start(&config.pool, config.delay, client)
        .await
        .context("Failed to start worker pool")?;

    let mut driver = ReplayDriver::new(dispatcher, config.delay);
    let summary = driver
        .run_file(&config.input)
        .await
        .with_context(|| format!("Replay of {} failed", config.input.display()))?;
    Ok(summary)
}

async fn run_direct(config: ReplayConfig) -> Result<ReplaySummary> {
    config.validate().context("Invalid configuration")?;

    let wallets = WalletsConfig::load(&config.ledger.wallets_file)
        .context("Failed to read wallet list")?;
    let signers = load_wallets(&wallets).context("Failed to unlock wallets")?;
    let bookkeepers: Vec<_> = signers.iter().map(|s| s.public_key()).collect();

    let genesis = build_genesis_block(&bookkeepers, DEFAULT_GENESIS_TIMESTAMP);
    let ledger = LocalLedger::open(&config.ledger.data_dir, genesis).with_context(|| {
        format!("Failed to open ledger at {}", config.ledger.data_dir.display())
    })?;
    info!(
        "[qc-txreplay] Ledger at height {} with {} bookkeepers",
        ledger.current_height(),
        signers.len()
    );

    let dispatcher = LocalCommitDispatcher::new(ledger, signers, config.ledger.archive_path())
        .with_compression(config.ledger.compression);

    let mut driver = ReplayDriver::new(dispatcher, config.delay);
    let summary = driver
        .run_file(&config.input)
        .await
        .with_context(|| format!("Replay of {} failed", config.input.display()))?;
    Ok(summary)
}

fn new_wallet(path: &Path, label: &str, password: &str) -> Result<()> {
    let keypair = Ed25519KeyPair::generate();
    let wallet = WalletFile::seal(label, &keypair, password).context("Failed to seal wallet")?;
    wallet
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(
        "[qc-txreplay] 🔑 Created wallet {} ({}) at {}",
        wallet.label,
        wallet.public_key,
        path.display()
    );
    Ok(())
}
