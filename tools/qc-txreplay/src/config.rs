//! Configuration types for the replay engine

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::adapters::compression::CompressionScheme;
use crate::error::{ConfigError, WalletError};

/// Default export file path.
pub const DEFAULT_EXPORT_FILE: &str = "./txs.dat";

/// Default wallet list path.
pub const DEFAULT_WALLETS_FILE: &str = "./wallets.json";

/// Default ledger directory.
pub const DEFAULT_LEDGER_DIR: &str = "./Chain/replay";

/// Archive file name inside the ledger directory.
pub const DEFAULT_ARCHIVE_FILE: &str = "replay.qcba";

/// Runtime configuration for one replay run
#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// Export file to replay
    pub input: PathBuf,

    /// Delay charged between batches, and between submissions of one worker
    pub delay: Duration,

    /// Remote node (RPC mode)
    pub rpc: RpcConfig,

    /// Submission workers (RPC mode)
    pub pool: PoolConfig,

    /// Local ledger (direct mode)
    pub ledger: LedgerConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_EXPORT_FILE),
            delay: Duration::from_millis(crate::DEFAULT_DELAY_MS),
            rpc: RpcConfig::default(),
            pool: PoolConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl ReplayConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.as_os_str().is_empty() {
            return Err(ConfigError::new("input", "missing export file path"));
        }
        self.rpc.validate()?;
        self.pool.validate()?;
        self.ledger.validate()
    }
}

/// JSON-RPC endpoint of the node transactions are resubmitted to
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// Node host name or IP
    pub host: String,

    /// Node JSON-RPC port
    pub port: u16,

    /// Whole-request timeout
    pub timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: crate::DEFAULT_RPC_PORT,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl RpcConfig {
    /// `http://<host>:<port>`
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Apply `QC_TXREPLAY_IP` / `QC_TXREPLAY_RPC_PORT` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("QC_TXREPLAY_IP") {
            if !host.trim().is_empty() {
                info!("[qc-txreplay] Node host from environment: {}", host);
                self.host = host.trim().to_string();
            }
        }
        if let Some(port) = lookup("QC_TXREPLAY_RPC_PORT") {
            match port.trim().parse() {
                Ok(p) => self.port = p,
                Err(_) => warn!("[qc-txreplay] Ignoring invalid QC_TXREPLAY_RPC_PORT: {}", port),
            }
        }
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::new("rpc.host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(ConfigError::new("rpc.port", "must be non-zero"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::new("rpc.timeout", "must be non-zero"));
        }
        Ok(())
    }
}

/// Submission worker pool settings
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of workers
    pub workers: usize,

    /// Capacity of each worker queue
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: crate::DEFAULT_WORKERS,
            queue_capacity: crate::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::new("pool.workers", "at least one worker is required"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::new("pool.queue_capacity", "must be non-zero"));
        }
        Ok(())
    }
}

/// Local ledger settings (direct mode)
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Directory holding the block log
    pub data_dir: PathBuf,

    /// Wallet list (`wallets.json`)
    pub wallets_file: PathBuf,

    /// Archive location override; defaults to `<data_dir>/replay.qcba`
    pub archive_path: Option<PathBuf>,

    /// Archive compression
    pub compression: CompressionScheme,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_LEDGER_DIR),
            wallets_file: PathBuf::from(DEFAULT_WALLETS_FILE),
            archive_path: None,
            compression: CompressionScheme::default(),
        }
    }
}

impl LedgerConfig {
    /// Where the post-replay archive of the whole chain is written.
    pub fn archive_path(&self) -> PathBuf {
        self.archive_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_ARCHIVE_FILE))
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::new("ledger.data_dir", "must not be empty"));
        }
        if self.wallets_file.as_os_str().is_empty() {
            return Err(ConfigError::new("ledger.wallets_file", "must not be empty"));
        }
        Ok(())
    }
}

/// One entry of the wallet list
#[derive(Clone, Debug, Deserialize)]
pub struct WalletEntry {
    /// Wallet file path
    #[serde(rename = "Path")]
    pub path: PathBuf,

    /// Wallet password
    #[serde(rename = "Password")]
    pub password: String,
}

/// Wallet list: `{"Wallets":[{"Path":"...","Password":"..."}]}`
#[derive(Clone, Debug, Deserialize)]
pub struct WalletsConfig {
    /// Bookkeeper wallets, in signing order
    #[serde(rename = "Wallets")]
    pub wallets: Vec<WalletEntry>,
}

impl WalletsConfig {
    /// Load the wallet list. Relative wallet paths resolve against the list's directory.
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let data = std::fs::read(path).map_err(|source| WalletError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::parse(&data).map_err(|reason| WalletError::Parse {
            path: path.display().to_string(),
            reason,
        })?;

        if let Some(base) = path.parent() {
            for entry in &mut config.wallets {
                if entry.path.is_relative() {
                    entry.path = base.join(&entry.path);
                }
            }
        }
        Ok(config)
    }

    /// Parse the wallet list JSON (a UTF-8 BOM is tolerated).
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        let data = data.strip_prefix(b"\xef\xbb\xbf").unwrap_or(data);
        serde_json::from_slice(data).map_err(|e| e.to_string())
    }
}
