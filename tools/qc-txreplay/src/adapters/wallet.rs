//! # Bookkeeper Wallets
//!
//! A wallet file holds one Ed25519 seed sealed with XChaCha20-Poly1305 under a
//! key stretched from the wallet password with scrypt:
//!
//! ```json
//! {"label":"bk-1","public_key":"<hex>","kdf":{"log_n":18,"r":8,"p":1},
//!  "salt":"<hex>","nonce":"<hex>","ciphertext":"<hex>"}
//! ```

use std::path::Path;
use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use shared_crypto::{
    open, scrypt_derive_key, seal, Ed25519KeyPair, SealedBox, SecretKey, SCRYPT_LOG_N, SCRYPT_P,
    SCRYPT_R,
};
use shared_types::{PublicKey, Signature};
use tracing::info;

use crate::config::WalletsConfig;
use crate::error::{SignerError, WalletError};
use crate::ports::BlockSigner;

const SALT_LEN: usize = 32;

/// scrypt cost parameters recorded in a wallet file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// CPU/memory cost as log2(N)
    pub log_n: u8,
    /// Block size
    pub r: u32,
    /// Parallelization
    pub p: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            log_n: SCRYPT_LOG_N,
            r: SCRYPT_R,
            p: SCRYPT_P,
        }
    }
}

impl KdfParams {
    fn derive(&self, label: &str, salt: &[u8], password: &str) -> Result<SecretKey, WalletError> {
        scrypt_derive_key(password, salt, self.log_n, self.r, self.p).map_err(|source| {
            WalletError::Crypto {
                label: label.to_string(),
                source,
            }
        })
    }
}

/// On-disk wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletFile {
    /// Signer label
    pub label: String,
    /// Ed25519 public key, hex
    pub public_key: String,
    /// Password stretching parameters
    pub kdf: KdfParams,
    /// KDF salt, hex
    pub salt: String,
    /// XChaCha20 nonce, hex
    pub nonce: String,
    /// Sealed seed, hex
    pub ciphertext: String,
}

impl WalletFile {
    /// Seal `keypair` under `password` with the default scrypt cost.
    pub fn seal(
        label: impl Into<String>,
        keypair: &Ed25519KeyPair,
        password: &str,
    ) -> Result<Self, WalletError> {
        Self::seal_with_kdf(label, keypair, password, KdfParams::default())
    }

    /// Seal `keypair` under `password` with explicit scrypt parameters.
    pub fn seal_with_kdf(
        label: impl Into<String>,
        keypair: &Ed25519KeyPair,
        password: &str,
        kdf: KdfParams,
    ) -> Result<Self, WalletError> {
        let label = label.into();
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let key = kdf.derive(&label, &salt, password)?;
        let sealed = seal(&key, keypair.seed().as_slice()).map_err(|source| {
            WalletError::Crypto {
                label: label.clone(),
                source,
            }
        })?;

        Ok(Self {
            label,
            public_key: hex::encode(keypair.public_key()),
            kdf,
            salt: hex::encode(salt),
            nonce: hex::encode(sealed.nonce),
            ciphertext: hex::encode(sealed.ciphertext),
        })
    }

    /// Recover the key pair with `password`.
    pub fn unlock(&self, password: &str) -> Result<Ed25519KeyPair, WalletError> {
        let field = |name: &str, value: &str| {
            hex::decode(value).map_err(|e| WalletError::Parse {
                path: self.label.clone(),
                reason: format!("{name}: {e}"),
            })
        };
        let salt = field("salt", &self.salt)?;
        let nonce: [u8; 24] =
            field("nonce", &self.nonce)?
                .try_into()
                .map_err(|_| WalletError::Parse {
                    path: self.label.clone(),
                    reason: "nonce must be 24 bytes".to_string(),
                })?;
        let sealed = SealedBox {
            nonce,
            ciphertext: field("ciphertext", &self.ciphertext)?,
        };

        let crypto_err = |source| WalletError::Crypto {
            label: self.label.clone(),
            source,
        };
        let key = self.kdf.derive(&self.label, &salt, password)?;
        let seed = open(&key, &sealed).map_err(crypto_err)?;
        let keypair = Ed25519KeyPair::from_seed(&seed).map_err(crypto_err)?;

        if hex::encode(keypair.public_key()) != self.public_key.to_ascii_lowercase() {
            return Err(WalletError::PublicKeyMismatch {
                label: self.label.clone(),
            });
        }
        Ok(keypair)
    }

    /// Read a wallet file.
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let data = std::fs::read(path).map_err(|source| WalletError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|e| WalletError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Write this wallet to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        let io_err = |source| WalletError::Io {
            path: path.display().to_string(),
            source,
        };
        let json = serde_json::to_vec_pretty(self).map_err(|e| WalletError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(io_err)
    }
}

/// [`BlockSigner`] over an unlocked wallet key.
pub struct WalletSigner {
    label: String,
    keypair: Ed25519KeyPair,
    public_key: PublicKey,
}

impl WalletSigner {
    /// Signer named `label` using `keypair`.
    pub fn new(label: impl Into<String>, keypair: Ed25519KeyPair) -> Self {
        Self {
            label: label.into(),
            public_key: keypair.public_key(),
            keypair,
        }
    }
}

impl BlockSigner for WalletSigner {
    fn label(&self) -> &str {
        &self.label
    }

    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    fn sign(&self, payload: &[u8]) -> Result<Signature, SignerError> {
        Ok(self.keypair.sign(payload))
    }
}

/// Unlock every wallet in `config`, in list order.
pub fn load_wallets(config: &WalletsConfig) -> Result<Vec<Arc<dyn BlockSigner>>, WalletError> {
    if config.wallets.is_empty() {
        return Err(WalletError::Empty);
    }

    let mut signers: Vec<Arc<dyn BlockSigner>> = Vec::with_capacity(config.wallets.len());
    for entry in &config.wallets {
        let wallet = WalletFile::load(&entry.path)?;
        let keypair = wallet.unlock(&entry.password)?;
        info!(
            "[qc-txreplay] 🔑 Unlocked bookkeeper {} ({})",
            wallet.label, wallet.public_key
        );
        signers.push(Arc::new(WalletSigner::new(wallet.label, keypair)));
    }
    Ok(signers)
}
