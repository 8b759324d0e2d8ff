//! # Password Key Derivation
//!
//! scrypt over a per-wallet salt. The cost parameters are stored next to the
//! sealed data, so older wallets keep opening after the defaults change.

use crate::symmetric::SecretKey;
use crate::CryptoError;

/// Default CPU/memory cost, as log2(N). N = 2^18.
pub const SCRYPT_LOG_N: u8 = 18;
/// Default block size.
pub const SCRYPT_R: u32 = 8;
/// Default parallelization.
pub const SCRYPT_P: u32 = 1;

/// Largest accepted log2(N). With `r` this bounds the memory a wallet file
/// can demand.
pub const MAX_SCRYPT_LOG_N: u8 = 20;

/// Largest accepted block size.
pub const MAX_SCRYPT_R: u32 = 32;

/// Largest accepted parallelization.
pub const MAX_SCRYPT_P: u32 = 16;

/// Derive a 256-bit sealing key from `password` and `salt`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKdfParams` if the cost parameters are out of
/// range.
pub fn scrypt_derive_key(
    password: &str,
    salt: &[u8],
    log_n: u8,
    r: u32,
    p: u32,
) -> Result<SecretKey, CryptoError> {
    if log_n > MAX_SCRYPT_LOG_N {
        return Err(CryptoError::InvalidKdfParams(format!(
            "log_n {log_n} exceeds {MAX_SCRYPT_LOG_N}"
        )));
    }
    if !(1..=MAX_SCRYPT_R).contains(&r) || !(1..=MAX_SCRYPT_P).contains(&p) {
        return Err(CryptoError::InvalidKdfParams(format!(
            "r={r} p={p} out of range"
        )));
    }
    let params = scrypt::Params::new(log_n, r, p, 32)
        .map_err(|e| CryptoError::InvalidKdfParams(e.to_string()))?;

    let mut key = [0u8; 32];
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut key)
        .map_err(|e| CryptoError::InvalidKdfParams(e.to_string()))?;
    Ok(SecretKey::from_bytes(key))
}
