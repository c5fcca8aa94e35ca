use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::VaultError;

/// SHA-256 content hash, lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// HMAC-SHA-256 keyed MAC, lowercase hex.
pub fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> Result<String, VaultError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| VaultError::Crypto(format!("HMAC init failed: {e}")))?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// SHA-256 of a panic passphrase concatenated with the vault salt, used as
/// the on-disk fingerprint that `open` compares a candidate password against.
pub fn panic_fingerprint(panic_password: &str, salt: &[u8]) -> String {
    let mut data = Vec::with_capacity(panic_password.len() + salt.len());
    data.extend_from_slice(panic_password.as_bytes());
    data.extend_from_slice(salt);
    sha256_hex(&data)
}
