use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use crate::error::VaultError;

/// Salt size in bytes, per the v1 container format.
pub const SALT_SIZE: usize = 16;

/// Output key size in bytes (256-bit key for AES-256-GCM).
pub const KEY_SIZE: usize = 32;

/// Argon2id parameters fixed by the v1 format. These are never read from the
/// header and never exposed as caller-tunable knobs — the header only
/// records the KDF name for humans inspecting the file.
pub const ARGON2_M_COST: u32 = 65536; // 64 MiB
pub const ARGON2_T_COST: u32 = 2;
pub const ARGON2_P_COST: u32 = 2;

/// Derive a 256-bit AES key from a UTF-8 password and salt using Argon2id
/// with the fixed v1 parameters.
pub fn derive_key(
    password: &str,
    salt: &[u8; SALT_SIZE],
) -> Result<Zeroizing<[u8; KEY_SIZE]>, VaultError> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(KEY_SIZE))
        .map_err(|e| VaultError::Crypto(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);

    argon2
        .hash_password_into(password.as_bytes(), salt, key.as_mut())
        .map_err(|e| VaultError::Crypto(e.to_string()))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_password_and_salt_derive_same_key() {
        let salt = [7u8; SALT_SIZE];
        let k1 = derive_key("correct horse", &salt).unwrap();
        let k2 = derive_key("correct horse", &salt).unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn different_salt_derives_different_key() {
        let k1 = derive_key("correct horse", &[1u8; SALT_SIZE]).unwrap();
        let k2 = derive_key("correct horse", &[2u8; SALT_SIZE]).unwrap();
        assert_ne!(*k1, *k2);
    }
}
