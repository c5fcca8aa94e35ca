use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use crate::crypto::kdf::KEY_SIZE;
use crate::error::VaultError;

/// Nonce size in bytes — 96 bits, the standard for AES-GCM.
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size in bytes, appended to the ciphertext by the
/// `aes-gcm` crate itself.
pub const TAG_SIZE: usize = 16;

/// Encrypt `plaintext` with AES-256-GCM and empty associated data.
///
/// Returns `nonce || ciphertext || tag` as a single buffer — the on-wire
/// layout the envelope codec expects.
pub fn encrypt(plaintext: &[u8], key: &Zeroizing<[u8; KEY_SIZE]>) -> Result<Vec<u8>, VaultError> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher_key = Key::<Aes256Gcm>::from_slice(key.as_ref());
    let cipher = Aes256Gcm::new(cipher_key);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Crypto(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a `nonce || ciphertext || tag` buffer produced by [`encrypt`].
///
/// Never distinguishes a wrong key from a tampered buffer — both surface as
/// `VaultError::Auth`.
pub fn decrypt(blob: &[u8], key: &Zeroizing<[u8; KEY_SIZE]>) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(VaultError::Auth);
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
    let cipher_key = Key::<Aes256Gcm>::from_slice(key.as_ref());
    let cipher = Aes256Gcm::new(cipher_key);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultError::Auth)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> Zeroizing<[u8; KEY_SIZE]> {
        Zeroizing::new([byte; KEY_SIZE])
    }

    #[test]
    fn roundtrip() {
        let k = key(1);
        let blob = encrypt(b"hello vault", &k).unwrap();
        let plain = decrypt(&blob, &k).unwrap();
        assert_eq!(&*plain, b"hello vault");
    }

    #[test]
    fn wrong_key_fails() {
        let blob = encrypt(b"hello vault", &key(1)).unwrap();
        assert!(decrypt(&blob, &key(2)).is_err());
    }

    #[test]
    fn flipped_byte_fails() {
        let k = key(3);
        let mut blob = encrypt(b"hello vault", &k).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert!(decrypt(&blob, &k).is_err());
    }

    #[test]
    fn short_buffer_fails() {
        assert!(decrypt(&[0u8; 4], &key(1)).is_err());
    }
}
