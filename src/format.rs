use std::fs;
use std::io::Write;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::VaultError;

pub const MAGIC: &[u8; 4] = b"TVLT";
pub const FORMAT_VERSION: u32 = 1;

/// Parsed container header. Unknown keys are preserved in `extra` so a
/// round-trip write reproduces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub kdf: String,
    pub salt: String,
    pub cipher: String,
    pub panic_hash: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Header {
    pub fn new(salt_hex: String, panic_hash: Option<String>) -> Self {
        Self {
            version: FORMAT_VERSION,
            kdf: "argon2id".to_string(),
            salt: salt_hex,
            cipher: "aes-256-gcm".to_string(),
            panic_hash,
            extra: serde_json::Map::new(),
        }
    }
}

/// Encode `header` (as "TVLT" + Base64 header) followed by `ciphertext`.
///
/// ```text
/// offset  bytes   field
/// 0       4       magic = ASCII "TVLT"
/// 4       4       header_length (big-endian u32)
/// 8       H       header_blob = Base64(header_json)
/// 8+H     *       ciphertext_blob (nonce || ciphertext || tag)
/// ```
pub fn encode(header: &Header, ciphertext: &[u8]) -> Result<Vec<u8>, VaultError> {
    let header_json = serde_json::to_vec(header)
        .map_err(|e| VaultError::Serialization(e.to_string()))?;
    let encoded_header = BASE64.encode(header_json);
    let header_bytes = encoded_header.as_bytes();

    let mut buf = Vec::with_capacity(8 + header_bytes.len() + ciphertext.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&(header_bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(header_bytes);
    buf.extend_from_slice(ciphertext);
    Ok(buf)
}

/// Parse a container, accepting both the "TVLT"-prefixed and legacy forms.
/// The legacy form drops the magic bytes: the first 4 bytes are
/// `header_length`, followed by *raw* (non-Base64) `header_json`, then the
/// ciphertext. Writers always emit the "TVLT" form. Returns `(header,
/// ciphertext)`.
pub fn decode(data: &[u8]) -> Result<(Header, &[u8]), VaultError> {
    if data.len() < 4 {
        return Err(VaultError::InvalidFormat("file too short".to_string()));
    }

    let (header_start, legacy) = if &data[0..4] == MAGIC {
        (8usize, false)
    } else {
        (4usize, true)
    };

    if data.len() < header_start {
        return Err(VaultError::InvalidFormat("file too short for header length".to_string()));
    }

    let len_offset = if legacy { 0 } else { 4 };
    let header_len = u32::from_be_bytes(
        data[len_offset..len_offset + 4]
            .try_into()
            .map_err(|_| VaultError::InvalidFormat("truncated header length".to_string()))?,
    ) as usize;

    let header_end = header_start
        .checked_add(header_len)
        .ok_or_else(|| VaultError::InvalidFormat("header length overflow".to_string()))?;
    if data.len() < header_end {
        return Err(VaultError::InvalidFormat("truncated header blob".to_string()));
    }

    let header_blob = &data[header_start..header_end];
    let header_json = if legacy {
        header_blob.to_vec()
    } else {
        BASE64
            .decode(header_blob)
            .map_err(|e| VaultError::InvalidFormat(format!("bad base64 header: {e}")))?
    };

    let header: Header = serde_json::from_slice(&header_json)
        .map_err(|e| VaultError::InvalidFormat(format!("malformed header json: {e}")))?;

    if header.version != FORMAT_VERSION {
        return Err(VaultError::InvalidFormat(format!(
            "unsupported vault version: {}",
            header.version
        )));
    }
    if header.salt.is_empty() {
        return Err(VaultError::InvalidFormat("missing salt in header".to_string()));
    }

    let ciphertext = &data[header_end..];
    Ok((header, ciphertext))
}

/// Write vault bytes to disk atomically: write a temp file in the same
/// directory, flush, fsync, then rename over the target. A failed rename
/// leaves the prior file intact.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), VaultError> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| VaultError::Io(e.error))?;

    Ok(())
}
