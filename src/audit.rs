use serde::{Deserialize, Serialize};

use crate::crypto::hash::{hmac_sha256_hex, sha256_hex};
use crate::vfs::tree::now_secs;

pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub timestamp: f64,
    pub action: String,
    pub target: String,
    pub user: String,
    pub host: String,
    pub prev_hash: String,
    pub signature: String,
}

impl AuditEntry {
    /// `"{timestamp}:{action}:{target}:{user}:{host}:{prev_hash}"` — the
    /// exact bytes that get hashed (as the next entry's `prev_hash`) and
    /// signed (as this entry's `signature`). The `signature` field itself is
    /// never part of this content. `{timestamp}` is Rust's default `f64`
    /// `Display` rendering, which is not portable across languages but is
    /// applied identically by every signer and verifier in this crate (see
    /// DESIGN.md).
    fn canonical(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.timestamp, self.action, self.target, self.user, self.host, self.prev_hash
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    pub entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new signed entry for `action` on `target`, using `key` as
    /// the HMAC key. `user`/`host` are read from the host environment.
    pub fn add_entry(&mut self, action: &str, target: &str, key: &[u8]) {
        let prev_hash = match self.entries.last() {
            Some(prev) => sha256_hex(prev.canonical().as_bytes()),
            None => GENESIS_HASH.to_string(),
        };

        let mut entry = AuditEntry {
            timestamp: now_secs(),
            action: action.to_string(),
            target: target.to_string(),
            user: whoami::username(),
            host: whoami::fallible::hostname().unwrap_or_else(|_| "unknown-host".to_string()),
            prev_hash,
            signature: String::new(),
        };
        entry.signature = hmac_sha256_hex(key, entry.canonical().as_bytes())
            .expect("HMAC over a 32-byte key never fails to initialize");

        self.entries.push(entry);
    }

    /// Recompute every entry's signature and chain link against `key`.
    /// Non-fatal by design: callers log the result and continue opening the
    /// vault regardless of what this returns.
    pub fn verify_integrity(&self, key: &[u8]) -> bool {
        for (i, entry) in self.entries.iter().enumerate() {
            let expected_sig = match hmac_sha256_hex(key, entry.canonical().as_bytes()) {
                Ok(sig) => sig,
                Err(_) => {
                    tracing::warn!(index = i, "audit entry HMAC could not be recomputed");
                    return false;
                }
            };
            if entry.signature != expected_sig {
                tracing::warn!(index = i, "audit chain signature mismatch");
                return false;
            }

            if i == 0 {
                if entry.prev_hash != GENESIS_HASH {
                    tracing::warn!("audit chain genesis hash mismatch");
                    return false;
                }
            } else {
                let expected_prev = sha256_hex(self.entries[i - 1].canonical().as_bytes());
                if entry.prev_hash != expected_prev {
                    tracing::warn!(index = i, "audit chain broken: prev_hash mismatch");
                    return false;
                }
            }
        }
        true
    }
}
