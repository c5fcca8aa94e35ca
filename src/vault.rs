use std::fs;
use std::path::{Path, PathBuf};

use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use crate::audit::{AuditEntry, AuditLog};
use crate::crypto::cipher;
use crate::crypto::hash::panic_fingerprint;
use crate::crypto::kdf::{self, KEY_SIZE, SALT_SIZE};
use crate::error::VaultError;
use crate::format::{self, Header};
use crate::vfs::document::Document;
use crate::vfs::tree::{NodeKind, Tree};

/// A resolved node, returned by [`Vault::resolve`]. Files carry their
/// content; folders carry a `.versions`-filtered `children` listing.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub path: String,
    pub name: String,
    pub is_folder: bool,
    pub created_at: f64,
    pub modified_at: f64,
    pub content: Option<Vec<u8>>,
    pub children: Option<Vec<String>>,
}

/// An open encrypted vault: the in-memory VFS tree, the audit log, and the
/// key needed to save both back to `path`. `create`/`open` gate entry;
/// every mutation flows through `log_action` and an atomic `save`.
pub struct Vault {
    path: PathBuf,
    key: Zeroizing<[u8; KEY_SIZE]>,
    salt: [u8; SALT_SIZE],
    panic_hash: Option<String>,
    panic_mode: bool,
    tree: Tree,
    audit: AuditLog,
    settings: serde_json::Value,
}

impl Vault {
    /// Create a brand-new vault at `path`, optionally with a duress
    /// passphrase, and save it immediately.
    pub fn create(
        path: impl AsRef<Path>,
        password: &str,
        panic_password: Option<&str>,
    ) -> Result<Self, VaultError> {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let key = kdf::derive_key(password, &salt)?;
        let panic_hash = panic_password.map(|p| panic_fingerprint(p, &salt));

        let mut vault = Vault {
            path: path.as_ref().to_path_buf(),
            key,
            salt,
            panic_hash,
            panic_mode: false,
            tree: Tree::new(),
            audit: AuditLog::new(),
            settings: serde_json::json!({}),
        };

        vault.log_action("VAULT_CREATE", "root");
        tracing::info!(path = %vault.path.display(), "vault created");
        vault.save()?;
        Ok(vault)
    }

    /// Open an existing vault. If `password` matches the stored panic
    /// fingerprint, returns an empty, unsaved session instead of decrypting
    /// the real payload.
    pub fn open(path: impl AsRef<Path>, password: &str) -> Result<Self, VaultError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read(&path)?;
        let (header, ciphertext) = format::decode(&raw)?;

        let salt = decode_salt(&header.salt)?;
        let key = kdf::derive_key(password, &salt)?;

        if let Some(stored_panic_hash) = &header.panic_hash {
            if &panic_fingerprint(password, &salt) == stored_panic_hash {
                tracing::info!(path = %path.display(), "panic passphrase used, presenting empty vault");
                return Ok(Vault {
                    path,
                    key,
                    salt,
                    panic_hash: header.panic_hash.clone(),
                    panic_mode: true,
                    tree: Tree::new(),
                    audit: AuditLog::new(),
                    settings: serde_json::json!({}),
                });
            }
        }

        let plaintext = cipher::decrypt(ciphertext, &key)?;
        let document: Document = serde_json::from_slice(&plaintext)
            .map_err(|e| VaultError::Serialization(e.to_string()))?;

        let tree = Tree::from_document(&document.root);
        let audit = AuditLog {
            entries: document.audit,
        };

        let mut vault = Vault {
            path,
            key,
            salt,
            panic_hash: header.panic_hash,
            panic_mode: false,
            tree,
            audit,
            settings: document.settings,
        };

        if !vault.verify_audit() {
            tracing::warn!(path = %vault.path.display(), "audit chain integrity check failed on open");
        }

        vault.log_action("VAULT_OPEN", "root");
        tracing::info!(path = %vault.path.display(), "vault opened");
        Ok(vault)
    }

    /// Persist the vault atomically. No-op (and does not touch disk) while
    /// in panic mode — this is what keeps a duress session from clobbering
    /// real data.
    pub fn save(&self) -> Result<(), VaultError> {
        if self.panic_mode {
            return Ok(());
        }

        let document = Document {
            root: self.tree.to_document(),
            audit: self.audit.entries.clone(),
            settings: self.settings.clone(),
        };
        let plaintext = serde_json::to_vec(&document)
            .map_err(|e| VaultError::Serialization(e.to_string()))?;

        let ciphertext = cipher::encrypt(&plaintext, &self.key)?;
        let header = Header::new(hex::encode(self.salt), self.panic_hash.clone());
        let encoded = format::encode(&header, &ciphertext)?;

        format::atomic_write(&self.path, &encoded).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "vault save failed");
            e
        })
    }

    /// Whether this session is a panic-mode (duress) session.
    pub fn is_panic_mode(&self) -> bool {
        self.panic_mode
    }

    pub fn audit_entries(&self) -> &[AuditEntry] {
        &self.audit.entries
    }

    /// Append an audit entry signed with the in-memory key. No-op in panic
    /// mode, so a duress session never grows a real audit trail.
    pub fn log_action(&mut self, action: &str, target: &str) {
        if self.panic_mode {
            return;
        }
        self.audit.add_entry(action, target, self.key.as_ref());
        tracing::debug!(action, target, "audit entry appended");
    }

    /// Recompute and check the audit chain against the in-memory key.
    /// Never blocks vault use — failures are only logged.
    pub fn verify_audit(&self) -> bool {
        self.audit.verify_integrity(self.key.as_ref())
    }

    pub fn resolve(&self, path: &str) -> Result<NodeInfo, VaultError> {
        let id = self.tree.resolve(path)?;
        let node = self.tree.get(id);
        let resolved_path = self.tree.path_of(id);
        match &node.kind {
            NodeKind::File { content } => Ok(NodeInfo {
                path: resolved_path,
                name: node.name.clone(),
                is_folder: false,
                created_at: node.created_at,
                modified_at: node.modified_at,
                content: Some(content.clone()),
                children: None,
            }),
            NodeKind::Folder { .. } => Ok(NodeInfo {
                path: resolved_path,
                name: node.name.clone(),
                is_folder: true,
                created_at: node.created_at,
                modified_at: node.modified_at,
                content: None,
                children: Some(self.tree.list_children(path)?),
            }),
        }
    }

    pub fn create_folder(&mut self, name: &str, parent_path: &str) -> Result<String, VaultError> {
        let path = self.tree.create_folder(name, parent_path)?;
        self.log_action("FOLDER_CREATE", &path);
        self.save()?;
        Ok(path)
    }

    pub fn add_file(
        &mut self,
        name: &str,
        content: Vec<u8>,
        parent_path: &str,
    ) -> Result<String, VaultError> {
        let path = self.tree.add_file(name, content, parent_path)?;
        self.log_action("FILE_CREATE", &path);
        self.save()?;
        Ok(path)
    }

    /// Snapshot the current content into `.versions` before overwriting it.
    pub fn update_file(&mut self, path: &str, content: Vec<u8>) -> Result<(), VaultError> {
        let id = self.tree.resolve(path)?;
        let node = self.tree.get(id);
        if !matches!(node.kind, NodeKind::File { .. }) {
            return Err(VaultError::NotAFolder(path.to_string()));
        }
        let original_name = node.name.clone();
        let previous_content = self.tree.file_content(path)?.to_vec();

        crate::vfs::versions::push_version(&mut self.tree, &original_name, previous_content);
        self.tree.set_file_content(path, content)?;

        self.log_action("FILE_EDIT", path);
        self.save()
    }

    pub fn rename_node(&mut self, path: &str, new_name: &str) -> Result<(), VaultError> {
        let changed = self.tree.rename_node(path, new_name)?;
        if changed {
            self.log_action("RENAME", &format!("{path} -> {new_name}"));
            self.save()?;
        }
        Ok(())
    }

    pub fn delete_node(&mut self, path: &str) -> Result<(), VaultError> {
        self.tree.delete_node(path)?;
        self.log_action("DELETE", path);
        self.save()
    }

    /// Re-derive a key from `old` and compare it to the in-memory key; on
    /// match, switch to a key derived from `new` against the same salt (the
    /// salt is never rotated — see DESIGN.md).
    pub fn change_password(&mut self, old: &str, new: &str) -> Result<(), VaultError> {
        let candidate = kdf::derive_key(old, &self.salt)?;
        if candidate.as_ref() != self.key.as_ref() {
            return Err(VaultError::Auth);
        }
        self.key = kdf::derive_key(new, &self.salt)?;
        self.log_action("PASSWORD_CHANGE", "root");
        self.save()
    }
}

fn decode_salt(hex_salt: &str) -> Result<[u8; SALT_SIZE], VaultError> {
    let bytes = hex::decode(hex_salt)
        .map_err(|e| VaultError::InvalidFormat(format!("bad salt hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| VaultError::InvalidFormat("salt has wrong length".to_string()))
}
