use thiserror::Error;

/// All errors produced by the vault core.
///
/// `Auth` intentionally carries no detail: it is raised both when the AEAD
/// tag fails to verify on open and when a supplied password does not match
/// the in-memory key (`change_password`), and those two cases must remain
/// indistinguishable to a caller.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid vault format: {0}")]
    InvalidFormat(String),

    #[error("decryption failed — wrong password or corrupted vault")]
    Auth,

    #[error("path not found: {0}")]
    NotFound(String),

    #[error("not a folder: {0}")]
    NotAFolder(String),

    #[error("name already exists: {0}")]
    Collision(String),

    #[error("illegal operation: {0}")]
    IllegalOperation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;
