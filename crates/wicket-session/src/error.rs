//! Error types for the wicket-session crate.

/// Errors that can occur in session persistence.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Configured secret is too short to derive a key from
    #[error("Session secret must be at least {0} characters")]
    WeakSecret(usize),

    /// Encryption failed
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Record could not be decrypted
    #[error("Decryption failed - record may be corrupted or tampered")]
    DecryptionFailed,

    /// Record bytes are too short to contain the salt/iv/tag header
    #[error("Invalid record format: {0}")]
    InvalidFormat(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
