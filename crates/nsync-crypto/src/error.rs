use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Failure kinds of the envelope layer.
///
/// Callers branch on the kind: `DecryptionFailed` means "wrong key, try
/// another", while the format kinds mean the blob itself cannot be trusted.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Structurally malformed envelope (wrong package tag, missing fields, bad base64)
    #[error("invalid cipher format: {0}")]
    InvalidCipherFormat(String),

    /// Envelope written by a newer protocol revision
    #[error("unsupported envelope revision {found} (newest supported: {supported})")]
    UnsupportedRevision { found: u64, supported: u32 },

    /// Header names an algorithm missing from the registry
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// AEAD authentication failed: wrong key or tampered cipher
    #[error("decryption failed: invalid key or corrupted data")]
    DecryptionFailed,

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("validation error: {0}")]
    Validation(String),
}

impl CryptoError {
    /// True for errors that condemn the blob itself, not the key used on it.
    pub fn is_fatal_format(&self) -> bool {
        matches!(
            self,
            CryptoError::InvalidCipherFormat(_)
                | CryptoError::UnsupportedRevision { .. }
                | CryptoError::UnknownAlgorithm(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(CryptoError::InvalidCipherFormat("x".into()).is_fatal_format());
        assert!(CryptoError::UnsupportedRevision { found: 9, supported: 2 }.is_fatal_format());
        assert!(CryptoError::UnknownAlgorithm("rot13".into()).is_fatal_format());
        assert!(!CryptoError::DecryptionFailed.is_fatal_format());
        assert!(!CryptoError::WeakPassword { min: 5 }.is_fatal_format());
    }
}
