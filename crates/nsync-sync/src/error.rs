use nsync_core::NsyncError;
use nsync_crypto::CryptoError;
use nsync_storage::CloudError;
use thiserror::Error;

use crate::message::MessageKey;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    /// Decrypted payload is not a usable repository
    #[error(transparent)]
    Repository(#[from] NsyncError),

    #[error("local store: {0:#}")]
    LocalStore(anyhow::Error),

    #[error("no transfer code opens the cloud repository")]
    NoMatchingTransferCode,

    #[error("cloud storage is not configured")]
    NotConfigured,

    /// A step ran before the step that provides its input
    #[error("sync state missing: {0}")]
    MissingState(&'static str),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SyncError {
    /// The message a user sees for this error.
    pub fn message_key(&self) -> MessageKey {
        match self {
            SyncError::Cloud(CloudError::ConnectionFailed(_)) => MessageKey::ConnectionFailed,
            SyncError::Cloud(CloudError::AccessDenied(_)) => MessageKey::AccessDenied,
            SyncError::Crypto(CryptoError::InvalidCipherFormat(_))
            | SyncError::Crypto(CryptoError::UnknownAlgorithm(_))
            | SyncError::Repository(NsyncError::InvalidRepository(_)) => MessageKey::InvalidCipherFormat,
            SyncError::Crypto(CryptoError::UnsupportedRevision { .. })
            | SyncError::Repository(NsyncError::UnsupportedRepositoryRevision { .. }) => {
                MessageKey::UnsupportedRevision
            }
            SyncError::Crypto(CryptoError::DecryptionFailed) | SyncError::NoMatchingTransferCode => {
                MessageKey::DecryptionFailed
            }
            _ => MessageKey::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_keys() {
        let cases = [
            (SyncError::Cloud(CloudError::ConnectionFailed("x".into())), MessageKey::ConnectionFailed),
            (SyncError::Cloud(CloudError::AccessDenied("x".into())), MessageKey::AccessDenied),
            (SyncError::Cloud(CloudError::NotFound("x".into())), MessageKey::Generic),
            (SyncError::Crypto(CryptoError::InvalidCipherFormat("x".into())), MessageKey::InvalidCipherFormat),
            (SyncError::Crypto(CryptoError::UnknownAlgorithm("x".into())), MessageKey::InvalidCipherFormat),
            (
                SyncError::Crypto(CryptoError::UnsupportedRevision { found: 3, supported: 2 }),
                MessageKey::UnsupportedRevision,
            ),
            (
                SyncError::Repository(NsyncError::UnsupportedRepositoryRevision { found: 2, supported: 1 }),
                MessageKey::UnsupportedRevision,
            ),
            (SyncError::NoMatchingTransferCode, MessageKey::DecryptionFailed),
            (SyncError::LocalStore(anyhow::anyhow!("disk full")), MessageKey::Generic),
        ];
        for (err, key) in cases {
            assert_eq!(err.message_key(), key, "{err}");
        }
    }
}
