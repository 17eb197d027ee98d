//! Cloud reachability check for `nsync status`

use nsync_core::CloudStorageCredentials;

use crate::cloud::{CloudError, CloudStorageClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudHealth {
    /// Reachable; whether the repository blob exists yet
    Reachable { repository_present: bool },
    Unreachable(String),
    AccessDenied(String),
}

/// Check the store by looking for the repository blob, the lightest call it supports.
pub async fn check_health(
    client: &dyn CloudStorageClient,
    credentials: &CloudStorageCredentials,
    file_name: &str,
) -> CloudHealth {
    match client.exists_file(credentials, file_name).await {
        Ok(repository_present) => CloudHealth::Reachable { repository_present },
        Err(CloudError::AccessDenied(msg)) => CloudHealth::AccessDenied(msg),
        Err(e) => CloudHealth::Unreachable(e.to_string()),
    }
}

/// Returns true if storage is reachable, false otherwise (non-panicking)
pub async fn is_healthy(
    client: &dyn CloudStorageClient,
    credentials: &CloudStorageCredentials,
    file_name: &str,
) -> bool {
    matches!(
        check_health(client, credentials, file_name).await,
        CloudHealth::Reachable { .. }
    )
}
