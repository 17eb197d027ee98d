//! Per-run state. Created when a run starts, dropped when it ends, never persisted.

use nsync_core::{CloudStorageCredentials, RepositorySnapshot, Settings};

use crate::mode::ExecutionMode;

#[derive(Debug)]
pub struct SyncSession {
    pub mode: ExecutionMode,
    pub settings: Settings,
    /// Copied from settings, or filled in by first-time setup
    pub credentials: Option<CloudStorageCredentials>,
    /// Downloaded blob, so repeating the download step within a run is free
    pub cached_blob: Option<Vec<u8>>,
    pub cloud_repository: Option<RepositorySnapshot>,
    pub local_repository: Option<RepositorySnapshot>,
    /// Sanitized code the user typed in during this run
    pub entered_code: Option<String>,
    /// New transfer code to upload with; promoted once the upload committed
    pub pending_rotation: Option<String>,
    /// The merged repository takes the cloud identity
    pub adopt_cloud_id: bool,
    pub oauth_state: Option<String>,
    pub code_verifier: Option<String>,
}

impl SyncSession {
    pub fn new(mode: ExecutionMode, settings: Settings) -> Self {
        Self {
            mode,
            credentials: settings.credentials.clone(),
            settings,
            cached_blob: None,
            cloud_repository: None,
            local_repository: None,
            entered_code: None,
            pending_rotation: None,
            adopt_cloud_id: false,
            oauth_state: None,
            code_verifier: None,
        }
    }
}
