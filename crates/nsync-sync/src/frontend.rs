//! What a sync run needs from the user interface.
//!
//! The step machine only calls the methods its execution mode allows: no
//! prompt without `DIALOGS`, no busy indicator without `BUSY_INDICATOR`,
//! nothing at all in silent mode.

use async_trait::async_trait;
use nsync_core::CloudStorageCredentials;

use crate::message::MessageKey;

/// Answer to "the cloud holds a different repository than this device".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeChoice {
    /// Combine both repositories, keeping the cloud identity
    Merge,
    /// Overwrite the cloud with this device's repository
    KeepLocal,
    /// Overwrite this device with the cloud repository
    KeepCloud,
}

#[async_trait]
pub trait SyncFrontend: Send + Sync {
    /// Let the user pick and configure a cloud storage. `None` cancels.
    async fn first_time_setup(&self) -> Option<CloudStorageCredentials>;

    /// Send the user to `authorization_url` and return the redirect URL the
    /// provider came back with. `None` cancels.
    async fn oauth_authorize(&self, authorization_url: &str) -> Option<String>;

    /// Ask for the transfer code of another device. `None` cancels.
    async fn prompt_transfer_code(&self) -> Option<String>;

    async fn prompt_merge_choice(&self) -> Option<MergeChoice>;

    /// Tell the user the transfer code they need on their other devices.
    async fn show_transfer_code(&self, code: &str);

    async fn show_message(&self, message: MessageKey);

    fn show_busy(&self);

    fn hide_busy(&self);
}

/// Frontend for runs without a user: every question is cancelled and every
/// notification dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessFrontend;

#[async_trait]
impl SyncFrontend for HeadlessFrontend {
    async fn first_time_setup(&self) -> Option<CloudStorageCredentials> {
        None
    }

    async fn oauth_authorize(&self, _authorization_url: &str) -> Option<String> {
        None
    }

    async fn prompt_transfer_code(&self) -> Option<String> {
        None
    }

    async fn prompt_merge_choice(&self) -> Option<MergeChoice> {
        None
    }

    async fn show_transfer_code(&self, _code: &str) {}

    async fn show_message(&self, message: MessageKey) {
        tracing::debug!(?message, "headless run dropped message");
    }

    fn show_busy(&self) {}

    fn hide_busy(&self) {}
}
