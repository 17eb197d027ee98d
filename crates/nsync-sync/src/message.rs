//! User-visible messages a sync run can surface.
//!
//! Steps never format text themselves; they name a key and the frontend
//! decides how to show it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Cloud and device now hold the same repository
    Synchronized,
    /// A new transfer code is in effect on this device and in the cloud
    TransferCodeChanged,
    /// The entered transfer code does not open the cloud repository
    TransferCodeWrong,
    /// None of the known transfer codes opens the cloud repository
    DecryptionFailed,
    ConnectionFailed,
    AccessDenied,
    /// The cloud repository is damaged or was not written by this application
    InvalidCipherFormat,
    /// The cloud repository was written by a newer version
    UnsupportedRevision,
    Generic,
}

impl MessageKey {
    pub fn is_error(&self) -> bool {
        !matches!(self, MessageKey::Synchronized | MessageKey::TransferCodeChanged)
    }

    pub fn text(&self) -> &'static str {
        match self {
            MessageKey::Synchronized => "Notes synchronized.",
            MessageKey::TransferCodeChanged => {
                "The transfer code was changed. Other devices will ask for the new code."
            }
            MessageKey::TransferCodeWrong => "This transfer code does not match, please check it.",
            MessageKey::DecryptionFailed => {
                "The cloud repository could not be opened with the known transfer codes."
            }
            MessageKey::ConnectionFailed => {
                "The cloud storage could not be reached. Synchronization will be retried later."
            }
            MessageKey::AccessDenied => {
                "The cloud storage refused access. Please check the cloud storage settings."
            }
            MessageKey::InvalidCipherFormat => "The cloud repository is damaged or in an unknown format.",
            MessageKey::UnsupportedRevision => {
                "The cloud repository was written by a newer version. Please update the application."
            }
            MessageKey::Generic => "Synchronization failed.",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
