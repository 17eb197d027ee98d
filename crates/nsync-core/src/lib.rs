//! nsync-core: shared types for the nsync workspace
//!
//! - `config`: `nsync.toml` schema
//! - `model`: repository snapshot, notes, safes, modification fingerprint
//! - `settings`: per-device settings (cloud credentials, transfer codes)
//! - `transfer_code`: generation, sanitising and history of transfer codes

pub mod config;
pub mod error;
pub mod model;
pub mod settings;
pub mod transfer_code;

pub use error::{NsyncError, NsyncResult};
pub use model::{Note, NoteId, RepositorySnapshot, Safe, SafeId};
pub use settings::{CloudStorageCredentials, OAuthToken, Settings};
pub use transfer_code::TransferCodes;
