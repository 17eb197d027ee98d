//! nsync-storage: the collaborators a sync talks to
//!
//! - `cloud`: cloud client and OAuth2 traits, cloud error kinds, PKCE helpers
//! - `operator`: OpenDAL-backed cloud client (fs, S3, WebDAV, memory)
//! - `local`: JSON store for the local repository and device settings
//! - `health`: reachability check

pub mod cloud;
pub mod health;
pub mod local;
pub mod operator;

pub use cloud::{
    authorization_code_from_redirect, pkce_challenge, CloudError, CloudResult, CloudStorageClient,
    OAuth2Flow,
};
pub use health::{check_health, is_healthy, CloudHealth};
pub use local::{JsonFileStore, LocalStore};
pub use operator::{build_operator, OpendalCloudClient};
