//! Cloud storage collaborator: the three file operations a sync needs, plus
//! the OAuth2 sub-flow for providers that authenticate that way.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use nsync_core::{CloudStorageCredentials, OAuthToken};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub type CloudResult<T> = Result<T, CloudError>;

/// Failure kinds the sync machine distinguishes when talking to the cloud.
#[derive(Debug, Error)]
pub enum CloudError {
    /// Network unreachable, timeouts, rate limiting: retry on the next sync
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Credentials rejected or expired beyond refresh
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("cloud storage error: {0}")]
    Other(String),
}

#[async_trait]
pub trait CloudStorageClient: Send + Sync {
    /// Matches `CloudStorageCredentials::storage_id`
    fn id(&self) -> &str;

    async fn exists_file(&self, credentials: &CloudStorageCredentials, name: &str) -> CloudResult<bool>;

    async fn download_file(&self, credentials: &CloudStorageCredentials, name: &str) -> CloudResult<Vec<u8>>;

    /// Replace `name` with `data`. No locking: the last writer wins.
    async fn upload_file(
        &self,
        credentials: &CloudStorageCredentials,
        name: &str,
        data: Vec<u8>,
    ) -> CloudResult<()>;

    /// The OAuth2 flow of this provider, if it uses one.
    fn oauth(&self) -> Option<&dyn OAuth2Flow> {
        None
    }
}

/// Authorization-code flow with PKCE.
#[async_trait]
pub trait OAuth2Flow: Send + Sync {
    /// URL the user opens to grant access.
    fn build_authorization_url(&self, state: &str, code_challenge: &str) -> String;

    /// Exchange the redirect the provider sent back for a token.
    async fn fetch_token(
        &self,
        redirect_url: &str,
        expected_state: &str,
        code_verifier: &str,
    ) -> CloudResult<OAuthToken>;

    async fn refresh_token(&self, token: &OAuthToken) -> CloudResult<OAuthToken>;
}

/// S256 code challenge for a PKCE verifier (RFC 7636).
pub fn pkce_challenge(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

/// Pull the authorization code out of a redirect URL after checking `state`.
pub fn authorization_code_from_redirect(redirect_url: &str, expected_state: &str) -> CloudResult<String> {
    let query = redirect_url
        .split_once('?')
        .map(|(_, q)| q)
        .unwrap_or_default();
    let query = query.split('#').next().unwrap_or_default();

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("code", v)) => code = Some(v),
            Some(("state", v)) => state = Some(v),
            Some(("error", v)) => error = Some(v),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(CloudError::AccessDenied(format!("authorization refused: {error}")));
    }
    if state != Some(expected_state) {
        return Err(CloudError::AccessDenied("OAuth state mismatch".into()));
    }
    code.filter(|c| !c.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CloudError::AccessDenied("redirect carries no authorization code".into()))
}
