//! OpenDAL-backed cloud client for fs, S3, WebDAV and in-memory stores

use async_trait::async_trait;
use nsync_core::config::{expand_tilde, StorageConfig};
use nsync_core::CloudStorageCredentials;
use opendal::{ErrorKind, Operator};
use std::path::Path;

use crate::cloud::{CloudError, CloudResult, CloudStorageClient};

/// Cloud client that resolves every call to an OpenDAL operator.
///
/// Credentials from first-time setup override the configured endpoint and
/// authentication; the backend itself always comes from config.
#[derive(Debug, Clone)]
pub struct OpendalCloudClient {
    config: StorageConfig,
    /// Set for the memory backend and for tests: every call uses this operator
    fixed: Option<Operator>,
}

impl OpendalCloudClient {
    pub fn new(config: StorageConfig) -> anyhow::Result<Self> {
        let fixed = match config.backend.as_str() {
            "memory" => Some(memory_operator()?),
            "fs" | "s3" | "webdav" => None,
            other => anyhow::bail!("unknown storage backend: {other}"),
        };
        Ok(Self { config, fixed })
    }

    /// Wrap an existing operator; credentials are ignored.
    pub fn with_operator(op: Operator) -> Self {
        Self {
            config: StorageConfig {
                backend: "memory".into(),
                ..Default::default()
            },
            fixed: Some(op),
        }
    }

    pub fn operator(&self, credentials: &CloudStorageCredentials) -> CloudResult<Operator> {
        if let Some(op) = &self.fixed {
            return Ok(op.clone());
        }
        build_operator(&self.config, credentials)
            .map_err(|e| CloudError::Other(format!("{e:#}")))
    }
}

fn memory_operator() -> anyhow::Result<Operator> {
    Ok(Operator::new(opendal::services::Memory::default())?.finish())
}

/// Build an OpenDAL Operator for a remote backend (fs, s3 or webdav).
///
/// The memory backend has no per-call operator: [`OpendalCloudClient::new`]
/// builds it once so its contents outlive a single call.
///
/// If `enforce_tls` is true and an HTTP endpoint is used, this returns an error.
/// Otherwise, a warning is logged for non-HTTPS endpoints.
pub fn build_operator(cfg: &StorageConfig, credentials: &CloudStorageCredentials) -> anyhow::Result<Operator> {
    let endpoint = credentials.url.as_deref().unwrap_or(&cfg.endpoint);

    let op = match cfg.backend.as_str() {
        "fs" => {
            let root = credentials.url.as_deref().unwrap_or(&cfg.root);
            let root = expand_tilde(Path::new(root));
            let builder = opendal::services::Fs::default().root(&root.to_string_lossy());
            Operator::new(builder)?.finish()
        }
        "s3" => {
            check_tls(endpoint, cfg.enforce_tls)?;
            // opendal 0.55: S3 builder uses consuming pattern (methods take `self`, return `Self`)
            let mut builder = opendal::services::S3::default()
                .endpoint(endpoint)
                .region(&cfg.region)
                .bucket(&cfg.bucket)
                .root(&cfg.root);
            if let (Some(key), Some(secret)) = (&credentials.username, &credentials.password) {
                builder = builder.access_key_id(key).secret_access_key(secret);
            }
            Operator::new(builder)?.finish()
        }
        "webdav" => {
            check_tls(endpoint, cfg.enforce_tls)?;
            let mut builder = opendal::services::Webdav::default()
                .endpoint(endpoint)
                .root(&cfg.root);
            if let Some(token) = &credentials.token {
                builder = builder.token(&token.access_token);
            } else if let (Some(user), Some(password)) = (&credentials.username, &credentials.password) {
                builder = builder.username(user).password(password);
            }
            Operator::new(builder)?.finish()
        }
        other => anyhow::bail!("unknown storage backend: {other}"),
    };

    Ok(op
        .layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(3)
                .with_jitter(),
        ))
}

fn check_tls(endpoint: &str, enforce_tls: bool) -> anyhow::Result<()> {
    if endpoint.starts_with("http://") {
        if enforce_tls {
            anyhow::bail!(
                "storage endpoint uses plaintext HTTP ({endpoint}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set storage.enforce_tls = false for local development."
            );
        }
        tracing::warn!(
            endpoint = %endpoint,
            "storage endpoint uses plaintext HTTP, credentials are transmitted unencrypted"
        );
    }
    Ok(())
}

pub(crate) fn map_error(e: opendal::Error) -> CloudError {
    match e.kind() {
        ErrorKind::NotFound => CloudError::NotFound(e.to_string()),
        ErrorKind::PermissionDenied => CloudError::AccessDenied(e.to_string()),
        ErrorKind::RateLimited => CloudError::ConnectionFailed(e.to_string()),
        _ if e.is_temporary() => CloudError::ConnectionFailed(e.to_string()),
        ErrorKind::Unexpected => CloudError::ConnectionFailed(e.to_string()),
        _ => CloudError::Other(e.to_string()),
    }
}

#[async_trait]
impl CloudStorageClient for OpendalCloudClient {
    fn id(&self) -> &str {
        &self.config.backend
    }

    async fn exists_file(&self, credentials: &CloudStorageCredentials, name: &str) -> CloudResult<bool> {
        let op = self.operator(credentials)?;
        match op.stat(name).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_error(e)),
        }
    }

    async fn download_file(&self, credentials: &CloudStorageCredentials, name: &str) -> CloudResult<Vec<u8>> {
        let op = self.operator(credentials)?;
        let data = op.read(name).await.map_err(map_error)?.to_vec();
        tracing::debug!(name, bytes = data.len(), "downloaded cloud file");
        Ok(data)
    }

    async fn upload_file(
        &self,
        credentials: &CloudStorageCredentials,
        name: &str,
        data: Vec<u8>,
    ) -> CloudResult<()> {
        let op = self.operator(credentials)?;
        let bytes = data.len();
        op.write(name, data).await.map_err(map_error)?;
        tracing::debug!(name, bytes, "uploaded cloud file");
        Ok(())
    }
}
