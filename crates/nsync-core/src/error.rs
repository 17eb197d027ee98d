use thiserror::Error;

pub type NsyncResult<T> = Result<T, NsyncError>;

#[derive(Debug, Error)]
pub enum NsyncError {
    #[error("config error: {0}")]
    Config(String),

    #[error("repository revision {found} is newer than supported revision {supported}")]
    UnsupportedRepositoryRevision { found: u32, supported: u32 },

    #[error("invalid repository: {0}")]
    InvalidRepository(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
