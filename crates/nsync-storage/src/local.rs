//! Local persistence of the repository and the device settings.
//!
//! Both live as JSON files in the data directory. Each file has exactly one
//! writer at a time (an async mutex per file) and is replaced atomically, so a
//! crash mid-write leaves the previous version intact.

use anyhow::{Context, Result};
use async_trait::async_trait;
use nsync_core::{RepositorySnapshot, Settings};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const REPOSITORY_FILE: &str = "repository.json";
pub const SETTINGS_FILE: &str = "settings.json";

#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Load the repository, creating and persisting an empty one when none
    /// exists yet. A file that exists but cannot be parsed is an error, never
    /// silently replaced.
    async fn load_repository_or_default(&self) -> Result<RepositorySnapshot>;

    async fn try_save_repository(&self, repository: &RepositorySnapshot) -> Result<()>;

    async fn load_settings_or_default(&self) -> Result<Settings>;

    async fn try_save_settings(&self, settings: &Settings) -> Result<()>;
}

/// [`LocalStore`] over two JSON files in one directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    repository_lock: Mutex<()>,
    settings_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            repository_lock: Mutex::new(()),
            settings_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn repository_path(&self) -> PathBuf {
        self.dir.join(REPOSITORY_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }
}

/// Write to a temp file in the same directory, then rename over `path`.
async fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .with_context(|| format!("creating data dir: {}", parent.display()))?;

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));
    tokio::fs::write(&tmp_path, data)
        .await
        .with_context(|| format!("writing temp file: {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("renaming into place: {}", path.display()))?;
    Ok(())
}

async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

#[async_trait]
impl LocalStore for JsonFileStore {
    async fn load_repository_or_default(&self) -> Result<RepositorySnapshot> {
        let _guard = self.repository_lock.lock().await;
        let path = self.repository_path();

        match read_if_exists(&path).await? {
            Some(data) => RepositorySnapshot::from_bytes(&data)
                .with_context(|| format!("loading repository: {}", path.display())),
            None => {
                // persist right away so the id stays stable across runs
                let repository = RepositorySnapshot::new();
                atomic_write(&path, &repository.to_bytes()?).await?;
                tracing::info!(id = %repository.id, "created new local repository");
                Ok(repository)
            }
        }
    }

    async fn try_save_repository(&self, repository: &RepositorySnapshot) -> Result<()> {
        let _guard = self.repository_lock.lock().await;
        let data = repository.to_bytes()?;
        atomic_write(&self.repository_path(), &data).await?;
        tracing::debug!(id = %repository.id, notes = repository.notes.len(), "saved local repository");
        Ok(())
    }

    async fn load_settings_or_default(&self) -> Result<Settings> {
        let _guard = self.settings_lock.lock().await;
        let path = self.settings_path();

        match read_if_exists(&path).await? {
            Some(data) => serde_json::from_slice(&data)
                .with_context(|| format!("parsing settings: {}", path.display())),
            None => Ok(Settings::default()),
        }
    }

    async fn try_save_settings(&self, settings: &Settings) -> Result<()> {
        let _guard = self.settings_lock.lock().await;
        let data = serde_json::to_vec_pretty(settings).context("serializing settings")?;
        atomic_write(&self.settings_path(), &data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsync_core::Note;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_repository_is_created_once() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("data"));

        let first = store.load_repository_or_default().await.unwrap();
        assert!(store.repository_path().exists());
        let second = store.load_repository_or_default().await.unwrap();
        assert_eq!(first.id, second.id, "repository id must be stable");
    }

    #[tokio::test]
    async fn test_repository_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path());

        let mut repo = store.load_repository_or_default().await.unwrap();
        repo.add_note(Note::new("<p>groceries</p>"));
        store.try_save_repository(&repo).await.unwrap();

        let loaded = store.load_repository_or_default().await.unwrap();
        assert_eq!(loaded, repo);
        assert!(
            !tmp.path().join(".repository.json.tmp").exists(),
            "temp file must be renamed away"
        );
    }

    #[tokio::test]
    async fn test_corrupt_repository_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path());
        std::fs::write(store.repository_path(), b"{ not json").unwrap();

        assert!(store.load_repository_or_default().await.is_err());
        assert_eq!(
            std::fs::read(store.repository_path()).unwrap(),
            b"{ not json",
            "corrupt file must not be overwritten"
        );
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path());

        let mut settings = store.load_settings_or_default().await.unwrap();
        assert!(settings.transfer_codes.is_empty());
        assert!(!store.settings_path().exists(), "default settings are not persisted");

        settings.transfer_codes.promote("abcdefghijkmnpqr");
        store.try_save_settings(&settings).await.unwrap();
        assert_eq!(store.load_settings_or_default().await.unwrap(), settings);
    }
}
