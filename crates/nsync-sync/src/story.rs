//! The sync step machine.
//!
//! A run walks a fixed graph of steps. Each step returns a [`Transition`]:
//! continue to another step, continue after showing a message, or terminate.
//! Errors from any step go through one place ([`SyncStory::fail`]) that turns
//! them into a message key and a terminal outcome.
//!
//! ```text
//! IsCloudServiceConfigured ─┬─> ExistsCloudRepository ─┬─> DownloadCloudRepository ─> ExistsTransferCode
//!                           └─> ShowFirstTimeSetup     └─> StoreLocalRepositoryToCloudAndExit
//! ExistsTransferCode ─┬─> DecryptCloudRepository ─┬─> IsSameRepository ─┬─> StoreMergedRepositoryAndExit
//!                     └─> PromptForTransferCode   └─> PromptForTransferCode └─> PromptMergeChoice
//! ```

use std::sync::Arc;

use nsync_core::settings::now_secs;
use nsync_core::transfer_code;
use nsync_core::{CloudStorageCredentials, RepositorySnapshot};
use nsync_crypto::{Compression, CostTier, CryptoError, Cryptor, DEFAULT_ALGORITHM, DEFAULT_KDF};
use nsync_storage::{pkce_challenge, CloudStorageClient, LocalStore};
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::SecretString;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::frontend::{MergeChoice, SyncFrontend};
use crate::guard::RunGuard;
use crate::merge::merge;
use crate::message::MessageKey;
use crate::mode::ExecutionMode;
use crate::resolver::resolve_and_promote;
use crate::session::SyncSession;

// ── Steps and transitions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    IsCloudServiceConfigured,
    ShowFirstTimeSetup,
    OAuthAuthorize,
    /// Also refreshes an expiring OAuth token before touching the cloud
    ExistsCloudRepository,
    DownloadCloudRepository,
    ExistsTransferCode,
    PromptForTransferCode,
    DecryptCloudRepository,
    IsSameRepository,
    PromptMergeChoice,
    StoreMergedRepositoryAndExit,
    StoreLocalRepositoryToCloudAndExit,
    StoreCloudRepositoryToDeviceAndExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Continue(StepId),
    ContinueWithMessage(StepId, MessageKey),
    Terminate(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Cloud and device agree; the message is shown in GUI runs
    Completed(MessageKey),
    /// The user cancelled, or the run needed a dialog its mode does not allow
    Aborted,
    Failed(MessageKey),
    /// An interactive run was abandoned through its cancellation token
    Cancelled,
    /// Another run held the guard; this trigger was absorbed
    AlreadyRunning,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

/// What a run did, for callers and tests.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub outcome: Outcome,
    /// Every step entered, in order
    pub steps: Vec<StepId>,
}

/// Envelope parameters and the cloud file name.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub cloud_file_name: String,
    pub algorithm: String,
    pub kdf: String,
    pub compression: Option<Compression>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            cloud_file_name: "nsync_repository.nsync".into(),
            algorithm: DEFAULT_ALGORITHM.into(),
            kdf: DEFAULT_KDF.into(),
            compression: Some(Compression::Zstd),
        }
    }
}

// ── Story ─────────────────────────────────────────────────────────────────────

pub struct SyncStory {
    cloud: Arc<dyn CloudStorageClient>,
    local: Arc<dyn LocalStore>,
    frontend: Arc<dyn SyncFrontend>,
    cryptor: Cryptor,
    options: SyncOptions,
    guard: RunGuard,
}

impl SyncStory {
    pub fn new(
        cloud: Arc<dyn CloudStorageClient>,
        local: Arc<dyn LocalStore>,
        frontend: Arc<dyn SyncFrontend>,
        cryptor: Cryptor,
        options: SyncOptions,
    ) -> Self {
        Self {
            cloud,
            local,
            frontend,
            cryptor,
            options,
            guard: RunGuard::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Run one sync to completion.
    pub async fn run(&self, mode: ExecutionMode) -> SyncReport {
        let mut steps = Vec::new();
        let outcome = self.drive(mode, false, &mut steps).await;
        SyncReport { outcome, steps }
    }

    /// Run a sync that replaces the transfer code with a freshly generated one.
    ///
    /// The new code becomes current only after the cloud holds a repository
    /// encrypted with it.
    pub async fn run_with_rotation(&self, mode: ExecutionMode) -> SyncReport {
        let mut steps = Vec::new();
        let outcome = self.drive(mode, true, &mut steps).await;
        SyncReport { outcome, steps }
    }

    /// Run until done or until `cancel` fires. Only GUI runs can be abandoned;
    /// any other mode ignores the token. Writes committed before cancellation stand.
    pub async fn run_cancellable(&self, mode: ExecutionMode, cancel: CancellationToken) -> SyncReport {
        if !mode.contains(ExecutionMode::GUI) {
            return self.run(mode).await;
        }
        let mut steps = Vec::new();
        let outcome = tokio::select! {
            outcome = self.drive(mode, false, &mut steps) => outcome,
            _ = cancel.cancelled() => {
                info!("sync cancelled");
                self.hide_busy(mode);
                Outcome::Cancelled
            }
        };
        SyncReport { outcome, steps }
    }

    /// Start a silent run on the runtime without waiting for it.
    pub fn spawn_detached(self: &Arc<Self>) -> JoinHandle<SyncReport> {
        let story = Arc::clone(self);
        tokio::spawn(async move { story.run(ExecutionMode::SILENT).await })
    }

    async fn drive(&self, mode: ExecutionMode, rotate: bool, steps: &mut Vec<StepId>) -> Outcome {
        let Some(_permit) = self.guard.try_acquire() else {
            info!("sync already running, trigger absorbed");
            return Outcome::AlreadyRunning;
        };
        info!(?mode, rotate, "sync started");

        self.show_busy(mode);
        let outcome = self.drive_steps(mode, rotate, steps).await;
        self.hide_busy(mode);

        info!(?outcome, steps = steps.len(), "sync finished");
        outcome
    }

    async fn drive_steps(&self, mode: ExecutionMode, rotate: bool, steps: &mut Vec<StepId>) -> Outcome {
        let mut current = StepId::IsCloudServiceConfigured;
        let settings = match self.local.load_settings_or_default().await {
            Ok(settings) => settings,
            Err(e) => {
                steps.push(current);
                return self.fail(mode, current, SyncError::LocalStore(e)).await;
            }
        };
        let mut session = SyncSession::new(mode, settings);
        if rotate {
            session.pending_rotation = Some(transfer_code::generate(&mut rand::thread_rng()));
        }

        loop {
            steps.push(current);
            debug!(step = ?current, "entering step");
            let transition = match self.step(current, &mut session).await {
                Ok(transition) => transition,
                Err(e) => return self.fail(mode, current, e).await,
            };
            match transition {
                Transition::Continue(next) => current = next,
                Transition::ContinueWithMessage(next, message) => {
                    self.notify(mode, message, true).await;
                    current = next;
                }
                Transition::Terminate(outcome) => {
                    if let Outcome::Completed(message) = outcome {
                        if mode.contains(ExecutionMode::GUI) {
                            self.notify(mode, message, false).await;
                        }
                    }
                    return outcome;
                }
            }
        }
    }

    async fn step(&self, id: StepId, s: &mut SyncSession) -> SyncResult<Transition> {
        match id {
            StepId::IsCloudServiceConfigured => Ok(Transition::Continue(if s.credentials.is_some() {
                StepId::ExistsCloudRepository
            } else {
                StepId::ShowFirstTimeSetup
            })),
            StepId::ShowFirstTimeSetup => self.show_first_time_setup(s).await,
            StepId::OAuthAuthorize => self.oauth_authorize(s).await,
            StepId::ExistsCloudRepository => self.exists_cloud_repository(s).await,
            StepId::DownloadCloudRepository => self.download_cloud_repository(s).await,
            StepId::ExistsTransferCode => Ok(Transition::Continue(
                if s.entered_code.is_some() || !s.settings.transfer_codes.is_empty() {
                    StepId::DecryptCloudRepository
                } else {
                    StepId::PromptForTransferCode
                },
            )),
            StepId::PromptForTransferCode => self.prompt_for_transfer_code(s).await,
            StepId::DecryptCloudRepository => self.decrypt_cloud_repository(s).await,
            StepId::IsSameRepository => self.is_same_repository(s).await,
            StepId::PromptMergeChoice => self.prompt_merge_choice(s).await,
            StepId::StoreMergedRepositoryAndExit => self.store_merged_repository(s).await,
            StepId::StoreLocalRepositoryToCloudAndExit => self.store_local_repository_to_cloud(s).await,
            StepId::StoreCloudRepositoryToDeviceAndExit => self.store_cloud_repository_to_device(s).await,
        }
    }

    // ── Error translation ─────────────────────────────────────────────────────

    /// The single place where a step error becomes a user-facing message and
    /// a terminal outcome.
    async fn fail(&self, mode: ExecutionMode, step: StepId, err: SyncError) -> Outcome {
        let message = err.message_key();
        match &err {
            SyncError::Cloud(_) => warn!(?step, error = %err, ?message, "sync step failed"),
            _ => error!(?step, error = %err, ?message, "sync step failed"),
        }
        self.notify(mode, message, false).await;
        Outcome::Failed(message)
    }

    async fn notify(&self, mode: ExecutionMode, message: MessageKey, resume_busy: bool) {
        if mode.is_silent() {
            return;
        }
        self.hide_busy(mode);
        self.frontend.show_message(message).await;
        if resume_busy {
            self.show_busy(mode);
        }
    }

    fn show_busy(&self, mode: ExecutionMode) {
        if mode.contains(ExecutionMode::BUSY_INDICATOR) {
            self.frontend.show_busy();
        }
    }

    fn hide_busy(&self, mode: ExecutionMode) {
        if mode.contains(ExecutionMode::BUSY_INDICATOR) {
            self.frontend.hide_busy();
        }
    }

    // ── Cloud configuration ───────────────────────────────────────────────────

    async fn show_first_time_setup(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        if !s.mode.contains(ExecutionMode::DIALOGS) {
            return Ok(Transition::Terminate(Outcome::Aborted));
        }
        self.hide_busy(s.mode);
        let Some(credentials) = self.frontend.first_time_setup().await else {
            return Ok(Transition::Terminate(Outcome::Aborted));
        };
        self.show_busy(s.mode);

        let needs_oauth = self.cloud.oauth().is_some() && credentials.token.is_none();
        info!(storage = %credentials.storage_id, needs_oauth, "cloud storage chosen");
        s.credentials = Some(credentials);
        if needs_oauth {
            return Ok(Transition::Continue(StepId::OAuthAuthorize));
        }
        self.persist_credentials(s).await?;
        Ok(Transition::Continue(StepId::ExistsCloudRepository))
    }

    async fn oauth_authorize(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        let Some(oauth) = self.cloud.oauth() else {
            self.persist_credentials(s).await?;
            return Ok(Transition::Continue(StepId::ExistsCloudRepository));
        };
        if !s.mode.contains(ExecutionMode::DIALOGS) {
            return Ok(Transition::Terminate(Outcome::Aborted));
        }

        let state = random_token(32);
        let verifier = random_token(64);
        let url = oauth.build_authorization_url(&state, &pkce_challenge(&verifier));
        s.oauth_state = Some(state.clone());
        s.code_verifier = Some(verifier.clone());

        self.hide_busy(s.mode);
        let Some(redirect) = self.frontend.oauth_authorize(&url).await else {
            return Ok(Transition::Terminate(Outcome::Aborted));
        };
        self.show_busy(s.mode);

        let token = oauth.fetch_token(&redirect, &state, &verifier).await?;
        if let Some(credentials) = s.credentials.as_mut() {
            credentials.token = Some(token);
        }
        info!("OAuth token obtained");
        self.persist_credentials(s).await?;
        Ok(Transition::Continue(StepId::ExistsCloudRepository))
    }

    async fn persist_credentials(&self, s: &mut SyncSession) -> SyncResult<()> {
        s.settings.credentials = s.credentials.clone();
        self.save_settings(s).await
    }

    /// Refresh an OAuth token that is expired or about to expire.
    async fn refresh_token_if_needed(&self, s: &mut SyncSession) -> SyncResult<()> {
        let Some(oauth) = self.cloud.oauth() else {
            return Ok(());
        };
        let Some(token) = s.credentials.as_ref().and_then(|c| c.token.clone()) else {
            return Ok(());
        };
        if !token.needs_refresh(now_secs()) {
            return Ok(());
        }

        let refreshed = oauth.refresh_token(&token).await?;
        if let Some(credentials) = s.credentials.as_mut() {
            credentials.token = Some(refreshed);
        }
        info!("OAuth token refreshed");
        self.persist_credentials(s).await
    }

    fn credentials(&self, s: &SyncSession) -> SyncResult<CloudStorageCredentials> {
        s.credentials.clone().ok_or(SyncError::NotConfigured)
    }

    // ── Download and decrypt ──────────────────────────────────────────────────

    async fn exists_cloud_repository(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        self.refresh_token_if_needed(s).await?;
        let credentials = self.credentials(s)?;
        let exists = self
            .cloud
            .exists_file(&credentials, &self.options.cloud_file_name)
            .await?;
        debug!(exists, file = %self.options.cloud_file_name, "checked cloud repository");
        Ok(Transition::Continue(if exists {
            StepId::DownloadCloudRepository
        } else {
            StepId::StoreLocalRepositoryToCloudAndExit
        }))
    }

    async fn download_cloud_repository(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        if s.cached_blob.is_none() {
            let credentials = self.credentials(s)?;
            let blob = self
                .cloud
                .download_file(&credentials, &self.options.cloud_file_name)
                .await?;
            info!(bytes = blob.len(), "downloaded cloud repository");
            s.cached_blob = Some(blob);
        }
        Ok(Transition::Continue(StepId::ExistsTransferCode))
    }

    async fn prompt_for_transfer_code(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        if !s.mode.contains(ExecutionMode::DIALOGS) {
            return Ok(Transition::Terminate(Outcome::Aborted));
        }
        self.hide_busy(s.mode);
        let Some(answer) = self.frontend.prompt_transfer_code().await else {
            return Ok(Transition::Terminate(Outcome::Aborted));
        };
        self.show_busy(s.mode);

        s.entered_code = Some(transfer_code::sanitize(&answer));
        Ok(Transition::Continue(StepId::DecryptCloudRepository))
    }

    async fn decrypt_cloud_repository(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        let Some(blob) = s.cached_blob.clone() else {
            return Ok(Transition::Continue(StepId::DownloadCloudRepository));
        };
        let entered = s.entered_code.take();
        let mut codes = s.settings.transfer_codes.clone();
        let cryptor = self.cryptor.clone();
        let candidate = entered.clone();

        // Argon2 is CPU bound: keep it off the async workers
        let (resolved, codes) = tokio::task::spawn_blocking(move || {
            let resolved = resolve_and_promote(&cryptor, &blob, &mut codes, candidate.as_deref())?;
            Ok::<_, CryptoError>((resolved, codes))
        })
        .await??;

        let Some(resolved) = resolved else {
            if !s.mode.contains(ExecutionMode::DIALOGS) {
                return Err(SyncError::NoMatchingTransferCode);
            }
            return Ok(match entered {
                Some(_) => Transition::ContinueWithMessage(
                    StepId::PromptForTransferCode,
                    MessageKey::TransferCodeWrong,
                ),
                None => Transition::Continue(StepId::PromptForTransferCode),
            });
        };

        if codes != s.settings.transfer_codes {
            s.settings.transfer_codes = codes;
            self.save_settings(s).await?;
            info!(attempt = resolved.attempt, "adopted transfer code");
        }

        let repository = RepositorySnapshot::from_bytes(&resolved.plaintext)?;
        debug!(id = %repository.id, notes = repository.notes.len(), "decrypted cloud repository");
        s.cloud_repository = Some(repository);
        Ok(Transition::Continue(StepId::IsSameRepository))
    }

    // ── Compare and store ─────────────────────────────────────────────────────

    async fn is_same_repository(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        let local = self.local_repository(s).await?;
        let cloud = cloud_repository(s)?;

        if local.id == cloud.id {
            return Ok(Transition::Continue(StepId::StoreMergedRepositoryAndExit));
        }
        if is_pristine(&local) {
            // a device that never held a note simply joins the cloud repository
            info!(cloud_id = %cloud.id, "adopting cloud repository on empty device");
            return Ok(Transition::Continue(StepId::StoreCloudRepositoryToDeviceAndExit));
        }
        Ok(Transition::Continue(StepId::PromptMergeChoice))
    }

    async fn prompt_merge_choice(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        if !s.mode.contains(ExecutionMode::DIALOGS) {
            return Ok(Transition::Terminate(Outcome::Aborted));
        }
        self.hide_busy(s.mode);
        let choice = self.frontend.prompt_merge_choice().await;
        self.show_busy(s.mode);

        info!(?choice, "merge choice");
        Ok(match choice {
            Some(MergeChoice::Merge) => {
                s.adopt_cloud_id = true;
                Transition::Continue(StepId::StoreMergedRepositoryAndExit)
            }
            Some(MergeChoice::KeepLocal) => Transition::Continue(StepId::StoreLocalRepositoryToCloudAndExit),
            Some(MergeChoice::KeepCloud) => Transition::Continue(StepId::StoreCloudRepositoryToDeviceAndExit),
            None => Transition::Terminate(Outcome::Aborted),
        })
    }

    async fn store_merged_repository(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        let local = self.local_repository(s).await?;
        let cloud = cloud_repository(s)?;

        let mut merged = merge(&local, &cloud);
        if s.adopt_cloud_id {
            merged.id = cloud.id;
        }
        let fingerprint = merged.modification_fingerprint();

        if fingerprint != local.modification_fingerprint() || merged.id != local.id {
            self.save_local_repository(s, &merged).await?;
        } else {
            debug!("local repository unchanged, write skipped");
        }

        if fingerprint != cloud.modification_fingerprint() || s.pending_rotation.is_some() {
            self.upload(s, &merged).await?;
        } else {
            debug!("cloud repository unchanged, upload skipped");
        }
        self.finish(s).await
    }

    async fn store_local_repository_to_cloud(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        let local = self.local_repository(s).await?;
        self.upload(s, &local).await?;
        self.finish(s).await
    }

    async fn store_cloud_repository_to_device(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        let cloud = cloud_repository(s)?;
        self.save_local_repository(s, &cloud).await?;
        if s.pending_rotation.is_some() {
            self.upload(s, &cloud).await?;
        }
        self.finish(s).await
    }

    /// Encrypt `repository` and replace the cloud blob with it.
    ///
    /// Uses the pending rotation code when there is one, else the current
    /// code. A device without any code generates one, which is committed by
    /// [`finish`](Self::finish) like a rotation.
    async fn upload(&self, s: &mut SyncSession, repository: &RepositorySnapshot) -> SyncResult<()> {
        let code = match (&s.pending_rotation, &s.settings.transfer_codes.current) {
            (Some(pending), _) => pending.clone(),
            (None, Some(current)) => current.clone(),
            (None, None) => {
                let fresh = transfer_code::generate(&mut rand::thread_rng());
                s.pending_rotation = Some(fresh.clone());
                fresh
            }
        };

        let plaintext = repository.to_bytes()?;
        let cryptor = self.cryptor.clone();
        let options = self.options.clone();
        let blob = tokio::task::spawn_blocking(move || {
            cryptor.encrypt_with_password(
                &plaintext,
                &SecretString::from(code),
                CostTier::Low,
                &options.algorithm,
                &options.kdf,
                options.compression,
            )
        })
        .await??;

        let credentials = self.credentials(s)?;
        let bytes = blob.len();
        self.cloud
            .upload_file(&credentials, &self.options.cloud_file_name, blob)
            .await?;
        info!(bytes, id = %repository.id, "uploaded repository");
        Ok(())
    }

    /// Commit a pending code, record the sync time and terminate successfully.
    async fn finish(&self, s: &mut SyncSession) -> SyncResult<Transition> {
        let mut message = MessageKey::Synchronized;
        if let Some(code) = s.pending_rotation.take() {
            let rotated = s.settings.transfer_codes.current.is_some();
            s.settings.transfer_codes.promote(&code);
            if rotated {
                info!("transfer code rotated");
                message = MessageKey::TransferCodeChanged;
            } else {
                info!("transfer code created");
            }
            if s.mode.contains(ExecutionMode::DIALOGS) {
                self.hide_busy(s.mode);
                self.frontend
                    .show_transfer_code(&transfer_code::format_for_display(&code))
                    .await;
            }
        }
        s.settings.last_synced_at = Some(now_secs());
        self.save_settings(s).await?;
        Ok(Transition::Terminate(Outcome::Completed(message)))
    }

    // ── Local store ───────────────────────────────────────────────────────────

    async fn local_repository(&self, s: &mut SyncSession) -> SyncResult<RepositorySnapshot> {
        if let Some(repository) = &s.local_repository {
            return Ok(repository.clone());
        }
        let repository = self
            .local
            .load_repository_or_default()
            .await
            .map_err(SyncError::LocalStore)?;
        s.local_repository = Some(repository.clone());
        Ok(repository)
    }

    async fn save_local_repository(&self, s: &mut SyncSession, repository: &RepositorySnapshot) -> SyncResult<()> {
        self.local
            .try_save_repository(repository)
            .await
            .map_err(SyncError::LocalStore)?;
        info!(id = %repository.id, notes = repository.notes.len(), "stored repository on device");
        s.local_repository = Some(repository.clone());
        Ok(())
    }

    async fn save_settings(&self, s: &SyncSession) -> SyncResult<()> {
        self.local
            .try_save_settings(&s.settings)
            .await
            .map_err(SyncError::LocalStore)
    }
}

impl std::fmt::Debug for SyncStory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStory")
            .field("cloud", &self.cloud.id())
            .field("cryptor", &self.cryptor)
            .field("options", &self.options)
            .field("running", &self.guard.is_running())
            .finish_non_exhaustive()
    }
}

fn cloud_repository(s: &SyncSession) -> SyncResult<RepositorySnapshot> {
    s.cloud_repository
        .clone()
        .ok_or(SyncError::MissingState("decrypted cloud repository"))
}

fn is_pristine(repository: &RepositorySnapshot) -> bool {
    repository.notes.is_empty() && repository.deleted_notes.is_empty() && repository.safes.is_empty()
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success() {
        assert!(Outcome::Completed(MessageKey::Synchronized).is_success());
        assert!(!Outcome::Failed(MessageKey::Generic).is_success());
        assert!(!Outcome::Aborted.is_success());
        assert!(!Outcome::AlreadyRunning.is_success());
    }

    #[test]
    fn test_pristine() {
        let mut repo = RepositorySnapshot::new();
        assert!(is_pristine(&repo));
        repo.deleted_notes.insert(uuid::Uuid::new_v4());
        assert!(!is_pristine(&repo));
    }

    #[test]
    fn test_random_token() {
        let token = random_token(64);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, random_token(64));
    }
}
