//! Terminal frontend: prompts on stdin, hidden input for secrets, a spinner
//! while a sync is busy.

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use nsync_core::CloudStorageCredentials;
use nsync_sync::{MergeChoice, MessageKey, SyncFrontend};
use std::io::{BufRead, Write};
use std::sync::Mutex;
use std::time::Duration;

pub struct TerminalFrontend {
    /// Backend name recorded as the storage id of new credentials
    storage_id: String,
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalFrontend {
    pub fn new(storage_id: String) -> Self {
        Self {
            storage_id,
            spinner: Mutex::new(None),
        }
    }
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.set_message("synchronizing...");
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Print `prompt` and read one line. Empty input or EOF is `None`.
fn read_line(prompt: &str) -> Option<String> {
    eprint!("{prompt}");
    std::io::stderr().flush().ok()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).ok()?;
    let line = line.trim();
    (!line.is_empty()).then(|| line.to_string())
}

fn read_secret(prompt: &str) -> Option<String> {
    rpassword::prompt_password(prompt)
        .ok()
        .filter(|s| !s.trim().is_empty())
}

/// Run a blocking stdin prompt without stalling the runtime.
async fn blocking<T, F>(f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> Option<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.ok().flatten()
}

#[async_trait]
impl SyncFrontend for TerminalFrontend {
    async fn first_time_setup(&self) -> Option<CloudStorageCredentials> {
        let storage_id = self.storage_id.clone();
        blocking(move || {
            eprintln!("No cloud storage configured yet ({storage_id}).");
            let url = read_line("Storage URL or path (empty for config default): ");
            let username = read_line("User name / access key (optional): ");
            let password = match username {
                Some(_) => read_secret("Password / secret key: "),
                None => None,
            };
            let confirm = read_line("Use this storage? [Y/n] ");
            if matches!(confirm.as_deref(), Some("n" | "N" | "no")) {
                return None;
            }
            Some(CloudStorageCredentials {
                storage_id,
                url,
                username,
                password,
                token: None,
            })
        })
        .await
    }

    async fn oauth_authorize(&self, authorization_url: &str) -> Option<String> {
        let url = authorization_url.to_string();
        blocking(move || {
            eprintln!("Open this URL in a browser and grant access:\n\n  {url}\n");
            read_line("Paste the URL you were redirected to: ")
        })
        .await
    }

    async fn prompt_transfer_code(&self) -> Option<String> {
        blocking(|| {
            eprintln!("The cloud holds a repository from another device.");
            read_secret("Transfer code (shown on the other device): ")
        })
        .await
    }

    async fn prompt_merge_choice(&self) -> Option<MergeChoice> {
        blocking(|| {
            eprintln!("The cloud holds a different repository than this device.");
            eprintln!("  [m] merge both (keeps the cloud identity)");
            eprintln!("  [l] keep this device's notes and overwrite the cloud");
            eprintln!("  [c] keep the cloud notes and overwrite this device");
            match read_line("Choice [m/l/c, empty cancels]: ")?.to_ascii_lowercase().as_str() {
                "m" | "merge" => Some(MergeChoice::Merge),
                "l" | "local" => Some(MergeChoice::KeepLocal),
                "c" | "cloud" => Some(MergeChoice::KeepCloud),
                _ => None,
            }
        })
        .await
    }

    async fn show_transfer_code(&self, code: &str) {
        println!("Transfer code for your other devices: {code}");
    }

    async fn show_message(&self, message: MessageKey) {
        if message.is_error() {
            eprintln!("{message}");
        } else {
            println!("{message}");
        }
    }

    fn show_busy(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if slot.is_none() {
                *slot = Some(make_spinner("sync"));
            }
        }
    }

    fn hide_busy(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }
}
