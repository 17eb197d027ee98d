//! nsync: encrypted note repository sync
//!
//! Commands:
//!   sync [--mode gui|semi|silent]   - run one sync against the configured cloud storage
//!   transfer-code show              - print the transfer code other devices need
//!   transfer-code new               - rotate the transfer code and re-upload the repository
//!   status                          - local repository, settings and cloud reachability
//!   inspect <file>                  - print the envelope header of an encrypted blob
//!   config show                     - display the active configuration

mod frontend;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nsync_core::config::{expand_tilde, Argon2CostConfig, CryptoConfig, NsyncConfig};
use nsync_core::transfer_code::format_for_display;
use nsync_crypto::{CipherRegistry, Compression, Cryptor, KdfParams, KdfRegistry, OsRandom};
use nsync_storage::{check_health, CloudHealth, JsonFileStore, LocalStore, OpendalCloudClient};
use nsync_sync::{ExecutionMode, Outcome, SyncOptions, SyncReport, SyncStory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::frontend::TerminalFrontend;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "nsync",
    version,
    about = "Encrypted note repository sync",
    long_about = "nsync: keep a note repository in sync across devices through an untrusted cloud storage"
)]
struct Cli {
    /// Path to nsync.toml configuration file
    #[arg(long, short = 'c', env = "NSYNC_CONFIG", default_value = "~/.config/nsync/config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "NSYNC_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "NSYNC_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize the local repository with the cloud
    Sync {
        /// Execution mode: gui, semi or silent (default: from config)
        #[arg(long, short = 'm')]
        mode: Option<ExecutionMode>,
    },

    /// Transfer code management
    #[command(name = "transfer-code")]
    TransferCode {
        #[command(subcommand)]
        action: TransferCodeAction,
    },

    /// Show local repository, settings and cloud status
    Status,

    /// Print the envelope header of an encrypted file without decrypting it
    Inspect {
        /// Encrypted blob (e.g. a downloaded cloud repository)
        file: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum TransferCodeAction {
    /// Print the current transfer code
    Show,
    /// Generate a new transfer code and re-encrypt the cloud repository with it
    New,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = NsyncConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    match cli.command {
        Commands::Sync { mode } => cmd_sync(&config, mode).await,
        Commands::TransferCode { action: TransferCodeAction::Show } => cmd_transfer_code_show(&config).await,
        Commands::TransferCode { action: TransferCodeAction::New } => cmd_transfer_code_new(&config).await,
        Commands::Status => cmd_status(&config).await,
        Commands::Inspect { file } => cmd_inspect(&config, &file).await,
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout belongs to command output
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

fn data_dir(config: &NsyncConfig) -> PathBuf {
    expand_tilde(&config.sync.data_dir)
}

fn kdf_params(cost: Argon2CostConfig) -> KdfParams {
    KdfParams {
        mem_cost_kib: cost.mem_cost_kib,
        time_cost: cost.time_cost,
        parallelism: cost.parallelism,
    }
}

fn build_cryptor(crypto: &CryptoConfig) -> Cryptor {
    let tiers = &crypto.argon2;
    Cryptor::new(
        crypto.package_name.clone(),
        CipherRegistry::with_defaults(),
        KdfRegistry::with_argon2_tiers(kdf_params(tiers.low), kdf_params(tiers.default), kdf_params(tiers.high)),
        Arc::new(OsRandom),
    )
}

fn sync_options(config: &NsyncConfig) -> Result<SyncOptions> {
    let compression = match config.crypto.compression.as_str() {
        "" => None,
        name => Some(Compression::from_name(name).context("crypto.compression")?),
    };
    Ok(SyncOptions {
        cloud_file_name: config.sync.cloud_file_name.clone(),
        algorithm: config.crypto.algorithm.clone(),
        kdf: config.crypto.kdf.clone(),
        compression,
    })
}

fn build_story(config: &NsyncConfig) -> Result<SyncStory> {
    let cloud = OpendalCloudClient::new(config.storage.clone()).context("building cloud storage client")?;
    let local = JsonFileStore::new(data_dir(config));
    let frontend = TerminalFrontend::new(config.storage.backend.clone());
    Ok(SyncStory::new(
        Arc::new(cloud),
        Arc::new(local),
        Arc::new(frontend),
        build_cryptor(&config.crypto),
        sync_options(config)?,
    ))
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

fn report_outcome(report: &SyncReport) -> Result<()> {
    info!(outcome = ?report.outcome, steps = ?report.steps, "sync report");
    match report.outcome {
        Outcome::Completed(_) => Ok(()),
        Outcome::Aborted => {
            eprintln!("sync aborted");
            Ok(())
        }
        Outcome::Cancelled => {
            eprintln!("sync cancelled");
            Ok(())
        }
        Outcome::AlreadyRunning => {
            eprintln!("a sync is already running");
            Ok(())
        }
        Outcome::Failed(message) => anyhow::bail!("sync failed: {message}"),
    }
}

// ── `nsync sync` ──────────────────────────────────────────────────────────────

async fn cmd_sync(config: &NsyncConfig, mode: Option<ExecutionMode>) -> Result<()> {
    let mode = match mode {
        Some(mode) => mode,
        None => config
            .sync
            .default_mode
            .parse()
            .map_err(|e: String| anyhow::anyhow!("sync.default_mode: {e}"))?,
    };
    let story = build_story(config)?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    let report = story.run_cancellable(mode, cancel).await;
    report_outcome(&report)
}

// ── `nsync transfer-code` ─────────────────────────────────────────────────────

async fn cmd_transfer_code_show(config: &NsyncConfig) -> Result<()> {
    let store = JsonFileStore::new(data_dir(config));
    let settings = store.load_settings_or_default().await?;

    match &settings.transfer_codes.current {
        Some(code) => {
            println!("{}", format_for_display(code));
            if !settings.transfer_codes.history.is_empty() {
                println!(
                    "  ({} earlier code(s) remembered)",
                    settings.transfer_codes.history.len()
                );
            }
        }
        None => println!("no transfer code yet: run `nsync sync` first"),
    }
    Ok(())
}

async fn cmd_transfer_code_new(config: &NsyncConfig) -> Result<()> {
    let story = build_story(config)?;
    let report = story.run_with_rotation(ExecutionMode::interactive()).await;
    report_outcome(&report)
}

// ── `nsync status` ────────────────────────────────────────────────────────────

async fn cmd_status(config: &NsyncConfig) -> Result<()> {
    let store = JsonFileStore::new(data_dir(config));
    let repository = store.load_repository_or_default().await?;
    let settings = store.load_settings_or_default().await?;

    println!("nsync v{}", env!("CARGO_PKG_VERSION"));
    println!("  data dir:     {}", store.dir().display());
    println!("  repository:   {}", repository.id);
    println!("  notes:        {}", repository.notes.len());
    println!("  tombstones:   {}", repository.deleted_notes.len());
    println!("  safes:        {}", repository.safes.len());
    println!(
        "  transfer code: {}",
        if settings.transfer_codes.current.is_some() { "set" } else { "none" }
    );
    match settings.last_synced_at {
        Some(secs) => println!("  last synced:  {secs} (unix seconds)"),
        None => println!("  last synced:  never"),
    }

    let Some(credentials) = &settings.credentials else {
        println!("  cloud:        not configured");
        return Ok(());
    };
    println!("  cloud:        {} ({})", config.storage.backend, credentials.storage_id);

    let cloud = OpendalCloudClient::new(config.storage.clone()).context("building cloud storage client")?;
    match check_health(&cloud, credentials, &config.sync.cloud_file_name).await {
        CloudHealth::Reachable { repository_present } => {
            println!(
                "  reachable:    yes (repository {})",
                if repository_present { "present" } else { "absent" }
            );
        }
        CloudHealth::AccessDenied(reason) => println!("  reachable:    access denied: {reason}"),
        CloudHealth::Unreachable(reason) => println!("  reachable:    no: {reason}"),
    }
    Ok(())
}

// ── `nsync inspect` ───────────────────────────────────────────────────────────

async fn cmd_inspect(config: &NsyncConfig, file: &Path) -> Result<()> {
    let blob = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let header = build_cryptor(&config.crypto)
        .inspect(&blob)
        .with_context(|| format!("inspecting {}", file.display()))?;

    println!("{}", file.display());
    println!("  package:      {}", header.package_name);
    println!("  revision:     {}", header.revision);
    println!("  algorithm:    {}", header.algorithm);
    println!("  nonce:        {} bytes", header.nonce.len());
    println!("  kdf:          {}", header.kdf);
    match &header.salt {
        Some(salt) => println!("  salt:         {} bytes", salt.len()),
        None => println!("  salt:         none"),
    }
    println!("  cost:         {}", header.cost);
    println!(
        "  compression:  {}",
        header.compression.as_deref().unwrap_or("none")
    );
    println!("  total size:   {} bytes", blob.len());
    Ok(())
}

// ── `nsync config show` ───────────────────────────────────────────────────────

fn cmd_config_show(config: &NsyncConfig, path: &Path) -> Result<()> {
    println!("# config: {}", path.display());
    let rendered = toml::to_string_pretty(config).context("serializing config")?;
    print!("{rendered}");
    Ok(())
}
