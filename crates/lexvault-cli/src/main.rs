//! CLI entry point for LexVault.
//!
//! This binary provides the `lexvault` command: register this device with a
//! LexVault server, store and read document fields in the local encrypted
//! vault, and push/pull encrypted backups.
//!
//! The passphrase is taken from the `LEXVAULT_PASSPHRASE` environment
//! variable (a `.env` file is honored) so it never appears in shell history
//! or process listings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use lexvault_core::crypto::derive_master_key;
use lexvault_core::{MasterKey, SensitivityRegistry};
use lexvault_store::VaultStore;
use lexvault_sync::{DeviceIdentity, HttpRemote, SyncAgent, unlock};

/// Default server when neither `--server` nor `LEXVAULT_SERVER` is set.
const DEFAULT_SERVER: &str = "http://localhost:3000";

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// LexVault — client-side encrypted vault for legal document fields.
#[derive(Parser)]
#[command(
    name = "lexvault",
    version,
    about = "LexVault — client-side encrypted vault for legal document fields",
    long_about = "Stores document form fields encrypted at rest under a key derived from \
                  your passphrase, and synchronizes an encrypted backup bundle with a \
                  LexVault server. The passphrase and decrypted values never leave this \
                  machine."
)]
struct Cli {
    /// Directory holding the local vault database and device identity.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Base URL of the LexVault server (overrides LEXVAULT_SERVER).
    #[arg(long)]
    server: Option<Url>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register this device with the server and unlock the vault once.
    Register {
        /// Account email address.
        email: String,
        /// Optional human-readable device name.
        #[arg(long)]
        device_name: Option<String>,
    },

    /// Store one field value (encrypted if the field is sensitive).
    Put { field: String, value: String },

    /// Read one field value.
    Get { field: String },

    /// List stored fields and whether each is encrypted at rest.
    List,

    /// Encrypt the whole vault into one bundle and push it to the server.
    Backup {
        /// Owner name sent as public metadata next to the encrypted bundle.
        #[arg(long)]
        owner_name: String,
    },

    /// Fetch the remote bundle and repopulate the local vault from it.
    Restore,

    /// Delete every locally stored field.
    Clear,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Register { email, device_name } => {
            cmd_register(&cli.data_dir, cli.server, &email, device_name.as_deref()).await
        }
        Commands::Put { field, value } => cmd_put(&cli.data_dir, &field, &value).await,
        Commands::Get { field } => cmd_get(&cli.data_dir, &field).await,
        Commands::List => cmd_list(&cli.data_dir).await,
        Commands::Backup { owner_name } => {
            cmd_backup(&cli.data_dir, cli.server, &owner_name).await
        }
        Commands::Restore => cmd_restore(&cli.data_dir, cli.server).await,
        Commands::Clear => cmd_clear(&cli.data_dir).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn cmd_register(
    data_dir: &Path,
    server: Option<Url>,
    email: &str,
    device_name: Option<&str>,
) -> Result<()> {
    let passphrase = passphrase_from_env()?;
    let remote = Arc::new(HttpRemote::new(server_url(server)?));
    let mut identity =
        DeviceIdentity::load_or_create(data_dir).context("failed to load device identity")?;

    let session = unlock(
        remote.as_ref(),
        &mut identity,
        email,
        &passphrase,
        device_name,
    )
    .await
    .context("device registration failed")?;

    info!(user_id = %session.user_id(), "device registered");
    println!("Registered. Account id: {}", session.user_id());
    Ok(())
}

async fn cmd_put(data_dir: &Path, field: &str, value: &str) -> Result<()> {
    let (store, key, _) = open_unlocked(data_dir)?;
    store
        .put(field, value, &key)
        .await
        .with_context(|| format!("failed to store field `{field}`"))?;
    println!("Stored `{field}`.");
    Ok(())
}

async fn cmd_get(data_dir: &Path, field: &str) -> Result<()> {
    let (store, key, _) = open_unlocked(data_dir)?;
    match store
        .get(field, &key)
        .await
        .with_context(|| format!("failed to read field `{field}`"))?
    {
        Some(value) => println!("{value}"),
        None => bail!("field `{field}` is not stored"),
    }
    Ok(())
}

async fn cmd_list(data_dir: &Path) -> Result<()> {
    let (store, _, _) = open_unlocked(data_dir)?;
    let entries = store.entries().await.context("failed to list fields")?;

    if entries.is_empty() {
        println!("Vault is empty.");
        return Ok(());
    }

    for (field, entry) in &entries {
        let shape = if entry.is_encrypted() {
            "encrypted"
        } else {
            "plaintext"
        };
        println!("{field}  [{shape}]");
    }
    Ok(())
}

async fn cmd_backup(data_dir: &Path, server: Option<Url>, owner_name: &str) -> Result<()> {
    let (store, key, user_id) = open_unlocked(data_dir)?;
    let remote = Arc::new(HttpRemote::new(server_url(server)?));
    let agent = SyncAgent::new(store, remote);

    let report = agent
        .backup(&user_id, &key, owner_name)
        .await
        .context("backup failed before reaching the server")?;

    if report.success {
        println!(
            "Backup accepted (id: {}, cloud synced: {}).",
            report.id.as_deref().unwrap_or("-"),
            report.cloud_synced
        );
    } else {
        println!(
            "Backup failed: {}. The local vault is unchanged; retry later.",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

async fn cmd_restore(data_dir: &Path, server: Option<Url>) -> Result<()> {
    let (store, key, user_id) = open_unlocked(data_dir)?;
    let remote = Arc::new(HttpRemote::new(server_url(server)?));
    let agent = SyncAgent::new(store, remote);

    let restored = agent
        .restore(&user_id, &key)
        .await
        .context("restore failed")?;

    println!("Restored {restored} field(s) from the server.");
    Ok(())
}

async fn cmd_clear(data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    store.clear().await.context("failed to clear the vault")?;
    println!("Vault cleared.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Open the local store and re-derive the master key for a registered
/// device.
///
/// Registration stores the server-assigned user id; from then on every
/// command derives the key offline from `LEXVAULT_PASSPHRASE` + that id.
fn open_unlocked(data_dir: &Path) -> Result<(VaultStore, MasterKey, String)> {
    let identity =
        DeviceIdentity::load_or_create(data_dir).context("failed to load device identity")?;

    let Some(user_id) = identity.user_id().map(str::to_string) else {
        bail!("this device is not registered yet — run `lexvault register <email>` first");
    };

    let passphrase = passphrase_from_env()?;
    let key = derive_master_key(&passphrase, &user_id).context("key derivation failed")?;

    Ok((open_store(data_dir)?, key, user_id))
}

fn open_store(data_dir: &Path) -> Result<VaultStore> {
    std::fs::create_dir_all(data_dir).context("failed to create data directory")?;
    let db_path = data_dir.join("vault.db");
    VaultStore::open(&db_path, SensitivityRegistry::default())
        .with_context(|| format!("failed to open vault store at {}", db_path.display()))
}

fn passphrase_from_env() -> Result<String> {
    match std::env::var("LEXVAULT_PASSPHRASE") {
        Ok(passphrase) if !passphrase.is_empty() => Ok(passphrase),
        _ => bail!("set LEXVAULT_PASSPHRASE (directly or via .env) to use the vault"),
    }
}

fn server_url(flag: Option<Url>) -> Result<Url> {
    if let Some(url) = flag {
        return Ok(url);
    }
    let raw = std::env::var("LEXVAULT_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
    Url::parse(&raw).with_context(|| format!("invalid server url `{raw}`"))
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
