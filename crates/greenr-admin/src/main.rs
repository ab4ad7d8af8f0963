//! greenr database administration binary.
//!
//! Reads `greenr.toml` (or the path given with `--config`, with `GREENR_*`
//! environment overrides), opens the SQLite store, and runs one of:
//!
//! - `migrate` — apply any pending schema migrations and exit
//! - `seed` — provision development fixtures (safe to re-run)
//! - `hash-password` — print the argon2 PHC string for a password entered on
//!   stdin, e.g. to craft a user row by hand

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use greenr_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod seed;

#[derive(Debug, Clone, Deserialize)]
struct AdminConfig {
  #[serde(default = "default_store_path")]
  store_path: PathBuf,

  #[serde(default)]
  seed: seed::SeedConfig,
}

fn default_store_path() -> PathBuf { PathBuf::from("greenr.db") }

#[derive(Parser)]
#[command(author, version, about = "greenr database administration")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "greenr.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Open the database and apply any pending schema migrations.
  Migrate,
  /// Provision development seed data. Safe to re-run.
  Seed,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::HashPassword => {
      let password = read_password()?;
      println!("{}", seed::hash_password(&password)?);
    }
    Command::Migrate => {
      // Opening the store applies pending migrations.
      let admin_cfg = load_config(cli.config)?;
      open_store(&admin_cfg).await?;
    }
    Command::Seed => {
      let admin_cfg = load_config(cli.config)?;
      let store = open_store(&admin_cfg).await?;
      seed::run(&store, &admin_cfg.seed).await?;
    }
  }

  Ok(())
}

fn load_config(config_path: PathBuf) -> anyhow::Result<AdminConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(config_path).required(false))
    .add_source(config::Environment::with_prefix("GREENR"))
    .build()
    .context("failed to read config")?;

  settings
    .try_deserialize()
    .context("failed to deserialise AdminConfig")
}

async fn open_store(admin_cfg: &AdminConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&admin_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let version = store.schema_version().await?;
  tracing::info!(
    path = %store_path.display(),
    schema = version,
    "store open"
  );
  Ok(store)
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
