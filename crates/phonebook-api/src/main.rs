//! phonebook-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `PHONEBOOK_*` environment variables, opens the SQLite store, and serves
//! the JSON API over HTTP until interrupted.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use phonebook_api::{AppState, ServerConfig};
use phonebook_core::store::ContactStore as _;
use phonebook_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Phonebook HTTP API server")]
struct Cli {
  /// Path to the TOML configuration file. A missing file is not an error.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = load_config(cli.config)?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let existing = store.count().await.context("failed to count contacts")?;
  tracing::info!(path = ?store_path, contacts = existing, "store opened");

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!("phonebook API listening on http://{address}");

  let app = phonebook_api::router(AppState::new(store));
  tokio::select! {
    served = axum::serve(listener, app) => served.context("server error")?,
    _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
  }

  Ok(())
}

/// Layer the optional config file under `PHONEBOOK_*` environment variables.
fn load_config(path: PathBuf) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("PHONEBOOK"))
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("invalid server configuration")
}

/// Expand a leading `~/` to `$HOME`.
fn expand_tilde(path: &Path) -> PathBuf {
  match path.to_string_lossy().strip_prefix("~/") {
    Some(rest) => match std::env::var_os("HOME") {
      Some(home) => PathBuf::from(home).join(rest),
      None => path.to_path_buf(),
    },
    None => path.to_path_buf(),
  }
}
