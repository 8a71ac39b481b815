//! casebook server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, creates the bootstrap administrator if configured, and
//! serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `bootstrap_admin_password_hash`:
//!
//! ```text
//! cargo run -p casebook-server -- --hash-password
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use casebook_api::{AppState, auth::hash_password};
use casebook_core::{
  activity::{ActivityKind, NewActivity},
  actor::Role,
  store::{CaseStore, NewActor},
};
use casebook_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Casebook case-management server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
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

  if cli.hash_password {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let server_cfg = ServerConfig::load(&cli.config)?;
  let store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  bootstrap_admin(&store, &server_cfg).await?;

  let state = AppState::new(Arc::new(store), server_cfg.lieutenant_fallback);
  let app = casebook_api::api_router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(
    lieutenant_fallback = ?server_cfg.lieutenant_fallback,
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Create the configured administrator unless an actor with that name exists.
async fn bootstrap_admin(store: &SqliteStore, cfg: &ServerConfig) -> anyhow::Result<()> {
  let Some((username, password_hash)) = cfg.bootstrap_admin() else {
    return Ok(());
  };

  if store
    .find_credentials(username)
    .await
    .context("failed to look up bootstrap administrator")?
    .is_some()
  {
    tracing::debug!(%username, "bootstrap administrator already present");
    return Ok(());
  }

  let actor = store
    .add_actor(NewActor {
      username:      username.to_owned(),
      role:          Role::Administrator,
      password_hash: password_hash.to_owned(),
    })
    .await
    .context("failed to create bootstrap administrator")?;

  store
    .log_activity(NewActivity {
      actor_id:    None,
      kind:        ActivityKind::Create,
      description: format!("bootstrap administrator {username}"),
    })
    .await
    .context("failed to record bootstrap activity")?;

  tracing::info!(actor_id = %actor.actor_id, %username, "created bootstrap administrator");
  Ok(())
}

/// Read one password line from stdin.
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
