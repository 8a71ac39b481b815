//! Runtime configuration, layered from an optional TOML file and
//! `CASEBOOK_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use casebook_core::report::LieutenantFallback;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                          String,
  #[serde(default = "default_port")]
  pub port:                          u16,
  pub store_path:                    PathBuf,
  #[serde(default)]
  pub lieutenant_fallback:           LieutenantFallback,
  /// Created as an administrator at startup when no actor has this name.
  #[serde(default)]
  pub bootstrap_admin_username:      Option<String>,
  /// Argon2 PHC string; see `--hash-password`.
  #[serde(default)]
  pub bootstrap_admin_password_hash: Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  /// Read `path` (if it exists) and overlay the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CASEBOOK"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  /// The bootstrap administrator, when both halves are configured.
  pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
    match (&self.bootstrap_admin_username, &self.bootstrap_admin_password_hash) {
      (Some(user), Some(hash)) if !user.trim().is_empty() && !hash.is_empty() => {
        Some((user.trim(), hash.as_str()))
      }
      _ => None,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
