use std::{
  net::SocketAddr,
  path::{Path, PathBuf},
};

use config::{Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::{
  app::{consts::*, errors::StagsError},
  utils::get_config_dir,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenConfig {
  pub host: String,
  pub port: u16,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
  pub server_url: String,
  #[serde(default)]
  pub api_key: String,
  #[serde(default)]
  pub ca_cert: Option<PathBuf>,
}

impl std::fmt::Debug for AuthConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AuthConfig")
      .field("server_url", &self.server_url)
      .field("ca_cert", &self.ca_cert)
      .finish_non_exhaustive()
  }
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
  pub cookie_name: String,
  /// 64 hex characters. A random key is generated when absent.
  #[serde(default)]
  pub secret: Option<String>,
}

impl std::fmt::Debug for SessionConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SessionConfig").field("cookie_name", &self.cookie_name).finish_non_exhaustive()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub database_url: Option<String>,
  pub pool_size: usize,
  pub listen: ListenConfig,
  pub auth: AuthConfig,
  pub session: SessionConfig,
}

impl Config {
  /// Defaults, then `config.toml` in the config directory, then `explicit`, then
  /// `STAGS__*` environment variables. A `.env` file is loaded first and a plain
  /// `DATABASE_URL` wins over everything.
  pub fn new(explicit: Option<&Path>) -> Result<Self, StagsError> {
    dotenv::dotenv().ok();
    let platform = get_config_dir().join("config.toml");
    debug!(path = %platform.display(), "looking for config file");

    let mut builder = Config::defaults()?.add_source(File::from(platform).required(false));
    if let Some(path) = explicit {
      builder = builder.add_source(File::from(path).required(true));
    }
    builder = builder
      .add_source(Environment::with_prefix(&PROJECT_NAME).prefix_separator("__").separator("__"));

    let mut config: Config = builder.build()?.try_deserialize()?;
    if let Ok(url) = std::env::var("DATABASE_URL") {
      config.database_url = Some(url);
    }
    Ok(config)
  }

  /// Defaults overlaid with a single file, ignoring the environment.
  pub fn from_file(path: &Path) -> Result<Self, StagsError> {
    Ok(Config::defaults()?.add_source(File::from(path).required(true)).build()?.try_deserialize()?)
  }

  fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, StagsError> {
    Ok(
      config::Config::builder()
        .set_default("pool_size", DEFAULT_POOL_SIZE as i64)?
        .set_default("listen.host", DEFAULT_LISTEN_HOST)?
        .set_default("listen.port", DEFAULT_LISTEN_PORT as i64)?
        .set_default("auth.server_url", DEFAULT_AUTH_SERVER)?
        .set_default("auth.api_key", "")?
        .set_default("session.cookie_name", DEFAULT_COOKIE_NAME)?,
    )
  }

  /// Listening address, with `port` overriding the configured one.
  pub fn listen_addr(&self, port: Option<u16>) -> Result<SocketAddr, StagsError> {
    let port = port.unwrap_or(self.listen.port);
    format!("{}:{}", self.listen.host, port).parse().map_err(|e| {
      StagsError::Other(format!("invalid listen address {}:{}: {}", self.listen.host, port, e))
    })
  }
}
