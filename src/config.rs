use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::ClientConfig;
use crate::error::{ConfigError, Result};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RootConfig {
  pub blog: BlogConfig,
  pub contact: ContactConfig,
  #[serde(default)]
  pub client: ClientConfig,
}

impl RootConfig {
  pub fn load_from_file(path: &Path) -> Result<Self> {
    let f = std::fs::File::open(path)?;
    let config = serde_yaml::from_reader(f).map_err(ConfigError::from)?;
    Ok(config)
  }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BlogConfig {
  /// The upstream syndication feed to ingest
  pub feed_url: Url,
  /// How many entries make it into the preview list
  #[serde(default = "default_limit")]
  pub limit: usize,
}

fn default_limit() -> usize {
  3
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ContactConfig {
  /// Where contact submissions end up (the site owner's address)
  pub recipient: String,
  /// The From mailbox, e.g. "Portfolio Site <owner@example.com>"
  pub from: String,
  pub smtp: SmtpConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SmtpConfig {
  pub host: String,
  pub username: String,
  /// Name of the environment variable holding the SMTP password. The
  /// credential itself never lives in the config file.
  #[serde(default = "default_password_env")]
  pub password_env: String,
}

fn default_password_env() -> String {
  "EMAIL_PASSWORD".to_string()
}
