use http::StatusCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("YAML parse error")]
  Yaml(#[from] serde_yaml::Error),

  #[error("invalid mail address {0:?}")]
  MailAddress(String),

  #[error("missing environment variable {0}")]
  MissingEnv(String),

  #[error("{0}")]
  Message(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("IO error")]
  Io(#[from] std::io::Error),

  #[error("upstream feed returned status {0}")]
  FetchStatus(StatusCode),

  #[error("failed to reach upstream {0:?}")]
  Fetch(#[from] reqwest::Error),

  #[error("feed parsing error {0:?}")]
  Parse(#[from] rss::Error),

  // carries the user-facing text; the only variant that crosses the
  // boundary verbatim
  #[error("{0}")]
  Validation(&'static str),

  #[error("failed to compose mail {0:?}")]
  Compose(#[from] lettre::error::Error),

  #[error("mail delivery failed: {0}")]
  Delivery(String),

  #[error("JSON error")]
  Json(#[from] serde_json::Error),

  #[error("config error {0:?}")]
  Config(#[from] ConfigError),
}
