use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use http::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

pub const USER_AGENT: &str =
  concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientConfig {
  user_agent: Option<String>,
  #[serde(default = "default_cache_ttl")]
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  cache_ttl: Duration,
  #[serde(default = "default_timeout")]
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  timeout: Duration,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      user_agent: None,
      cache_ttl: default_cache_ttl(),
      timeout: default_timeout(),
    }
  }
}

impl ClientConfig {
  pub fn build(&self) -> Result<Client> {
    let mut builder = reqwest::Client::builder().timeout(self.timeout);

    if let Some(user_agent) = &self.user_agent {
      builder = builder.user_agent(user_agent);
    } else {
      builder = builder.user_agent(USER_AGENT);
    }

    Ok(Client {
      client: builder.build()?,
      cache: FreshCache::new(self.cache_ttl),
    })
  }
}

pub struct Client {
  client: reqwest::Client,
  cache: FreshCache,
}

impl Client {
  /// Fetches `url`, reusing the last successful response while it is
  /// still within the freshness window. Error responses are returned
  /// but never cached.
  pub async fn get(&self, url: &Url) -> Result<Response> {
    if let Some(resp) = self.cache.get_fresh(url) {
      return Ok(resp);
    }

    let resp = self.client.get(url.clone()).send().await?;
    let resp = Response::from_reqwest_resp(resp).await?;
    if resp.status().is_success() {
      self.cache.insert(url.clone(), resp.clone());
    }
    Ok(resp)
  }
}

#[derive(Clone)]
pub struct Response {
  inner: Arc<InnerResponse>,
}

struct InnerResponse {
  status: StatusCode,
  body: Box<[u8]>,
}

impl Response {
  async fn from_reqwest_resp(resp: reqwest::Response) -> Result<Self> {
    let status = resp.status();
    let body = resp.bytes().await?.to_vec().into_boxed_slice();

    Ok(Self {
      inner: Arc::new(InnerResponse { status, body }),
    })
  }

  #[cfg(test)]
  pub fn from_parts(status: StatusCode, body: &[u8]) -> Self {
    Self {
      inner: Arc::new(InnerResponse {
        status,
        body: body.to_vec().into_boxed_slice(),
      }),
    }
  }

  pub fn error_for_status(self) -> Result<Self> {
    let status = self.inner.status;
    if status.is_client_error() || status.is_server_error() {
      return Err(Error::FetchStatus(status));
    }

    Ok(self)
  }

  pub fn status(&self) -> StatusCode {
    self.inner.status
  }

  pub fn body(&self) -> &[u8] {
    &self.inner.body
  }
}

// Freshness window over the last successful response. The ingestor only
// ever asks for one fixed feed URL, so a single slot is enough.
struct FreshCache {
  ttl: Duration,
  slot: Mutex<Option<(Url, Instant, Response)>>,
}

impl FreshCache {
  fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      slot: Mutex::new(None),
    }
  }

  fn get_fresh(&self, url: &Url) -> Option<Response> {
    if self.ttl.is_zero() {
      return None;
    }

    let slot = self.slot.lock().expect("cache lock poisoned");
    match slot.as_ref() {
      Some((cached_url, at, resp))
        if cached_url == url && at.elapsed() < self.ttl =>
      {
        Some(resp.clone())
      }
      _ => None,
    }
  }

  fn insert(&self, url: Url, resp: Response) {
    if self.ttl.is_zero() {
      return;
    }

    let mut slot = self.slot.lock().expect("cache lock poisoned");
    *slot = Some((url, Instant::now(), resp));
  }
}

fn default_timeout() -> Duration {
  Duration::from_secs(10)
}

fn default_cache_ttl() -> Duration {
  Duration::from_secs(60 * 60)
}
