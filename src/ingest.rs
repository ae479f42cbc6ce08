use std::io::Cursor;

use tracing::debug;
use url::Url;

use crate::client::Client;
use crate::config::BlogConfig;
use crate::error::Result;
use crate::feed::FeedEntry;

/// Fetches the configured upstream feed and turns it into the list of
/// normalized entries the presentation layer renders.
pub struct Ingestor {
  feed_url: Url,
  limit: usize,
  client: Client,
}

impl Ingestor {
  pub fn new(config: &BlogConfig, client: Client) -> Self {
    Self {
      feed_url: config.feed_url.clone(),
      limit: config.limit,
      client,
    }
  }

  /// One fetch, one parse, first `limit` entries in document order.
  /// Upstream ordering is trusted; no sorting or date filtering.
  pub async fn ingest(&self) -> Result<Vec<FeedEntry>> {
    let resp = self.client.get(&self.feed_url).await?.error_for_status()?;
    let entries = entries_from_xml(resp.body(), self.limit)?;
    debug!("ingested {} entries from {}", entries.len(), self.feed_url);
    Ok(entries)
  }
}

/// Parses a raw RSS document and normalizes the first `limit` items.
/// `rss::Channel` models items as a list, so a single-item feed stays a
/// one-element sequence instead of collapsing to a scalar.
pub fn entries_from_xml(content: &[u8], limit: usize) -> Result<Vec<FeedEntry>> {
  let channel = rss::Channel::read_from(Cursor::new(content))?;
  let entries = channel
    .items
    .iter()
    .take(limit)
    .map(FeedEntry::from_item)
    .collect();
  Ok(entries)
}
