use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Character budget for the excerpt, not counting the trailing marker.
const EXCERPT_BUDGET: usize = 100;
const EXCERPT_MARKER: &str = "...";

lazy_static! {
  static ref MARKUP_TAG: Regex = Regex::new("<[^>]*>").unwrap();
  // note.com articles commonly open with a はじめに section heading
  // that adds nothing to a preview card
  static ref LEADING_BOILERPLATE: Regex = Regex::new(r"^はじめに\s+").unwrap();
}

/// One normalized feed entry, the shape the presentation layer renders.
/// Constructed fresh on every ingestion, never persisted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
  pub id: String,
  pub title: String,
  pub excerpt: String,
  pub published_at: String,
  pub url: String,
  pub thumbnail_url: String,
}

impl FeedEntry {
  /// Normalizes one raw item. Missing fields degrade to empty strings;
  /// a malformed item never fails the batch it arrived in.
  pub fn from_item(item: &rss::Item) -> Self {
    let url = item.link.clone().unwrap_or_default();

    Self {
      id: entry_id(&url),
      title: item.title.clone().unwrap_or_default(),
      excerpt: item.description.as_deref().map(excerpt).unwrap_or_default(),
      published_at: item.pub_date.clone().unwrap_or_default(),
      thumbnail_url: thumbnail_url(item),
      url,
    }
  }
}

// Practically unique within one feed; not a global identifier.
fn entry_id(link: &str) -> String {
  link.rsplit('/').next().unwrap_or_default().to_string()
}

fn excerpt(description: &str) -> String {
  let text = MARKUP_TAG.replace_all(description, "");
  let text = LEADING_BOILERPLATE.replace(&text, "");
  let truncated: String = text.chars().take(EXCERPT_BUDGET).collect();

  // The marker is appended even when the text already fits the budget.
  format!("{truncated}{EXCERPT_MARKER}")
}

fn thumbnail_url(item: &rss::Item) -> String {
  let Some(thumbnail) = item
    .extensions
    .get("media")
    .and_then(|ns| ns.get("thumbnail"))
    .and_then(|tags| tags.first())
  else {
    return String::new();
  };

  let url = thumbnail.value.as_deref().unwrap_or_default();
  // asset urls carry resizing parameters; the card wants the bare image
  url.split('?').next().unwrap_or_default().to_string()
}
