use std::sync::Arc;

use axum::extract::Extension;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use http::StatusCode;
use serde_json::json;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::RootConfig;
use crate::contact::{ContactRelay, ContactSubmission, Smtp};
use crate::error::{Error, Result};
use crate::ingest::Ingestor;

#[derive(Parser)]
pub struct ServerConfig {
  #[clap(long, short, default_value = "127.0.0.1:4080")]
  bind: String,
}

/// Shared handler state. Both components are stateless per request; the
/// only thing shared is the configured collaborators.
#[derive(Clone)]
pub struct App {
  ingestor: Arc<Ingestor>,
  relay: Arc<ContactRelay>,
}

impl App {
  pub fn from_config(config: &RootConfig) -> Result<Self> {
    let client = config.client.build()?;
    let ingestor = Ingestor::new(&config.blog, client);
    let transport = Arc::new(Smtp::from_config(&config.contact.smtp)?);
    let relay = ContactRelay::new(&config.contact, transport)?;

    Ok(Self::new(ingestor, relay))
  }

  pub fn new(ingestor: Ingestor, relay: ContactRelay) -> Self {
    Self {
      ingestor: Arc::new(ingestor),
      relay: Arc::new(relay),
    }
  }

  pub fn router(self) -> Router {
    Router::new()
      .route("/api/blog", get(blog_posts))
      .route("/api/contact", post(contact))
      .route("/health", get(|| async { "ok" }))
      .fallback(get(|| async {
        (StatusCode::NOT_FOUND, "Endpoint not found")
      }))
      .layer(CompressionLayer::new().gzip(true))
      .layer(CorsLayer::permissive())
      .layer(Extension(self))
  }
}

pub async fn serve(
  server_config: ServerConfig,
  config: RootConfig,
) -> Result<()> {
  let app = App::from_config(&config)?;

  info!("listening on {}", server_config.bind);
  let listener = tokio::net::TcpListener::bind(&server_config.bind).await?;

  info!("starting server");
  Ok(axum::serve(listener, app.router()).await?)
}

// Diagnostic detail stays in the logs; the caller only ever sees the
// generic bodies below.

async fn blog_posts(Extension(app): Extension<App>) -> impl IntoResponse {
  match app.ingestor.ingest().await {
    Ok(entries) => (StatusCode::OK, Json(json!(entries))),
    Err(e) => {
      error!("blog ingestion failed: {e}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to fetch blog posts" })),
      )
    }
  }
}

async fn contact(
  Extension(app): Extension<App>,
  Json(submission): Json<ContactSubmission>,
) -> impl IntoResponse {
  match app.relay.relay(&submission).await {
    Ok(()) => (
      StatusCode::OK,
      Json(json!({ "message": "Your message has been sent." })),
    ),
    Err(Error::Validation(text)) => {
      (StatusCode::BAD_REQUEST, Json(json!({ "error": text })))
    }
    Err(e) => {
      error!("contact relay failed: {e}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to send your message, please try again later." })),
      )
    }
  }
}

#[cfg(test)]
mod test {
  use std::future::IntoFuture;
  use std::net::SocketAddr;

  use axum::body::Body;
  use http::Request;
  use http_body_util::BodyExt;
  use tower::ServiceExt;
  use url::Url;

  use super::*;
  use crate::client::ClientConfig;
  use crate::config::BlogConfig;
  use crate::contact::test_support::{
    test_config, FailingTransport, RecordingTransport,
  };
  use crate::contact::MailTransport;

  const FIXTURE: &str = include_str!("../fixtures/blog.xml");

  /// Stands in for the remote blogging platform.
  async fn spawn_upstream() -> SocketAddr {
    let router = Router::new()
      .route(
        "/rss",
        get(|| async {
          ([("content-type", "application/rss+xml")], FIXTURE)
        }),
      )
      .route("/down", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
      .await
      .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(axum::serve(listener, router).into_future());
    addr
  }

  fn app(feed_url: Url, transport: Arc<dyn MailTransport>) -> App {
    let blog = BlogConfig { feed_url, limit: 3 };
    let client = ClientConfig::default().build().unwrap();
    let ingestor = Ingestor::new(&blog, client);
    let relay = ContactRelay::new(&test_config(), transport).unwrap();
    App::new(ingestor, relay)
  }

  async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
      .method("POST")
      .uri(uri)
      .header("content-type", "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
  }

  #[tokio::test]
  async fn test_blog_endpoint_returns_normalized_entries() {
    let upstream = spawn_upstream().await;
    let feed_url = Url::parse(&format!("http://{upstream}/rss")).unwrap();
    let router = app(feed_url, Arc::new(RecordingTransport::default())).router();

    let resp = router
      .oneshot(Request::get("/api/blog").body(Body::empty()).unwrap())
      .await
      .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    let entries = body.as_array().unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["id"], "n4f0c287a8b2a");
    assert_eq!(entries[1]["id"], "n8d31e5c0f912");
    assert_eq!(
      entries[0]["thumbnailUrl"],
      "https://assets.st-note.com/production/uploads/images/100001.png"
    );
    // entry without a description degrades, not errors
    assert_eq!(entries[2]["excerpt"], "");
  }

  #[tokio::test]
  async fn test_blog_endpoint_maps_upstream_failure_to_generic_500() {
    let upstream = spawn_upstream().await;
    let feed_url = Url::parse(&format!("http://{upstream}/down")).unwrap();
    let router = app(feed_url, Arc::new(RecordingTransport::default())).router();

    let resp = router
      .oneshot(Request::get("/api/blog").body(Body::empty()).unwrap())
      .await
      .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert_eq!(body, json!({ "error": "Failed to fetch blog posts" }));
  }

  #[tokio::test]
  async fn test_contact_endpoint_accepts_complete_submission() {
    let upstream = spawn_upstream().await;
    let feed_url = Url::parse(&format!("http://{upstream}/rss")).unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let router = app(feed_url, transport.clone()).router();

    let resp = router
      .oneshot(post_json(
        "/api/contact",
        json!({ "name": "Taro", "email": "a@b.com", "message": "hello" }),
      ))
      .await
      .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert!(body["message"].is_string());
    assert_eq!(transport.sent.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_contact_endpoint_rejects_missing_field_with_400() {
    let upstream = spawn_upstream().await;
    let feed_url = Url::parse(&format!("http://{upstream}/rss")).unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let router = app(feed_url, transport.clone()).router();

    let resp = router
      .oneshot(post_json(
        "/api/contact",
        json!({ "email": "a@b.com", "message": "hi" }),
      ))
      .await
      .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"].is_string());
    // validation failed before the transport was touched
    assert_eq!(transport.sent.lock().unwrap().len(), 0);
  }

  #[tokio::test]
  async fn test_contact_endpoint_maps_delivery_failure_to_generic_500() {
    let upstream = spawn_upstream().await;
    let feed_url = Url::parse(&format!("http://{upstream}/rss")).unwrap();
    let router = app(feed_url, Arc::new(FailingTransport)).router();

    let resp = router
      .oneshot(post_json(
        "/api/contact",
        json!({ "name": "Taro", "email": "a@b.com", "message": "hello" }),
      ))
      .await
      .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert!(body["error"].is_string());
    // no partial send is reported as success
    assert!(body.get("message").is_none());
  }

  #[tokio::test]
  async fn test_health_and_fallback() {
    let upstream = spawn_upstream().await;
    let feed_url = Url::parse(&format!("http://{upstream}/rss")).unwrap();
    let router = app(feed_url, Arc::new(RecordingTransport::default())).router();

    let resp = router
      .clone()
      .oneshot(Request::get("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
      .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
