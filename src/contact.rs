use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{ContactConfig, SmtpConfig};
use crate::error::{ConfigError, Error, Result};

/// One contact form submission. Lives only for the duration of a single
/// relay call.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
// absent fields deserialize as empty and fail validation, rather than
// failing JSON extraction with an opaque 422
#[serde(default)]
pub struct ContactSubmission {
  pub name: String,
  pub email: String,
  pub message: String,
}

impl ContactSubmission {
  // Presence only. Trimming and address-format checks are the form's
  // responsibility on the client side.
  fn validate(&self) -> Result<()> {
    if self.name.is_empty() || self.email.is_empty() || self.message.is_empty()
    {
      return Err(Error::Validation(
        "Name, email and message are all required.",
      ));
    }
    Ok(())
  }
}

/// Outbound mail boundary. The SMTP implementation is swapped out for a
/// recording fake in tests.
#[async_trait]
pub trait MailTransport: Send + Sync {
  async fn send(&self, message: Message) -> Result<()>;
}

pub struct Smtp {
  inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl Smtp {
  pub fn from_config(config: &SmtpConfig) -> Result<Self> {
    let password = std::env::var(&config.password_env)
      .map_err(|_| ConfigError::MissingEnv(config.password_env.clone()))?;

    let inner = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
      .map_err(|e| ConfigError::Message(e.to_string()))?
      .credentials(Credentials::new(config.username.clone(), password))
      .build();

    Ok(Self { inner })
  }
}

#[async_trait]
impl MailTransport for Smtp {
  async fn send(&self, message: Message) -> Result<()> {
    self
      .inner
      .send(message)
      .await
      .map_err(|e| Error::Delivery(e.to_string()))?;
    Ok(())
  }
}

/// Validates a submission and forwards it to the site owner as a
/// transactional mail. No queuing, no automatic retry.
pub struct ContactRelay {
  recipient: Mailbox,
  from: Mailbox,
  transport: Arc<dyn MailTransport>,
}

impl ContactRelay {
  pub fn new(
    config: &ContactConfig,
    transport: Arc<dyn MailTransport>,
  ) -> Result<Self> {
    let recipient = config
      .recipient
      .parse()
      .map_err(|_| ConfigError::MailAddress(config.recipient.clone()))?;
    let from = config
      .from
      .parse()
      .map_err(|_| ConfigError::MailAddress(config.from.clone()))?;

    Ok(Self {
      recipient,
      from,
      transport,
    })
  }

  /// Validation happens before the transport is touched; an incomplete
  /// submission never causes network traffic.
  pub async fn relay(&self, submission: &ContactSubmission) -> Result<()> {
    submission.validate()?;
    let message = self.compose(submission)?;
    self.transport.send(message).await?;
    info!("relayed contact submission from {}", submission.email);
    Ok(())
  }

  // Plain-text and HTML variants carry identical field values; the HTML
  // one only adds a decorative wrapper.
  fn compose(&self, submission: &ContactSubmission) -> Result<Message> {
    let subject = format!("Portfolio contact from {}", submission.name);
    let message = Message::builder()
      .from(self.from.clone())
      .to(self.recipient.clone())
      .subject(subject)
      .multipart(MultiPart::alternative_plain_html(
        plain_body(submission),
        html_body(submission),
      ))?;

    Ok(message)
  }
}

fn plain_body(submission: &ContactSubmission) -> String {
  format!(
    "Name: {}\nEmail: {}\n\nMessage:\n{}\n",
    submission.name, submission.email, submission.message
  )
}

fn html_body(submission: &ContactSubmission) -> String {
  format!(
    r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #6366f1; border-bottom: 1px solid #e2e8f0; padding-bottom: 10px;">New contact form submission</h2>
  <p><strong>Name:</strong> {}</p>
  <p><strong>Email:</strong> {}</p>
  <div style="margin-top: 20px;">
    <strong>Message:</strong>
    <p style="white-space: pre-wrap; background-color: #f8fafc; padding: 15px; border-radius: 5px;">{}</p>
  </div>
  <p style="color: #94a3b8; font-size: 12px; margin-top: 30px;">Sent automatically from the portfolio contact form.</p>
</div>"#,
    submission.name, submission.email, submission.message
  )
}
