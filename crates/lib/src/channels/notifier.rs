//! Outbound replies: post the backend's answer back into the origin channel.

use crate::session::CorrelationContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("post request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("post rejected with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("platform api error: {0}")]
    Api(String),
}

/// Delivers a message to a channel, optionally threaded.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Notifier id for logs (e.g. "slack").
    fn id(&self) -> &str;

    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ref: Option<&str>,
        ctx: &CorrelationContext,
    ) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

/// Web API replies are 200 even on failure; `ok` carries the real result.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default = "default_ok")]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

fn default_ok() -> bool {
    true
}

/// Slack Web API notifier (`chat.postMessage` with a bot token).
pub struct SlackNotifier {
    api_base: String,
    token: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn id(&self) -> &str {
        "slack"
    }

    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ref: Option<&str>,
        ctx: &CorrelationContext,
    ) -> Result<(), NotifyError> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let body = PostMessageRequest {
            channel,
            text,
            thread_ts: thread_ref,
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("X-Correlation-Id", &ctx.correlation_id)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status, body });
        }
        let data: ApiResponse = res.json().await?;
        if !data.ok {
            return Err(NotifyError::Api(
                data.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        log::info!(
            "correlation_id={} reply posted to channel={} thread={}",
            ctx.correlation_id,
            channel,
            thread_ref.unwrap_or("-")
        );
        Ok(())
    }
}
