//! Agent backends: the two interchangeable services that answer queries, and the resilient
//! invoker that calls whichever one was selected at startup.

mod a2a;
mod engine;
mod invoker;
mod outcome;

pub use a2a::A2aGatewayClient;
pub use engine::AgentEngineClient;
pub use invoker::{invoke, RetryPolicy};
pub use outcome::{BackendOutcome, ErrorKind};

use crate::config::Settings;
use crate::routing::RoutingDecision;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Longest upstream error body kept for logs.
const ERROR_BODY_LOG_LIMIT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend request timed out")]
    Timeout,
    #[error("cannot reach backend: {0}")]
    Connection(String),
    /// The call succeeded but the payload reports a failure.
    #[error("backend reported error: {0}")]
    Remote(String),
    #[error("backend call failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() || e.is_request() {
            BackendError::Connection(e.to_string())
        } else {
            BackendError::Other(e.to_string())
        }
    }
}

/// One query to a backend.
#[derive(Debug, Clone, Copy)]
pub struct AgentQuery<'a> {
    pub prompt: &'a str,
    pub session_id: &'a str,
    pub correlation_id: &'a str,
}

/// A service that answers queries for a session.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// The route this backend implements.
    fn route(&self) -> RoutingDecision;

    /// Where queries go (for logs and the health report).
    fn endpoint(&self) -> &str;

    /// Issue one call. No retries and no timeout: the invoker owns both.
    async fn query(&self, query: &AgentQuery<'_>) -> Result<String, BackendError>;
}

/// Backend capability chosen once at startup.
#[derive(Clone)]
pub enum BackendSelection {
    Available(Arc<dyn AgentBackend>),
    /// No outbound calls: routing is disabled or misconfigured.
    Unavailable(RoutingDecision),
}

impl BackendSelection {
    /// Build the client for the routing decision. Never called during request handling.
    pub fn from_settings(settings: &Settings, decision: RoutingDecision) -> Self {
        let b = &settings.backend;
        match (decision, &b.a2a_gateway_url, b.engine_endpoint()) {
            (RoutingDecision::A2aGateway, Some(url), _) => {
                BackendSelection::Available(Arc::new(A2aGatewayClient::new(
                    url.clone(),
                    b.agent_role.clone(),
                    b.caller_identity.clone(),
                    b.env.clone(),
                )))
            }
            (RoutingDecision::DirectEngine, _, Some(url)) => {
                BackendSelection::Available(Arc::new(AgentEngineClient::new(url)))
            }
            (RoutingDecision::A2aGateway | RoutingDecision::DirectEngine, _, _) => {
                BackendSelection::Unavailable(RoutingDecision::Misconfigured)
            }
            (other, _, _) => BackendSelection::Unavailable(other),
        }
    }

    pub fn decision(&self) -> RoutingDecision {
        match self {
            BackendSelection::Available(b) => b.route(),
            BackendSelection::Unavailable(d) => *d,
        }
    }
}

fn truncate_for_log(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LOG_LIMIT) {
        Some((i, _)) => format!("{}…", &body[..i]),
        None => body.to_string(),
    }
}

/// POST a JSON body and decode a JSON reply; non-2xx becomes `BackendError::Status`.
async fn post_json<B, R>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
    correlation_id: &str,
) -> Result<R, BackendError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let res = client
        .post(url)
        .header("X-Correlation-Id", correlation_id)
        .json(body)
        .send()
        .await?;
    if !res.status().is_success() {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        return Err(BackendError::Status {
            status,
            body: truncate_for_log(&body),
        });
    }
    res.json::<R>()
        .await
        .map_err(|e| BackendError::Other(format!("decoding response: {}", e)))
}
