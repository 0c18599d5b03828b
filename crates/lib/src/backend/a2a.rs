//! A2A gateway client: `POST {base}/run` with the agent-call schema.

use super::{post_json, AgentBackend, AgentQuery, BackendError};
use crate::routing::RoutingDecision;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const NO_RESPONSE_TEXT: &str = "No response from A2A gateway";

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    agent_role: &'a str,
    prompt: &'a str,
    session_id: &'a str,
    caller_identity: &'a str,
    env: &'a str,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    #[serde(default)]
    response: Option<String>,
    /// Any non-null, non-empty value means the agent run failed.
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    session_id: Option<String>,
}

fn error_text(error: &Option<serde_json::Value>) -> Option<String> {
    match error {
        None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => None,
        Some(serde_json::Value::String(s)) if s.is_empty() => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Client for the A2A gateway in front of the agent fleet.
pub struct A2aGatewayClient {
    run_url: String,
    agent_role: String,
    caller_identity: String,
    env: String,
    client: reqwest::Client,
}

impl A2aGatewayClient {
    pub fn new(base_url: String, agent_role: String, caller_identity: String, env: String) -> Self {
        Self {
            run_url: format!("{}/run", base_url.trim_end_matches('/')),
            agent_role,
            caller_identity,
            env,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AgentBackend for A2aGatewayClient {
    fn route(&self) -> RoutingDecision {
        RoutingDecision::A2aGateway
    }

    fn endpoint(&self) -> &str {
        &self.run_url
    }

    async fn query(&self, query: &AgentQuery<'_>) -> Result<String, BackendError> {
        let body = RunRequest {
            agent_role: &self.agent_role,
            prompt: query.prompt,
            session_id: query.session_id,
            caller_identity: &self.caller_identity,
            env: &self.env,
        };
        let result: RunResponse =
            post_json(&self.client, &self.run_url, &body, query.correlation_id).await?;
        if let Some(err) = error_text(&result.error) {
            return Err(BackendError::Remote(err));
        }
        if let Some(ref sid) = result.session_id {
            log::debug!(
                "correlation_id={} a2a gateway session_id={}",
                query.correlation_id,
                sid
            );
        }
        Ok(result.response.unwrap_or_else(|| NO_RESPONSE_TEXT.to_string()))
    }
}
