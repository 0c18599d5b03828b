//! Direct reasoning-engine client (legacy route): `POST {endpoint}` with `{query, session_id}`.

use super::{post_json, AgentBackend, AgentQuery, BackendError};
use crate::routing::RoutingDecision;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const NO_RESPONSE_TEXT: &str = "I couldn't generate a response.";

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    response: Option<String>,
}

pub struct AgentEngineClient {
    url: String,
    client: reqwest::Client,
}

impl AgentEngineClient {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AgentBackend for AgentEngineClient {
    fn route(&self) -> RoutingDecision {
        RoutingDecision::DirectEngine
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn query(&self, query: &AgentQuery<'_>) -> Result<String, BackendError> {
        let body = QueryRequest {
            query: query.prompt,
            session_id: query.session_id,
        };
        let result: QueryResponse =
            post_json(&self.client, &self.url, &body, query.correlation_id).await?;
        Ok(result.response.unwrap_or_else(|| NO_RESPONSE_TEXT.to_string()))
    }
}
