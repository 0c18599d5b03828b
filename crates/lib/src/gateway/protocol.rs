//! Webhook wire types: the inbound request as received and the JSON bodies the gateway returns.

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::Serialize;

pub const TIMESTAMP_HEADERS: [&str; 2] = ["x-slack-request-timestamp", "x-request-timestamp"];
pub const SIGNATURE_HEADERS: [&str; 2] = ["x-slack-signature", "x-request-signature"];
pub const RETRY_HEADERS: [&str; 2] = ["x-slack-retry-num", "x-retry-count"];

fn first_header(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Raw webhook request. Immutable once received.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub body: Bytes,
    pub timestamp: Option<String>,
    pub signature: Option<String>,
    pub retry_num: Option<String>,
}

impl InboundRequest {
    pub fn new(headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            body,
            timestamp: first_header(headers, &TIMESTAMP_HEADERS),
            signature: first_header(headers, &SIGNATURE_HEADERS),
            retry_num: first_header(headers, &RETRY_HEADERS),
        }
    }
}

/// `{"ok": true}`: returned for every handled, ignored, or failed-downstream event.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

/// Body of the 401 returned when signature verification fails.
#[derive(Debug, Serialize)]
pub struct Unauthorized {
    pub ok: bool,
    pub error: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceEndpoints {
    pub events: &'static str,
    pub health: &'static str,
}

/// `GET /` metadata.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: ServiceEndpoints,
}
