//! Health/status report: configuration state for operators. Not used for request processing.

use crate::config::Settings;
use crate::routing::RoutingDecision;
use serde::Serialize;

pub const SERVICE_NAME: &str = "slack-webhook";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Enabled but missing required settings.
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryPolicyReport {
    pub timeout_seconds: u64,
    pub retry_enabled: bool,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub service: &'static str,
    pub version: &'static str,
    pub enabled: bool,
    pub config_valid: bool,
    pub missing_vars: Vec<String>,
    pub routing_decision: RoutingDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a2a_gateway_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_engine_url: Option<String>,
    pub retry_policy: RetryPolicyReport,
}

impl HealthReport {
    pub fn new(settings: &Settings, decision: RoutingDecision) -> Self {
        let missing_vars = settings.missing_vars();
        let config_valid = missing_vars.is_empty();
        let status = if settings.enabled && !config_valid {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        let (a2a_gateway_url, agent_engine_url) = match decision {
            RoutingDecision::A2aGateway => (settings.backend.a2a_gateway_url.clone(), None),
            RoutingDecision::DirectEngine => (None, settings.backend.engine_endpoint()),
            _ => (None, None),
        };
        Self {
            status,
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            enabled: settings.enabled,
            config_valid,
            missing_vars,
            routing_decision: decision,
            a2a_gateway_url,
            agent_engine_url,
            retry_policy: RetryPolicyReport {
                timeout_seconds: settings.retry.timeout_per_attempt.as_secs(),
                retry_enabled: settings.retry.retry_enabled,
                max_retries: settings.retry.max_retries,
            },
        }
    }
}
