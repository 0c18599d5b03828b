//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.relay/config.json`) and then resolved against the
//! environment into [`Settings`], the immutable view the gateway runs with. Environment variables
//! always win over file values so container deployments can be configured without a file.

use crate::backend::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
const DEFAULT_AGENT_ROLE: &str = "bob";
const DEFAULT_CALLER_IDENTITY: &str = "spiffe://intent.solutions/slack/webhook";
const DEFAULT_DEPLOYMENT_ENV: &str = "dev";
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 1;
/// Upper bound for `AGENT_ENGINE_MAX_RETRIES`; worst-case latency is `(max_retries + 1) * timeout`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Label reported when neither backend route is configured.
pub const MISSING_ROUTE_LABEL: &str =
    "A2A_GATEWAY_URL or (PROJECT_ID + LOCATION + AGENT_ENGINE_ID)";

/// Top-level file config. Every field is optional; env overrides are applied in
/// [`Settings::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Feature flag: when false and no backend route is configured, events are acknowledged and
    /// dropped.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port (default 8080). Overridden by PORT env.
    pub port: Option<u16>,

    /// Bind address (default "0.0.0.0").
    pub bind: Option<String>,

    /// When true, `/events` acknowledges before the backend call and reply complete.
    #[serde(default)]
    pub defer_replies: bool,
}

/// Chat platform credentials and signing policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackConfig {
    /// Bot OAuth token (xoxb-...). Overridden by SLACK_BOT_TOKEN env.
    pub bot_token: Option<String>,

    /// App signing secret. Overridden by SLACK_SIGNING_SECRET env.
    pub signing_secret: Option<String>,

    /// The bot's own user id; `<@ID>` tokens are stripped from inbound text.
    pub bot_user_id: Option<String>,

    /// Web API base (default https://slack.com/api).
    pub api_base: Option<String>,

    /// Reject unsigned requests instead of letting them through.
    #[serde(default)]
    pub require_signature: bool,
}

/// Backend routing targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// A2A gateway base URL (preferred route).
    pub a2a_gateway_url: Option<String>,
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub engine_id: Option<String>,
    /// Explicit reasoning-engine endpoint; derived from project/location/engine id when unset.
    pub engine_url: Option<String>,
    pub agent_role: Option<String>,
    pub caller_identity: Option<String>,
    /// Deployment environment passed to the A2A gateway (default "dev").
    pub env: Option<String>,
}

/// Outbound retry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    pub timeout_seconds: Option<u64>,
    pub enabled: Option<bool>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} (expected {expected})")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("timeout must be at least one second")]
    ZeroTimeout,
    #[error("max retries {value} exceeds the limit of {limit}")]
    TooManyRetries { value: u32, limit: u32 },
}

/// Resolved, immutable settings. Built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
    pub defer_replies: bool,
    pub slack: SlackSettings,
    pub backend: BackendSettings,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct SlackSettings {
    pub bot_token: Option<String>,
    pub signing_secret: Option<String>,
    pub bot_user_id: Option<String>,
    pub api_base: String,
    pub require_signature: bool,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub a2a_gateway_url: Option<String>,
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub engine_id: Option<String>,
    engine_url: Option<String>,
    pub agent_role: String,
    pub caller_identity: String,
    pub env: String,
}

impl BackendSettings {
    /// True when project, location and engine id are all set.
    pub fn has_direct_engine(&self) -> bool {
        self.project_id.is_some() && self.location.is_some() && self.engine_id.is_some()
    }

    /// Reasoning-engine query endpoint; only defined when the direct route is fully configured.
    pub fn engine_endpoint(&self) -> Option<String> {
        let (Some(project), Some(location), Some(engine)) =
            (&self.project_id, &self.location, &self.engine_id)
        else {
            return None;
        };
        Some(self.engine_url.clone().unwrap_or_else(|| {
            format!(
                "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/reasoningEngines/{engine}:query"
            )
        }))
    }
}

/// Trim and drop empty strings (env vars set to "" count as unset).
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: raw.to_string(),
            expected: "true or false",
        }),
    }
}

fn parse_num<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: raw.to_string(),
        expected: "a non-negative integer",
    })
}

impl Settings {
    /// Resolve settings from the file config and the process environment.
    pub fn resolve(config: &Config) -> Result<Self, ConfigError> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolve settings with an explicit variable lookup (tests pass a map instead of the process
    /// env).
    pub fn resolve_with<F>(config: &Config, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| non_empty(lookup(name));
        let pick =
            |name: &str, file: &Option<String>| env(name).or_else(|| non_empty(file.clone()));

        let enabled = match (env("SLACK_BOB_ENABLED"), env("RELAY_ENABLED")) {
            (Some(raw), _) => parse_bool("SLACK_BOB_ENABLED", &raw)?,
            (None, Some(raw)) => parse_bool("RELAY_ENABLED", &raw)?,
            (None, None) => config.enabled,
        };
        let port = match env("PORT") {
            Some(raw) => parse_num("PORT", &raw)?,
            None => config.gateway.port.unwrap_or(DEFAULT_PORT),
        };
        let require_signature = match env("RELAY_REQUIRE_SIGNATURE") {
            Some(raw) => parse_bool("RELAY_REQUIRE_SIGNATURE", &raw)?,
            None => config.slack.require_signature,
        };

        let slack = SlackSettings {
            bot_token: pick("SLACK_BOT_TOKEN", &config.slack.bot_token),
            signing_secret: pick("SLACK_SIGNING_SECRET", &config.slack.signing_secret),
            bot_user_id: pick("SLACK_BOT_USER_ID", &config.slack.bot_user_id),
            api_base: pick("SLACK_API_BASE", &config.slack.api_base)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string()),
            require_signature,
        };

        let b = &config.backend;
        let backend = BackendSettings {
            a2a_gateway_url: pick("A2A_GATEWAY_URL", &b.a2a_gateway_url)
                .map(|u| u.trim_end_matches('/').to_string()),
            project_id: pick("PROJECT_ID", &b.project_id),
            location: pick("LOCATION", &b.location),
            engine_id: pick("AGENT_ENGINE_ID", &b.engine_id),
            engine_url: pick("AGENT_ENGINE_URL", &b.engine_url),
            agent_role: pick("AGENT_ROLE", &b.agent_role)
                .unwrap_or_else(|| DEFAULT_AGENT_ROLE.to_string()),
            caller_identity: pick("CALLER_IDENTITY", &b.caller_identity)
                .unwrap_or_else(|| DEFAULT_CALLER_IDENTITY.to_string()),
            env: pick("DEPLOYMENT_ENV", &b.env)
                .unwrap_or_else(|| DEFAULT_DEPLOYMENT_ENV.to_string()),
        };

        let timeout_seconds = match env("AGENT_ENGINE_TIMEOUT_SECONDS") {
            Some(raw) => parse_num("AGENT_ENGINE_TIMEOUT_SECONDS", &raw)?,
            None => config.retry.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        };
        if timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let retry_enabled = match env("AGENT_ENGINE_RETRY_ENABLED") {
            Some(raw) => parse_bool("AGENT_ENGINE_RETRY_ENABLED", &raw)?,
            None => config.retry.enabled.unwrap_or(true),
        };
        let max_retries = match env("AGENT_ENGINE_MAX_RETRIES") {
            Some(raw) => parse_num("AGENT_ENGINE_MAX_RETRIES", &raw)?,
            None => config.retry.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        };
        if max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::TooManyRetries {
                value: max_retries,
                limit: MAX_RETRIES_LIMIT,
            });
        }

        Ok(Self {
            enabled,
            bind: non_empty(config.gateway.bind.clone())
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port,
            defer_replies: config.gateway.defer_replies,
            slack,
            backend,
            retry: RetryPolicy {
                timeout_per_attempt: Duration::from_secs(timeout_seconds),
                retry_enabled,
                max_retries,
            },
        })
    }

    /// Settings the gateway needs but does not have. Empty when the feature is disabled.
    pub fn missing_vars(&self) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        let mut missing = Vec::new();
        if self.slack.bot_token.is_none() {
            missing.push("SLACK_BOT_TOKEN".to_string());
        }
        if self.slack.signing_secret.is_none() {
            missing.push("SLACK_SIGNING_SECRET".to_string());
        }
        if self.backend.a2a_gateway_url.is_none() && !self.backend.has_direct_engine() {
            missing.push(MISSING_ROUTE_LABEL.to_string());
        }
        missing
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".relay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path (or RELAY_CONFIG_PATH / default). Missing file => default
/// config.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
