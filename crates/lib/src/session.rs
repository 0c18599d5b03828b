//! Per-request identity: the backend session key and the correlation context used for tracing.
//!
//! Nothing here is stored; the backend owns conversation state and correlates turns by session key.

use std::fmt;

/// Identifies a user's conversation in one channel. Derived as `{user_id}_{channel_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(user_id: &str, channel_id: &str) -> Self {
        Self(format!("{}_{}", user_id, channel_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Threaded through every log line and outbound call for one inbound request.
#[derive(Debug, Clone)]
pub struct CorrelationContext {
    pub correlation_id: String,
    pub session_key: Option<SessionKey>,
    /// Current backend attempt (1-based); 0 before the first call.
    pub attempt: u32,
}

impl CorrelationContext {
    /// Fresh context with a new random correlation id.
    pub fn new() -> Self {
        Self {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            session_key: None,
            attempt: 0,
        }
    }

    pub fn with_session(mut self, key: SessionKey) -> Self {
        self.session_key = Some(key);
        self
    }

    /// Session key as a string, or "-" before one is known (for log lines).
    pub fn session(&self) -> &str {
        self.session_key.as_ref().map(SessionKey::as_str).unwrap_or("-")
    }
}

impl Default for CorrelationContext {
    fn default() -> Self {
        Self::new()
    }
}
