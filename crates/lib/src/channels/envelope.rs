//! Platform envelope: the outer JSON of every webhook POST.

use serde::Deserialize;

/// Event payload inside an `event_callback` envelope. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type", default)]
    pub typ: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    /// "im" for direct messages.
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Present when a bot (including this one) authored the message.
    #[serde(default)]
    pub bot_id: Option<String>,
}

/// Parsed envelope.
#[derive(Debug, Clone)]
pub enum Envelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event: SlackEvent,
        event_id: Option<String>,
        event_time: Option<i64>,
    },
    /// Any other `type` value (or none at all).
    Other {
        typ: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("malformed envelope: {0}")]
pub struct ParseFailure(#[from] serde_json::Error);

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type", default)]
    typ: Option<String>,
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    event: Option<SlackEvent>,
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    event_time: Option<i64>,
}

impl Envelope {
    /// Parse a raw request body. Anything that is not a JSON object of the expected shape is a
    /// `ParseFailure`.
    pub fn parse(body: &[u8]) -> Result<Self, ParseFailure> {
        let raw: RawEnvelope = serde_json::from_slice(body)?;
        Ok(match raw.typ.as_deref() {
            Some("url_verification") => Envelope::UrlVerification {
                challenge: raw.challenge.unwrap_or_default(),
            },
            Some("event_callback") => Envelope::EventCallback {
                event: raw.event.unwrap_or_default(),
                event_id: raw.event_id,
                event_time: raw.event_time,
            },
            _ => Envelope::Other { typ: raw.typ },
        })
    }

    /// Envelope type for log lines.
    pub fn type_name(&self) -> &str {
        match self {
            Envelope::UrlVerification { .. } => "url_verification",
            Envelope::EventCallback { .. } => "event_callback",
            Envelope::Other { typ } => typ.as_deref().unwrap_or("<none>"),
        }
    }
}
