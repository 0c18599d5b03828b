//! Decide what to do with a parsed envelope: answer a challenge, act on an event, or ignore it.

use crate::channels::envelope::{Envelope, SlackEvent};
use crate::session::SessionKey;

/// What kind of message triggered the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `app_mention`: the bot was @-mentioned in a channel.
    Mention,
    /// `message` in an IM channel.
    DirectMessage,
    /// Any other subscribed message event.
    ChannelMessage,
}

impl EventKind {
    fn from_event(event: &SlackEvent) -> Self {
        match (event.typ.as_deref(), event.channel_type.as_deref()) {
            (Some("app_mention"), _) => EventKind::Mention,
            (Some("message"), Some("im")) => EventKind::DirectMessage,
            _ => EventKind::ChannelMessage,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Mention => "mention",
            EventKind::DirectMessage => "direct_message",
            EventKind::ChannelMessage => "channel_message",
        }
    }
}

/// An event that warrants a backend query and a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionableEvent {
    pub kind: EventKind,
    pub user_id: String,
    pub channel_id: String,
    /// Thread to reply into: `thread_ts` when in a thread, otherwise the message `ts`.
    pub thread_ref: Option<String>,
    /// Mention-stripped, trimmed text.
    pub text: String,
}

impl ActionableEvent {
    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(&self.user_id, &self.channel_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BotLoopPrevention,
    DuplicateRetry,
    EmptyAfterStrip,
    MissingOrigin,
    UnhandledType,
    MalformedPayload,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::BotLoopPrevention => "bot_loop_prevention",
            IgnoreReason::DuplicateRetry => "duplicate_retry",
            IgnoreReason::EmptyAfterStrip => "empty_after_strip",
            IgnoreReason::MissingOrigin => "missing_origin",
            IgnoreReason::UnhandledType => "unhandled_type",
            IgnoreReason::MalformedPayload => "malformed_payload",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Challenge(String),
    Actionable(ActionableEvent),
    Ignored(IgnoreReason),
}

/// Classifies envelopes. Holds the bot's own user id so its mention can be stripped from text.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    bot_user_id: Option<String>,
}

impl Classifier {
    pub fn new(bot_user_id: Option<String>) -> Self {
        Self { bot_user_id }
    }

    /// `retry_num` is the platform's delivery-attempt header, if present.
    pub fn classify(&self, envelope: Envelope, retry_num: Option<&str>) -> Classification {
        let event = match envelope {
            Envelope::UrlVerification { challenge } => return Classification::Challenge(challenge),
            Envelope::Other { .. } => return Classification::Ignored(IgnoreReason::UnhandledType),
            Envelope::EventCallback { event, .. } => event,
        };

        if event.bot_id.as_deref().is_some_and(|b| !b.is_empty()) {
            return Classification::Ignored(IgnoreReason::BotLoopPrevention);
        }
        // Keyed on the delivery attempt, not the event id: a redelivery without the header is
        // processed again.
        if retry_num.is_some() {
            return Classification::Ignored(IgnoreReason::DuplicateRetry);
        }

        let text = self.strip_mention(event.text.as_deref().unwrap_or(""));
        if text.is_empty() {
            return Classification::Ignored(IgnoreReason::EmptyAfterStrip);
        }

        let kind = EventKind::from_event(&event);
        let (Some(user_id), Some(channel_id)) = (event.user, event.channel) else {
            return Classification::Ignored(IgnoreReason::MissingOrigin);
        };
        Classification::Actionable(ActionableEvent {
            kind,
            user_id,
            channel_id,
            thread_ref: event.thread_ts.or(event.ts),
            text,
        })
    }

    /// Remove the bot mention and trim. Without a configured bot id, only a leading `<@...>`
    /// token is removed.
    fn strip_mention(&self, text: &str) -> String {
        match &self.bot_user_id {
            Some(id) => text.replace(&format!("<@{}>", id), "").trim().to_string(),
            None => {
                let t = text.trim_start();
                let rest = t
                    .strip_prefix("<@")
                    .and_then(|r| r.find('>').map(|i| &r[i + 1..]))
                    .unwrap_or(t);
                rest.trim().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Envelope {
        Envelope::parse(json.as_bytes()).unwrap()
    }

    fn mention(text: &str) -> Envelope {
        parse(&format!(
            r#"{{"type":"event_callback","event":{{"type":"app_mention","user":"U1","channel":"C1","text":"{}","ts":"111.1"}}}}"#,
            text
        ))
    }

    fn classifier() -> Classifier {
        Classifier::new(Some("UBOT".to_string()))
    }

    #[test]
    fn challenge_is_echoed_verbatim() {
        let c = classifier();
        for value in ["abc123", "", "with spaces & symbols"] {
            let env = Envelope::UrlVerification {
                challenge: value.to_string(),
            };
            assert_eq!(c.classify(env, None), Classification::Challenge(value.to_string()));
        }
    }

    #[test]
    fn challenge_is_answered_even_on_retry() {
        let env = Envelope::UrlVerification {
            challenge: "x".to_string(),
        };
        assert_eq!(
            classifier().classify(env, Some("1")),
            Classification::Challenge("x".to_string())
        );
    }

    #[test]
    fn bot_messages_are_ignored() {
        let env = parse(r#"{"type":"event_callback","event":{"type":"message","bot_id":"B1","user":"U1","channel":"C1","text":"hi"}}"#);
        assert_eq!(
            classifier().classify(env, None),
            Classification::Ignored(IgnoreReason::BotLoopPrevention)
        );
    }

    #[test]
    fn bot_check_precedes_retry_check() {
        let env = parse(r#"{"type":"event_callback","event":{"bot_id":"B1","text":"hi"}}"#);
        assert_eq!(
            classifier().classify(env, Some("2")),
            Classification::Ignored(IgnoreReason::BotLoopPrevention)
        );
    }

    #[test]
    fn retried_deliveries_are_ignored() {
        assert_eq!(
            classifier().classify(mention("<@UBOT> hello"), Some("1")),
            Classification::Ignored(IgnoreReason::DuplicateRetry)
        );
    }

    #[test]
    fn mention_only_text_is_ignored() {
        assert_eq!(
            classifier().classify(mention("<@UBOT>   "), None),
            Classification::Ignored(IgnoreReason::EmptyAfterStrip)
        );
        let env = parse(r#"{"type":"event_callback","event":{}}"#);
        assert_eq!(
            classifier().classify(env, None),
            Classification::Ignored(IgnoreReason::EmptyAfterStrip)
        );
    }

    #[test]
    fn mention_becomes_actionable() {
        let Classification::Actionable(ev) = classifier().classify(mention("<@UBOT> what's new?"), None)
        else {
            panic!("expected actionable");
        };
        assert_eq!(ev.kind, EventKind::Mention);
        assert_eq!(ev.text, "what's new?");
        assert_eq!(ev.thread_ref.as_deref(), Some("111.1"));
        assert_eq!(ev.session_key().as_str(), "U1_C1");
    }

    #[test]
    fn thread_ts_preferred_over_ts() {
        let env = parse(r#"{"type":"event_callback","event":{"type":"message","channel_type":"im","user":"U1","channel":"D1","text":"hey","ts":"2.0","thread_ts":"1.0"}}"#);
        let Classification::Actionable(ev) = classifier().classify(env, None) else {
            panic!("expected actionable");
        };
        assert_eq!(ev.kind, EventKind::DirectMessage);
        assert_eq!(ev.thread_ref.as_deref(), Some("1.0"));
    }

    #[test]
    fn other_users_mentions_are_kept() {
        let Classification::Actionable(ev) = classifier().classify(mention("<@UBOT> ask <@U2>"), None)
        else {
            panic!("expected actionable");
        };
        assert_eq!(ev.text, "ask <@U2>");
    }

    #[test]
    fn leading_mention_stripped_without_configured_bot_id() {
        let Classification::Actionable(ev) =
            Classifier::default().classify(mention("<@UANY> status"), None)
        else {
            panic!("expected actionable");
        };
        assert_eq!(ev.text, "status");
    }

    #[test]
    fn missing_channel_is_ignored() {
        let env =
            parse(r#"{"type":"event_callback","event":{"type":"message","user":"U1","text":"hi"}}"#);
        assert_eq!(
            classifier().classify(env, None),
            Classification::Ignored(IgnoreReason::MissingOrigin)
        );
    }

    #[test]
    fn unknown_envelope_type_is_ignored() {
        let env = parse(r#"{"type":"app_rate_limited"}"#);
        assert_eq!(
            classifier().classify(env, None),
            Classification::Ignored(IgnoreReason::UnhandledType)
        );
    }
}
