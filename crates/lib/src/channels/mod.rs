//! Chat platform side of the gateway.
//!
//! Inbound: webhook envelopes are parsed and classified into challenges, actionable events, or
//! ignored deliveries. Outbound: a notifier posts the backend's answer into the origin channel.

mod classify;
mod envelope;
mod notifier;

pub use classify::{ActionableEvent, Classification, Classifier, EventKind, IgnoreReason};
pub use envelope::{Envelope, ParseFailure, SlackEvent};
pub use notifier::{Notifier, NotifyError, SlackNotifier};
