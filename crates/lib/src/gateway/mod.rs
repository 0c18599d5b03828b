//! Gateway: the HTTP surface of the service.
//!
//! `POST /events` takes platform webhooks, `GET /health` reports configuration state, and
//! `GET /` returns static metadata. All three share one port.

mod health;
mod protocol;
mod server;

pub use health::{HealthReport, HealthStatus, RetryPolicyReport, SERVICE_NAME};
pub use protocol::{Ack, ChallengeResponse, InboundRequest, ServiceInfo};
pub use server::{router, run_gateway, serve, GatewayState, MAX_EVENT_BODY_BYTES};
