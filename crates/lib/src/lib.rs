//! Relay core library — webhook verification, event classification, backend routing with
//! bounded retry, and reply delivery for the chat event gateway.

pub mod backend;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod routing;
pub mod session;
pub mod signature;
