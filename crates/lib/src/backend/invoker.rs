//! Resilient proxy invoker: bounded retries for 5xx, a per-attempt timeout, and a single
//! user-facing outcome for every failure class.
//!
//! The attempt loop is an explicit state machine:
//! `Attempting(n) -> Answered | Retry -> Attempting(n + 1) (n <= max_retries) | Failed`.
//! Only 5xx is retried, immediately and without backoff. Timeouts, connection failures, 4xx and
//! payload-level errors end the loop on the first occurrence.

use super::{AgentBackend, AgentQuery, BackendError, BackendOutcome, ErrorKind};
use crate::channels::ActionableEvent;
use crate::session::{CorrelationContext, SessionKey};
use std::time::Duration;

/// Outbound retry policy. Process-wide, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Budget for one attempt (not cumulative).
    pub timeout_per_attempt: Duration,
    pub retry_enabled: bool,
    pub max_retries: u32,
}

impl RetryPolicy {
    /// Retries actually allowed: zero when retry is switched off.
    pub fn effective_max_retries(&self) -> u32 {
        if self.retry_enabled {
            self.max_retries
        } else {
            0
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.effective_max_retries().saturating_add(1)
    }
}

enum AttemptState {
    Attempting(u32),
    Done(BackendOutcome),
}

/// Result of one attempt before the retry decision.
enum Step {
    Answered(String),
    Retryable(u16),
    Terminal(ErrorKind),
}

fn classify_attempt(
    result: Result<Result<String, BackendError>, tokio::time::error::Elapsed>,
    ctx: &CorrelationContext,
    timeout: Duration,
) -> Step {
    let err = match result {
        Ok(Ok(text)) => return Step::Answered(text),
        Ok(Err(e)) => e,
        Err(_) => BackendError::Timeout,
    };
    match err {
        BackendError::Status { status, .. } if (500..600).contains(&status) => {
            log::warn!(
                "correlation_id={} session={} attempt={} backend returned {}",
                ctx.correlation_id,
                ctx.session(),
                ctx.attempt,
                status
            );
            Step::Retryable(status)
        }
        BackendError::Status { status, ref body } => {
            log::error!(
                "correlation_id={} session={} attempt={} error_type=http_status status={} detail={}",
                ctx.correlation_id,
                ctx.session(),
                ctx.attempt,
                status,
                body
            );
            Step::Terminal(ErrorKind::HttpStatus)
        }
        BackendError::Remote(ref detail) => {
            log::error!(
                "correlation_id={} session={} attempt={} error_type=http_status backend reported error: {}",
                ctx.correlation_id,
                ctx.session(),
                ctx.attempt,
                detail
            );
            Step::Terminal(ErrorKind::HttpStatus)
        }
        BackendError::Timeout => {
            log::error!(
                "correlation_id={} session={} attempt={} error_type=timeout request timed out after {:?}",
                ctx.correlation_id,
                ctx.session(),
                ctx.attempt,
                timeout
            );
            Step::Terminal(ErrorKind::Timeout)
        }
        BackendError::Connection(ref detail) => {
            log::error!(
                "correlation_id={} session={} attempt={} error_type=connection {}",
                ctx.correlation_id,
                ctx.session(),
                ctx.attempt,
                detail
            );
            Step::Terminal(ErrorKind::Connection)
        }
        BackendError::Other(ref detail) => {
            log::error!(
                "correlation_id={} session={} attempt={} error_type=unknown {}",
                ctx.correlation_id,
                ctx.session(),
                ctx.attempt,
                detail
            );
            Step::Terminal(ErrorKind::Unknown)
        }
    }
}

/// Query the backend for an event. Never fails: every error becomes a `BackendOutcome::Failed`.
pub async fn invoke(
    backend: &dyn AgentBackend,
    event: &ActionableEvent,
    session: &SessionKey,
    ctx: &mut CorrelationContext,
    policy: &RetryPolicy,
) -> BackendOutcome {
    let max_retries = policy.effective_max_retries();
    let mut state = AttemptState::Attempting(1);
    loop {
        let n = match state {
            AttemptState::Attempting(n) => n,
            AttemptState::Done(outcome) => return outcome,
        };
        ctx.attempt = n;
        log::info!(
            "correlation_id={} session={} attempt={}/{} routing={} endpoint={} query_length={}",
            ctx.correlation_id,
            session,
            n,
            policy.max_attempts(),
            backend.route(),
            backend.endpoint(),
            event.text.len()
        );
        let query = AgentQuery {
            prompt: &event.text,
            session_id: session.as_str(),
            correlation_id: &ctx.correlation_id,
        };
        let result = tokio::time::timeout(policy.timeout_per_attempt, backend.query(&query)).await;
        state = match classify_attempt(result, ctx, policy.timeout_per_attempt) {
            Step::Answered(text) => {
                log::info!(
                    "correlation_id={} session={} attempt={} response received length={}",
                    ctx.correlation_id,
                    session,
                    n,
                    text.len()
                );
                AttemptState::Done(BackendOutcome::answered(text))
            }
            Step::Retryable(_) if n <= max_retries => AttemptState::Attempting(n.saturating_add(1)),
            Step::Retryable(status) => {
                log::error!(
                    "correlation_id={} session={} error_type=http_status status={} retries exhausted after {} attempts",
                    ctx.correlation_id,
                    session,
                    status,
                    n
                );
                AttemptState::Done(BackendOutcome::failed(ErrorKind::HttpStatus))
            }
            Step::Terminal(kind) => AttemptState::Done(BackendOutcome::failed(kind)),
        };
    }
}
