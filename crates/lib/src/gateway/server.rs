//! Gateway HTTP server: webhook intake, health, and service metadata on a single port.

use crate::backend::{self, BackendSelection};
use crate::channels::{
    ActionableEvent, Classification, Classifier, Envelope, IgnoreReason, Notifier, SlackNotifier,
};
use crate::config::Settings;
use crate::gateway::health::HealthReport;
use crate::gateway::protocol::{
    Ack, ChallengeResponse, InboundRequest, ServiceEndpoints, ServiceInfo, Unauthorized,
};
use crate::routing::RoutingDecision;
use crate::session::CorrelationContext;
use crate::signature::{self, SignatureCheck, SignatureHeaders};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

const SERVICE_DISPLAY_NAME: &str = "Relay Slack Gateway";
const SERVICE_DESCRIPTION: &str = "Slack event handler proxying to agent backends";
const EVENTS_PATH: &str = "/events";
const LEGACY_EVENTS_PATH: &str = "/slack/events";
const HEALTH_PATH: &str = "/health";
/// Largest accepted webhook body; larger requests get 413 before the handler runs.
pub const MAX_EVENT_BODY_BYTES: usize = 1024 * 1024;

/// Shared, read-only state for request handlers. Built once before the listener starts.
#[derive(Clone)]
pub struct GatewayState {
    pub settings: Arc<Settings>,
    pub backend: BackendSelection,
    /// None when no bot token is configured; replies are then dropped.
    pub notifier: Option<Arc<dyn Notifier>>,
    pub classifier: Arc<Classifier>,
}

impl GatewayState {
    /// Resolve routing and build backend and notifier clients from settings.
    pub fn new(settings: Settings) -> Self {
        let decision = RoutingDecision::resolve(&settings);
        let backend = BackendSelection::from_settings(&settings, decision);
        let notifier: Option<Arc<dyn Notifier>> = settings.slack.bot_token.as_ref().map(|token| {
            Arc::new(SlackNotifier::new(settings.slack.api_base.clone(), token.clone()))
                as Arc<dyn Notifier>
        });
        let classifier = Classifier::new(settings.slack.bot_user_id.clone());
        Self {
            settings: Arc::new(settings),
            backend,
            notifier,
            classifier: Arc::new(classifier),
        }
    }

    pub fn routing(&self) -> RoutingDecision {
        self.backend.decision()
    }

    pub fn health_report(&self) -> HealthReport {
        HealthReport::new(&self.settings, self.routing())
    }
}

/// Build the HTTP router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route(HEALTH_PATH, get(health_http))
        .route(EVENTS_PATH, post(events))
        .route(LEGACY_EVENTS_PATH, post(events))
        .layer(DefaultBodyLimit::max(MAX_EVENT_BODY_BYTES))
        .with_state(state)
}

/// Bind to the configured address and serve until SIGINT/SIGTERM.
pub async fn run_gateway(settings: Settings) -> Result<()> {
    let bind_addr = format!("{}:{}", settings.bind.trim(), settings.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);
    serve(listener, GatewayState::new(settings)).await
}

/// Serve on an already-bound listener.
pub async fn serve(listener: tokio::net::TcpListener, state: GatewayState) -> Result<()> {
    log_startup(&state);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

fn log_startup(state: &GatewayState) {
    let settings = &state.settings;
    let missing = settings.missing_vars();
    match state.routing() {
        RoutingDecision::Misconfigured => log::error!(
            "gateway enabled but misconfigured; events will be acknowledged and dropped (missing: {})",
            missing.join(", ")
        ),
        RoutingDecision::Disabled => {
            log::info!("gateway disabled; events will be acknowledged and dropped")
        }
        decision => {
            if !missing.is_empty() {
                log::warn!("routing={} but missing settings: {}", decision, missing.join(", "));
            }
            log::info!(
                "routing={} timeout={}s retry_enabled={} max_retries={}",
                decision,
                settings.retry.timeout_per_attempt.as_secs(),
                settings.retry.retry_enabled,
                settings.retry.max_retries
            );
        }
    }
    if state.notifier.is_none() {
        log::warn!("SLACK_BOT_TOKEN not set; replies will not be posted");
    }
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

fn ack() -> Response {
    Json(Ack::ok()).into_response()
}

/// POST /events — verify, classify, and (for actionable events) query the backend and reply.
///
/// Every path except a failed signature answers 200 `{"ok": true}` so the platform does not
/// redeliver.
async fn events(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    let ctx = CorrelationContext::new();
    let request = InboundRequest::new(&headers, body);

    let check = signature::check(
        state.settings.slack.signing_secret.as_deref(),
        SignatureHeaders {
            timestamp: request.timestamp.as_deref(),
            signature: request.signature.as_deref(),
        },
        &request.body,
        state.settings.slack.require_signature,
        chrono::Utc::now().timestamp(),
    );
    match check {
        SignatureCheck::Rejected(reason) => {
            log::warn!(
                "correlation_id={} invalid request signature: {}",
                ctx.correlation_id,
                reason.as_str()
            );
            return (
                StatusCode::UNAUTHORIZED,
                Json(Unauthorized {
                    ok: false,
                    error: "invalid_signature",
                }),
            )
                .into_response();
        }
        SignatureCheck::Skipped => log::debug!(
            "correlation_id={} signature headers missing; verification skipped",
            ctx.correlation_id
        ),
        SignatureCheck::Verified => {}
    }

    let classification = match Envelope::parse(&request.body) {
        Ok(envelope) => {
            log::debug!(
                "correlation_id={} envelope type={}",
                ctx.correlation_id,
                envelope.type_name()
            );
            state
                .classifier
                .classify(envelope, request.retry_num.as_deref())
        }
        Err(e) => {
            log::warn!("correlation_id={} {}", ctx.correlation_id, e);
            Classification::Ignored(IgnoreReason::MalformedPayload)
        }
    };

    match classification {
        Classification::Challenge(challenge) => {
            log::info!("correlation_id={} url verification challenge received", ctx.correlation_id);
            Json(ChallengeResponse { challenge }).into_response()
        }
        Classification::Ignored(reason) => {
            log::info!(
                "correlation_id={} event ignored: {}",
                ctx.correlation_id,
                reason.as_str()
            );
            ack()
        }
        Classification::Actionable(event) => {
            dispatch(state, event, ctx).await;
            ack()
        }
    }
}

/// Run event processing on its own task. A client disconnect drops this handler but not the
/// task, and a panic inside processing surfaces here as a join error instead of a 500.
async fn dispatch(state: GatewayState, event: ActionableEvent, ctx: CorrelationContext) {
    let correlation_id = ctx.correlation_id.clone();
    let defer = state.settings.defer_replies;
    let task = tokio::spawn(process_event(state, event, ctx));
    if defer {
        return;
    }
    if let Err(e) = task.await {
        log::error!(
            "correlation_id={} event processing failed: {}",
            correlation_id,
            e
        );
    }
}

/// Query the selected backend and post the outcome to the origin channel.
async fn process_event(state: GatewayState, event: ActionableEvent, ctx: CorrelationContext) {
    let session = event.session_key();
    let mut ctx = ctx.with_session(session.clone());
    log::info!(
        "correlation_id={} event kind={} user={} channel={} text_length={}",
        ctx.correlation_id,
        event.kind.as_str(),
        event.user_id,
        event.channel_id,
        event.text.len()
    );

    let backend = match &state.backend {
        BackendSelection::Available(b) => b.clone(),
        BackendSelection::Unavailable(RoutingDecision::Misconfigured) => {
            log::error!(
                "correlation_id={} routing misconfigured; event dropped",
                ctx.correlation_id
            );
            return;
        }
        BackendSelection::Unavailable(decision) => {
            log::info!(
                "correlation_id={} routing {}; event dropped",
                ctx.correlation_id,
                decision
            );
            return;
        }
    };

    let outcome = backend::invoke(
        backend.as_ref(),
        &event,
        &session,
        &mut ctx,
        &state.settings.retry,
    )
    .await;
    log::info!(
        "correlation_id={} session={} outcome success={} error_kind={} attempts={}",
        ctx.correlation_id,
        session,
        outcome.success(),
        outcome.error_label(),
        ctx.attempt
    );

    let Some(notifier) = state.notifier.as_ref() else {
        log::warn!(
            "correlation_id={} no notifier configured; reply dropped",
            ctx.correlation_id
        );
        return;
    };
    if let Err(e) = notifier
        .post_message(
            &event.channel_id,
            outcome.text(),
            event.thread_ref.as_deref(),
            &ctx,
        )
        .await
    {
        log::error!(
            "correlation_id={} {} reply to channel={} failed: {}",
            ctx.correlation_id,
            notifier.id(),
            event.channel_id,
            e
        );
    }
}

/// GET /health
async fn health_http(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(state.health_report())
}

/// GET / — static service metadata.
async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: SERVICE_DISPLAY_NAME,
        version: env!("CARGO_PKG_VERSION"),
        description: SERVICE_DESCRIPTION,
        endpoints: ServiceEndpoints {
            events: EVENTS_PATH,
            health: HEALTH_PATH,
        },
    })
}
