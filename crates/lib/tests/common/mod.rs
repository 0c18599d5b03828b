//! Shared harness: a gateway on an ephemeral port plus scripted backend and chat API mocks.

#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use relay::config::{Config, Settings};
use relay::gateway::{self, GatewayState};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SIGNING_SECRET: &str = "test-signing-secret";

/// One scripted backend reply.
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(text: &str) -> Self {
        Self {
            status: 200,
            body: json!({ "response": text }),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: json!({ "detail": "upstream failure" }),
            delay: Duration::ZERO,
        }
    }

    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::ok("too late")
        }
    }
}

/// Records every JSON request body it receives and answers from a script.
#[derive(Clone, Default)]
pub struct Recorder {
    pub requests: Arc<Mutex<Vec<Value>>>,
    script: Arc<Mutex<VecDeque<Reply>>>,
}

impl Recorder {
    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

async fn scripted(
    State(rec): State<Recorder>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    rec.requests.lock().unwrap().push(body);
    let reply = rec
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Reply::ok("default"));
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (StatusCode::from_u16(reply.status).unwrap(), Json(reply.body))
}

async fn spawn_router(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

/// Mock backend serving `path`. Returns its base URL and the recorder.
pub async fn spawn_backend(path: &str, script: Vec<Reply>) -> (String, Recorder) {
    let rec = Recorder {
        requests: Arc::default(),
        script: Arc::new(Mutex::new(script.into())),
    };
    let app = Router::new().route(path, post(scripted)).with_state(rec.clone());
    (spawn_router(app).await, rec)
}

/// Mock chat Web API (`/chat.postMessage`) answering `reply` to every post.
pub async fn spawn_chat_api(reply: Value) -> (String, Recorder) {
    let script = vec![
        Reply {
            status: 200,
            body: reply,
            delay: Duration::ZERO,
        };
        16
    ];
    spawn_backend("/chat.postMessage", script).await
}

pub fn settings(config: &Config, vars: &[(&str, &str)]) -> Settings {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Settings::resolve_with(config, |name| map.get(name).cloned()).expect("resolve settings")
}

/// Start the gateway on an ephemeral port; returns its base URL.
pub async fn start_gateway(settings: Settings) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind gateway");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = gateway::serve(listener, GatewayState::new(settings)).await;
    });
    format!("http://{}", addr)
}

pub fn app_mention(text: &str) -> Value {
    json!({
        "type": "event_callback",
        "team_id": "T12345678",
        "api_app_id": "A12345678",
        "event": {
            "type": "app_mention",
            "user": "U12345678",
            "text": text,
            "ts": "1234567890.123456",
            "channel": "C12345678",
            "event_ts": "1234567890.123456"
        },
        "event_id": "Ev12345678",
        "event_time": 1234567890
    })
}

pub fn now_ts() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// POST a JSON body to `/events` with optional signature headers and retry header.
pub async fn post_event(
    base: &str,
    body: &Value,
    signed: Option<(&str, &str)>,
    retry_num: Option<&str>,
) -> reqwest::Response {
    let raw = serde_json::to_vec(body).unwrap();
    post_raw(base, raw, signed, retry_num).await
}

pub async fn post_raw(
    base: &str,
    raw: Vec<u8>,
    signed: Option<(&str, &str)>,
    retry_num: Option<&str>,
) -> reqwest::Response {
    let mut req = reqwest::Client::new()
        .post(format!("{}/events", base))
        .header("content-type", "application/json");
    if let Some((secret, ts)) = signed {
        let sig = relay::signature::sign(secret, ts, &raw);
        req = req
            .header("X-Slack-Request-Timestamp", ts)
            .header("X-Slack-Signature", sig);
    }
    if let Some(n) = retry_num {
        req = req.header("X-Slack-Retry-Num", n);
    }
    req.body(raw).send().await.expect("post event")
}

/// Poll until `rec` has seen `n` requests (for deferred processing).
pub async fn wait_for(rec: &Recorder, n: usize) {
    for _ in 0..100 {
        if rec.count() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {} requests, saw {}", n, rec.count());
}
