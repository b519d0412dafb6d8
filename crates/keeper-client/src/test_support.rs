//! Stub Keeper deployment for tests: a token endpoint and a scripted document API
//! served by one axum router on 127.0.0.1.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use keeper_auth::{Credentials, now_secs};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// What the document API saw for one request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Clone, Default)]
pub struct Stub {
    token_calls: Arc<AtomicUsize>,
    token_reply: Arc<Mutex<Option<(u16, Value)>>>,
    api_replies: Arc<Mutex<VecDeque<(u16, Value)>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl Stub {
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Replace the default `AT-refreshed-<n>` token reply.
    pub fn set_token_reply(&self, status: u16, body: Value) {
        *self.token_reply.lock().unwrap() = Some((status, body));
    }
}

/// Start the stub. API replies are served in order, the last one repeating.
/// A JSON string reply is sent as a raw text body.
pub async fn start_stub(api_replies: Vec<(u16, Value)>) -> (String, Stub) {
    let stub = Stub {
        api_replies: Arc::new(Mutex::new(api_replies.into())),
        ..Stub::default()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let site = format!("http://{}", listener.local_addr().unwrap());

    let app = axum::Router::new()
        .route("/token", post(token_handler))
        .route("/v2/document", any(api_handler))
        .route("/v2/document/{id}", any(api_handler))
        .with_state(stub.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (site, stub)
}

/// A site URL nothing listens on.
pub async fn unreachable_site() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let site = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    site
}

/// Credentials pointed at `site` holding `AT0`, valid for an hour, and `RT0`.
pub fn fresh_credentials(site: &str) -> Credentials {
    let mut creds = Credentials::new("c", "s");
    creds.auth_site = site.to_string();
    creds.token_path = "/token".into();
    creds.api_site = site.to_string();
    creds.access_token = Some("AT0".into());
    creds.refresh_token = Some("RT0".into());
    creds.expires_in = Some(3600);
    creds.expire_time = Some(now_secs() + 3600);
    creds
}

/// Same as `fresh_credentials` but expired a minute ago.
pub fn expired_credentials(site: &str) -> Credentials {
    let mut creds = fresh_credentials(site);
    creds.expire_time = Some(now_secs() - 60);
    creds
}

async fn token_handler(State(stub): State<Stub>) -> Response {
    let n = stub.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let scripted = stub.token_reply.lock().unwrap().clone();
    let (status, body) = scripted.unwrap_or_else(|| {
        (
            200,
            json!({
                "access_token": format!("AT-refreshed-{n}"),
                "expires_in": 3600,
                "token_type": "bearer"
            }),
        )
    });
    (StatusCode::from_u16(status).unwrap(), Json(body)).into_response()
}

async fn api_handler(State(stub): State<Stub>, request: Request) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
        .await
        .unwrap();
    stub.seen.lock().unwrap().push(SeenRequest {
        method,
        path,
        authorization,
        body: String::from_utf8_lossy(&bytes).to_string(),
    });

    let (status, body) = {
        let mut replies = stub.api_replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap_or((200, Value::Null))
        }
    };
    let status = StatusCode::from_u16(status).unwrap();
    match body {
        Value::String(text) => (status, text).into_response(),
        other => (status, Json(other)).into_response(),
    }
}
