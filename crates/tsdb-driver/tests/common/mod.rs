//! In-process stand-in for the database's HTTP API.
//!
//! Replies are scripted: each request pops the next `(status, body)` from a
//! queue, falling back to a fixed reply once the queue is empty. Every
//! request is recorded for later assertions, along with the client socket
//! it arrived on. An optional delay holds each reply so tests can observe
//! how many requests the driver keeps in flight.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{ConnectInfo, State};
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use tsdb_driver::Configuration;

#[derive(Debug, Clone)]
pub struct Captured {
    pub peer: SocketAddr,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
}

impl Captured {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

struct Script {
    replies: VecDeque<(u16, String)>,
    fallback: (u16, String),
    delay: Duration,
    captured: Vec<Captured>,
}

#[derive(Default)]
struct InFlight {
    now: AtomicUsize,
    peak: AtomicUsize,
}

#[derive(Clone)]
struct Shared {
    script: Arc<Mutex<Script>>,
    in_flight: Arc<InFlight>,
}

#[derive(Clone)]
pub struct MockTsdb {
    pub addr: SocketAddr,
    script: Arc<Mutex<Script>>,
    in_flight: Arc<InFlight>,
}

impl MockTsdb {
    /// Start a server on a random port. Unscripted requests get `200 {}`.
    pub async fn start() -> Self {
        let shared = Shared {
            script: Arc::new(Mutex::new(Script {
                replies: VecDeque::new(),
                fallback: (200, "{}".to_string()),
                delay: Duration::ZERO,
                captured: Vec::new(),
            })),
            in_flight: Arc::new(InFlight::default()),
        };
        let router = Router::new().fallback(reply).with_state(shared.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });
        Self {
            addr,
            script: shared.script,
            in_flight: shared.in_flight,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Queue one reply.
    pub fn push(&self, status: u16, body: impl Into<String>) -> &Self {
        self.script.lock().unwrap().replies.push_back((status, body.into()));
        self
    }

    /// Reply used once the queue is empty.
    pub fn always(&self, status: u16, body: impl Into<String>) -> &Self {
        self.script.lock().unwrap().fallback = (status, body.into());
        self
    }

    /// Hold every reply for `delay` before sending it.
    pub fn delay(&self, delay: Duration) -> &Self {
        self.script.lock().unwrap().delay = delay;
        self
    }

    /// Most requests the server was handling at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }

    /// Distinct client sockets seen, in order of first use.
    pub fn peers(&self) -> Vec<SocketAddr> {
        let mut peers = Vec::new();
        for request in self.requests() {
            if !peers.contains(&request.peer) {
                peers.push(request.peer);
            }
        }
        peers
    }

    pub fn hits(&self) -> usize {
        self.script.lock().unwrap().captured.len()
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.script.lock().unwrap().captured.clone()
    }

    pub fn last_request(&self) -> Captured {
        self.script.lock().unwrap().captured.last().cloned().unwrap()
    }
}

async fn reply(
    State(shared): State<Shared>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    body: String,
) -> impl IntoResponse {
    let now = shared.in_flight.now.fetch_add(1, Ordering::SeqCst) + 1;
    shared.in_flight.peak.fetch_max(now, Ordering::SeqCst);

    let (status, text, delay) = {
        let mut script = shared.script.lock().unwrap();
        script.captured.push(Captured {
            peer,
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            body,
        });
        let (status, text) = match script.replies.pop_front() {
            Some(next) => next,
            None => script.fallback.clone(),
        };
        (status, text, script.delay)
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    shared.in_flight.now.fetch_sub(1, Ordering::SeqCst);

    let status = StatusCode::from_u16(status).unwrap();
    (status, [(header::CONTENT_TYPE, "application/json")], text)
}

/// Small pool and generous timeouts so tests stay cheap and unflaky.
pub fn test_config() -> Configuration {
    Configuration::default()
        .with_io_threads(1)
        .with_pool_size(8)
        .with_max_route(4)
        .with_connect_timeout(Duration::from_secs(2))
        .with_socket_timeout(Duration::from_secs(5))
}

pub const OPENTSDB_500: &str = r#"{
  "error": {
    "code": 500,
    "message": "Unable to connect to HBase",
    "details": "region server unavailable",
    "trace": "net.opentsdb.tsd.HttpQuery.internalError(HttpQuery.java:190)"
  }
}"#;

pub const SERIES_REPLY: &str = r#"[{
  "metric": "sys.cpu.user",
  "tags": {"host": "web01"},
  "aggregateTags": [],
  "dps": {"1700000000": 1.5, "1700000060": 2}
}]"#;
