//! Minimal in-process message service for tests, in this crate and in crates
//! that enable the `test-util` feature.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::watch;

use chatter_shared::protocol::{WirePayload, WireUser};
use chatter_shared::{OutgoingRecord, RemoteRecord, Snapshot};

#[derive(Clone)]
struct StubState {
    snapshot: Arc<watch::Sender<Snapshot>>,
    appends: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    runs: Arc<AtomicU64>,
}

pub struct TestServer {
    pub base_url: String,
    state: StubState,
}

impl TestServer {
    /// Successful appends so far.
    pub fn appends(&self) -> usize {
        self.state.appends.load(Ordering::SeqCst)
    }

    /// Snapshot and watch requests received so far.
    pub fn reads(&self) -> usize {
        self.state.reads.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot.borrow().clone()
    }

    /// Insert a record as another client would, bumping the version.
    pub fn insert(&self, record: RemoteRecord) {
        self.state.snapshot.send_modify(|s| {
            s.version += 1;
            s.messages.insert(0, record);
        });
    }

    /// Simulate a restart that lost state: a new epoch holding `records` at
    /// version 1.
    pub fn restart_with(&self, records: Vec<RemoteRecord>) {
        let run = self.state.runs.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.snapshot.send_replace(Snapshot {
            epoch: format!("run-{run}"),
            version: 1,
            messages: records,
        });
    }
}

/// A timestamped text record from user `u2`.
pub fn record(id: &str, text: &str) -> RemoteRecord {
    RemoteRecord {
        id: id.to_string(),
        user: WireUser {
            id: "u2".into(),
            name: Some("Grace".into()),
        },
        created_at: Some(chrono::Utc::now()),
        payload: WirePayload {
            text: Some(text.to_string()),
            ..WirePayload::default()
        },
    }
}

#[derive(Deserialize)]
struct WatchParams {
    after: u64,
    #[serde(default)]
    epoch: Option<String>,
}

pub async fn spawn() -> TestServer {
    let (tx, _rx) = watch::channel(Snapshot {
        epoch: "run-0".into(),
        ..Snapshot::default()
    });
    let state = StubState {
        snapshot: Arc::new(tx),
        appends: Arc::new(AtomicUsize::new(0)),
        reads: Arc::new(AtomicUsize::new(0)),
        runs: Arc::new(AtomicU64::new(0)),
    };

    let router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/messages", get(list).post(append))
        .route("/messages/watch", get(watch_messages))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        state,
    }
}

async fn list(State(state): State<StubState>) -> Json<Snapshot> {
    state.reads.fetch_add(1, Ordering::SeqCst);
    Json(state.snapshot.borrow().clone())
}

async fn append(
    State(state): State<StubState>,
    Json(record): Json<OutgoingRecord>,
) -> StatusCode {
    if record.validate().is_err() {
        return StatusCode::BAD_REQUEST;
    }
    state.appends.fetch_add(1, Ordering::SeqCst);
    state.snapshot.send_modify(|s| {
        s.version += 1;
        let id = record.id.clone().unwrap_or_else(|| format!("srv-{}", s.version));
        s.messages.insert(
            0,
            RemoteRecord {
                id,
                user: record.user.clone(),
                created_at: None,
                payload: record.payload.clone(),
            },
        );
    });
    StatusCode::CREATED
}

async fn watch_messages(
    State(state): State<StubState>,
    Query(params): Query<WatchParams>,
) -> Json<Snapshot> {
    state.reads.fetch_add(1, Ordering::SeqCst);
    let mut rx = state.snapshot.subscribe();
    let epoch = params.epoch;
    let _ = tokio::time::timeout(
        Duration::from_millis(500),
        rx.wait_for(|s| s.version != params.after || epoch.as_deref().is_some_and(|e| e != s.epoch)),
    )
    .await;
    let current = rx.borrow().clone();
    Json(current)
}
