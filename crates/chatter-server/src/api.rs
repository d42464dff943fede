use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use chatter_shared::constants::MAX_TEXT_SIZE;
use chatter_shared::{OutgoingRecord, RemoteRecord, Snapshot};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::store::MessageStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MessageStore>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/messages", get(list_messages).post(append_message))
        .route("/messages/watch", get(watch_messages))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_TEXT_SIZE * 4))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct WatchParams {
    #[serde(default)]
    after: u64,
    #[serde(default)]
    epoch: Option<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_messages(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.store.snapshot())
}

async fn append_message(
    State(state): State<AppState>,
    Json(record): Json<OutgoingRecord>,
) -> Result<(StatusCode, Json<RemoteRecord>), ServerError> {
    let stored = state.store.append(record)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn watch_messages(
    State(state): State<AppState>,
    Query(params): Query<WatchParams>,
) -> Result<Json<Snapshot>, ServerError> {
    let snapshot = state
        .store
        .wait_for_change(
            params.epoch.as_deref(),
            params.after,
            state.config.watch_timeout,
        )
        .await?;
    Ok(Json(snapshot))
}
