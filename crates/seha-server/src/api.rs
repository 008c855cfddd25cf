use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::Method,
    middleware,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::record_store::BackupRecordStore;

#[derive(Clone)]
pub struct AppState {
    pub record_store: Arc<BackupRecordStore>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let body_limit = state.config.max_backup_size + 4096; // headroom for the JSON envelope

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/backup/:user_id", put(backup_upsert).get(backup_fetch).delete(backup_delete))
        .route("/backup/:user_id/status", get(backup_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    max_backup_size: usize,
}

#[derive(Deserialize)]
struct UpsertRequest {
    /// Encrypted backup data (the client encrypts before sending).
    encrypted_blob: String,
}

#[derive(Serialize)]
struct UpsertResponse {
    stored: bool,
    size_bytes: usize,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct FetchResponse {
    encrypted_blob: String,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct StatusResponse {
    exists: bool,
    updated_at: Option<DateTime<Utc>>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        max_backup_size: state.config.max_backup_size,
    })
}

/// Write or overwrite the one backup record for the user.
async fn backup_upsert(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpsertRequest>,
) -> Result<Json<UpsertResponse>, ServerError> {
    let record = state.record_store.upsert(user_id, &req.encrypted_blob).await?;

    info!(
        user = %user_id,
        size = req.encrypted_blob.len(),
        "Backup record upserted"
    );

    Ok(Json(UpsertResponse {
        stored: true,
        size_bytes: req.encrypted_blob.len(),
        updated_at: record.updated_at,
    }))
}

/// Return the stored record, or 404 when the user has never backed up.
async fn backup_fetch(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<FetchResponse>, ServerError> {
    let record = state
        .record_store
        .get(user_id)
        .await?
        .ok_or(ServerError::BackupNotFound(user_id))?;

    Ok(Json(FetchResponse {
        encrypted_blob: record.encrypted_blob,
        updated_at: record.updated_at,
    }))
}

/// Record existence + timestamp. Always 200; absence is not an error.
async fn backup_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ServerError> {
    let record = state.record_store.get(user_id).await?;

    Ok(Json(StatusResponse {
        exists: record.is_some(),
        updated_at: record.map(|r| r.updated_at),
    }))
}

async fn backup_delete(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServerError> {
    state.record_store.delete(user_id).await?;

    info!(user = %user_id, "Backup record deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
