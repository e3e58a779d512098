use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::monitor::{HostRegistration, HostSnapshot};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub hosts: usize,
    pub uptime_secs: u64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        hosts: state.registry.len().await,
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

pub async fn list_hosts(State(state): State<AppState>) -> Json<Vec<HostSnapshot>> {
    Json(state.registry.list().await)
}

pub async fn get_host(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HostSnapshot>, ApiError> {
    Ok(Json(state.registry.get(&id).await?))
}

pub async fn add_host(
    State(state): State<AppState>,
    Json(registration): Json<HostRegistration>,
) -> Result<(StatusCode, Json<HostSnapshot>), ApiError> {
    let snapshot = state.registry.add(registration).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn remove_host(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.registry.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
