use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::analytics::models::ChartReadyData;
use crate::analytics::timescale::{PerTimescale, Timescale};
use crate::dashboard::{refresh, DashboardError, DashboardHandle, ServicesView};
use crate::fetch::{FetchError, ServiceDataSource};
use crate::models::ServiceLink;
use crate::services::ServiceError;

pub struct AppState {
    pub dashboard: DashboardHandle,
    pub source: Arc<dyn ServiceDataSource>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Deserialize)]
pub struct ChartQuery {
    pub timescale: Option<String>,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub id: String,
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct SetEnabledResponse {
    pub id: String,
    pub enabled: bool,
    pub changed: bool,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub timescales: PerTimescale<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        match e {
            DashboardError::Closed => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            DashboardError::Service(ServiceError::NotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, e.to_string())
            }
            DashboardError::Service(ServiceError::Duplicate(_)) => {
                error_response(StatusCode::CONFLICT, e.to_string())
            }
            DashboardError::Fetch(FetchError::SessionInvalid) => {
                error_response(StatusCode::UNAUTHORIZED, "session invalid")
            }
            DashboardError::Fetch(_) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
        }
    }
}

/// Push the current service list to the backend; failures are only logged
async fn publish(state: &AppState, links: &[ServiceLink]) {
    if let Err(e) = state.source.publish_services(links).await {
        warn!("Failed to publish services to backend: {}", e);
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Chart data for one timescale, read from the precomputed set
pub async fn get_chart_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ChartReadyData>, ApiError> {
    let timescale = match query.timescale.as_deref() {
        Some(raw) => raw
            .parse::<Timescale>()
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => Timescale::Hour,
    };

    let charts = state.dashboard.charts().await?;
    Ok(Json(charts.get(timescale).clone()))
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ServicesView>, ApiError> {
    Ok(Json(state.dashboard.services().await?))
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    Json(link): Json<ServiceLink>,
) -> Result<(StatusCode, Json<SuccessResponse>), ApiError> {
    if link.id.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "service id cannot be empty"));
    }

    let id = link.id.clone();
    let links = state.dashboard.add(link).await?;
    info!(id = %id, "Added service");
    publish(&state, &links).await;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse {
            message: format!("service '{id}' added"),
        }),
    ))
}

pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let links = state.dashboard.remove(&id).await?;
    info!(id = %id, "Removed service");
    publish(&state, &links).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let enabled = state.dashboard.toggle(&id).await?;
    Ok(Json(ToggleResponse { id, enabled }))
}

pub async fn set_service_enabled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SetEnabledRequest>,
) -> Result<Json<SetEnabledResponse>, ApiError> {
    let changed = state.dashboard.set_enabled(&id, payload.enabled).await?;
    Ok(Json(SetEnabledResponse {
        id,
        enabled: payload.enabled,
        changed,
    }))
}

/// Fetch every timescale now instead of waiting for the next tick
pub async fn refresh_now(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let timescales = refresh(&state.dashboard, Arc::clone(&state.source)).await?;
    Ok(Json(RefreshResponse { timescales }))
}
