use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::dashboard::DashboardHandle;
use crate::fetch::ServiceDataSource;

use super::handlers::{
    create_service, delete_service, get_chart_data, health_check, list_services, refresh_now,
    set_service_enabled, toggle_service, AppState,
};

pub fn create_api_router(dashboard: DashboardHandle, source: Arc<dyn ServiceDataSource>) -> Router {
    let state = Arc::new(AppState { dashboard, source });

    let api_routes = Router::new()
        .route("/chart-data", get(get_chart_data))
        .route("/services", get(list_services))
        .route("/services", post(create_service))
        .route("/services/{id}", delete(delete_service))
        .route("/services/{id}/toggle", post(toggle_service))
        .route("/services/{id}/enabled", put(set_service_enabled))
        .route("/refresh", post(refresh_now))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
