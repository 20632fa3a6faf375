//! Rotas HTTP
//!
//! Um módulo por recurso; cada um expõe `router()` montado aqui sob `/api`.

use axum::{routing::get, Router};
use chrono::NaiveDate;
use common_db::models::PageRequest;
use common_validation::date::{is_supported_date, MAX_YEAR, MIN_YEAR};
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub mod appointments;
pub mod calendar;
pub mod clinical;
pub mod dashboard;
pub mod health;
pub mod medical_records;
pub mod patients;
pub mod reports;
pub mod session;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(session::router())
        .merge(patients::router())
        .merge(appointments::router())
        .merge(calendar::router())
        .merge(dashboard::router())
        .merge(medical_records::router())
        .merge(clinical::router())
        .merge(reports::router());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors)
                .layer(ConcurrencyLimitLayer::new(state.config.max_concurrent_requests)),
        )
        .with_state(state)
}

/// `page`/`per_page` opcionais da query string
pub(crate) fn page_request(page: Option<u32>, per_page: Option<u32>) -> PageRequest {
    let defaults = PageRequest::default();
    PageRequest::new(page.unwrap_or(defaults.page), per_page.unwrap_or(defaults.per_page))
}

/// Data de query string dentro dos anos que a agenda consegue calcular
pub(crate) fn supported_date(field: &str, date: NaiveDate) -> ApiResult<NaiveDate> {
    if is_supported_date(date) {
        Ok(date)
    } else {
        Err(ApiError::field(
            field,
            format!("Data deve estar entre os anos {} e {}", MIN_YEAR, MAX_YEAR),
        ))
    }
}
