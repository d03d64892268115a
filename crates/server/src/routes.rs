use axum::{
    routing::{get, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::types::{Banner, Health};

use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod appointments;
pub mod billing;
pub mod catalog;
pub mod customers;

pub const APP_NAME: &str = "Garage Management System";

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn banner() -> Json<Banner> {
    Json(Banner::running(APP_NAME))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router: banner, liveness, `/api/*` and the OpenAPI document.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/customers", get(customers::list).post(customers::create))
        .route("/services", get(catalog::list).post(catalog::create))
        .route("/appointments", get(appointments::list).post(appointments::create))
        .route("/appointments/:id", put(appointments::update))
        .route("/billing", get(billing::list).post(billing::create))
        .route("/billing/:id/pay", put(billing::pay));

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求一个 span（方法、路径）
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // 响应：状态码与耗时
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
