use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use service::garage::NewService;

use crate::{errors::{JsonApiError, JsonBody}, state::AppState};

#[utoipa::path(
    post, path = "/api/services", tag = "services",
    request_body = crate::openapi::ServiceRequestDoc,
    responses(
        (status = 201, description = "Service created"),
        (status = 400, description = "Validation Error", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn create(State(state): State<AppState>, JsonBody(input): JsonBody<NewService>) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let created = state.garage.create_service(input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Service created successfully", "service": created }))))
}

#[utoipa::path(get, path = "/api/services", tag = "services", responses((status = 200, description = "List OK")))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, JsonApiError> {
    let services = state.garage.list_services().await?;
    Ok(Json(json!({ "count": services.len(), "services": services })))
}
