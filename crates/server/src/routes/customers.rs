use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use service::garage::NewCustomer;
use tracing::info;

use crate::{errors::{JsonApiError, JsonBody}, state::AppState};

#[utoipa::path(
    post, path = "/api/customers", tag = "customers",
    request_body = crate::openapi::CustomerRequestDoc,
    responses(
        (status = 201, description = "Customer created"),
        (status = 200, description = "Customer already exists"),
        (status = 400, description = "Validation Error", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn create(State(state): State<AppState>, JsonBody(input): JsonBody<NewCustomer>) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let resolved = state.garage.resolve_or_create_customer(input).await?;
    let (status, message) = if resolved.created {
        (StatusCode::CREATED, "Customer created successfully")
    } else {
        (StatusCode::OK, "Customer already exists")
    };
    Ok((status, Json(json!({ "message": message, "customer": resolved.value }))))
}

#[utoipa::path(get, path = "/api/customers", tag = "customers", responses((status = 200, description = "List OK")))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, JsonApiError> {
    let customers = state.garage.list_customers().await?;
    info!(count = customers.len(), "list customers");
    Ok(Json(json!({ "count": customers.len(), "customers": customers })))
}
