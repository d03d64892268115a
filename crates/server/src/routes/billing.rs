use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde_json::{json, Value};
use service::garage::BillingInput;

use crate::{errors::{JsonApiError, JsonBody}, state::AppState};

#[utoipa::path(
    post, path = "/api/billing", tag = "billing",
    request_body = crate::openapi::BillingRequestDoc,
    responses(
        (status = 201, description = "Billing created"),
        (status = 200, description = "Billing already exists for this appointment"),
        (status = 404, description = "Appointment not found", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn create(State(state): State<AppState>, JsonBody(input): JsonBody<BillingInput>) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let resolved = state.garage.derive_billing(input).await?;
    let (status, message) = if resolved.created {
        (StatusCode::CREATED, "Billing created successfully")
    } else {
        (StatusCode::OK, "Billing already exists for this appointment")
    };
    Ok((status, Json(json!({ "message": message, "billing": resolved.value }))))
}

#[utoipa::path(get, path = "/api/billing", tag = "billing", responses((status = 200, description = "List OK")))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, JsonApiError> {
    let billing = state.garage.list_billing().await?;
    Ok(Json(json!({ "count": billing.len(), "billing": billing })))
}

#[utoipa::path(
    put, path = "/api/billing/{id}/pay", tag = "billing",
    params(("id" = i32, Path, description = "Billing id")),
    responses(
        (status = 200, description = "Payment marked as paid"),
        (status = 404, description = "Not Found", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn pay(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Value>, JsonApiError> {
    let paid = state.garage.mark_paid(id).await?;
    Ok(Json(json!({ "message": "Payment marked as paid successfully", "billing": paid })))
}
