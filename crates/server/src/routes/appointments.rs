use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde_json::{json, Value};
use service::garage::{AppointmentUpdate, BookingInput};
use tracing::info;

use crate::{errors::{JsonApiError, JsonBody}, state::AppState};

#[utoipa::path(
    post, path = "/api/appointments", tag = "appointments",
    request_body = crate::openapi::BookingRequestDoc,
    responses(
        (status = 201, description = "Appointment booked"),
        (status = 400, description = "Validation Error", body = crate::openapi::ErrorDoc),
        (status = 404, description = "Service not found", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn create(State(state): State<AppState>, JsonBody(input): JsonBody<BookingInput>) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let booked = state.garage.book(input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Appointment booked successfully", "appointment": booked }))))
}

#[utoipa::path(get, path = "/api/appointments", tag = "appointments", responses((status = 200, description = "List OK")))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, JsonApiError> {
    let appointments = state.garage.list_appointments().await?;
    info!(count = appointments.len(), "list appointments");
    Ok(Json(json!({ "count": appointments.len(), "appointments": appointments })))
}

/// Status, date and time in one update; `Completed` issues the bill.
#[utoipa::path(
    put, path = "/api/appointments/{id}", tag = "appointments",
    params(("id" = i32, Path, description = "Appointment id")),
    request_body = crate::openapi::AppointmentUpdateDoc,
    responses(
        (status = 200, description = "Appointment updated"),
        (status = 400, description = "Invalid status", body = crate::openapi::ErrorDoc),
        (status = 404, description = "Not Found", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    JsonBody(changes): JsonBody<AppointmentUpdate>,
) -> Result<Json<Value>, JsonApiError> {
    let updated = state.garage.update(id, changes).await?;
    Ok(Json(json!({ "message": "Appointment updated successfully", "appointment": updated })))
}
