use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use models::appointment::{self, AppointmentStatus};
use models::billing::{self, PaymentStatus};
use models::{customer, service};

use crate::errors::ServiceError;

/// Customer details as submitted; `phone` is the dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl NewCustomer {
    pub fn validate(&self) -> Result<(), ServiceError> {
        customer::validate_name(&self.name)?;
        customer::validate_phone(&self.phone)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewService {
    pub name: String,
    pub price: f64,
}

impl NewService {
    pub fn validate(&self) -> Result<(), ServiceError> {
        service::validate_name(&self.name)?;
        service::validate_price(self.price)?;
        Ok(())
    }
}

/// Booking request: customer details plus the requested slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingInput {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub service_id: i32,
    pub date: String,
    pub time: String,
}

impl BookingInput {
    pub fn customer(&self) -> NewCustomer {
        NewCustomer { name: self.name.clone(), phone: self.phone.clone(), email: self.email.clone() }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        self.customer().validate()?;
        appointment::validate_slot(&self.date, &self.time)?;
        Ok(())
    }
}

/// Partial update carried by `PUT /api/appointments/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

/// Direct billing request. Amount defaults to the service price and the issue
/// date to today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingInput {
    pub appointment_id: i32,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub issued_date: Option<NaiveDate>,
}

/// Result of an idempotent create: the record, and whether this call made it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub created: bool,
}

impl<T> Resolved<T> {
    pub fn created(value: T) -> Self { Self { value, created: true } }
    pub fn existing(value: T) -> Self { Self { value, created: false } }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved { value: f(self.value), created: self.created }
    }
}

/// Appointment with its customer, service and (once issued) bill.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetail {
    #[serde(flatten)]
    pub appointment: appointment::Model,
    pub customer: customer::Model,
    pub service: service::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<billing::Model>,
}

impl AppointmentDetail {
    pub fn id(&self) -> i32 { self.appointment.id }
    pub fn status(&self) -> AppointmentStatus { self.appointment.status }
}

/// Bill with the appointment it settles.
#[derive(Debug, Clone, Serialize)]
pub struct BillingDetail {
    #[serde(flatten)]
    pub billing: billing::Model,
    pub appointment: AppointmentDetail,
}

/// Outcome of moving an appointment to a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub previous: AppointmentStatus,
    pub next: AppointmentStatus,
    /// A bill has to be derived as part of this change.
    pub derive_billing: bool,
}

/// Apply `next` unconditionally; completion without a bill requires one.
pub fn apply_status(appt: &mut appointment::Model, next: AppointmentStatus, has_billing: bool) -> StatusChange {
    let previous = appt.status;
    appt.status = next;
    StatusChange { previous, next, derive_billing: next == AppointmentStatus::Completed && !has_billing }
}

pub fn parse_status(raw: &str) -> Result<AppointmentStatus, ServiceError> {
    raw.parse::<AppointmentStatus>()
        .map_err(|_| ServiceError::InvalidStatus(format!("`{raw}` is not one of Pending, Approved, Completed, Cancelled")))
}

/// Mark a bill paid as of `today`. Repeating it only moves the paid date.
pub fn settle(bill: &mut billing::Model, today: NaiveDate) {
    bill.payment_status = PaymentStatus::Paid;
    bill.paid_date = Some(today);
}
