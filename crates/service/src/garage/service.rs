use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use models::appointment::{self, AppointmentStatus};
use models::{billing, customer, service};

use super::billing::derive_in;
use super::customers::resolve_in;
use super::domain::{apply_status, parse_status, AppointmentDetail, AppointmentUpdate, BookingInput};
use super::repository::{GarageRepository, GarageTx, NewAppointmentRow};
use crate::errors::ServiceError;

/// Garage business service independent of web framework and storage.
///
/// Owns the appointment state machine, the billing derivation rule and the
/// customer de-duplication rule. Storage is injected as a [`GarageRepository`].
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use service::garage::{GarageService, BookingInput, NewService, repo::MemoryGarageRepository};
///
/// let svc = GarageService::new(Arc::new(MemoryGarageRepository::new()));
/// let oil = tokio_test::block_on(svc.create_service(NewService { name: "Oil Change".into(), price: 1500.0 })).unwrap();
/// let booked = tokio_test::block_on(svc.book(BookingInput {
///     name: "Alice".into(),
///     phone: "+254700000001".into(),
///     email: None,
///     service_id: oil.id,
///     date: "2024-06-01".into(),
///     time: "09:00 AM".into(),
/// })).unwrap();
/// assert_eq!(booked.status().as_str(), "Pending");
///
/// let done = tokio_test::block_on(svc.update_status(booked.id(), "Completed")).unwrap();
/// assert_eq!(done.billing.unwrap().amount, 1500.0);
/// ```
pub struct GarageService<R: GarageRepository + ?Sized> {
    pub(super) repo: Arc<R>,
    pub(super) clock: fn() -> DateTime<Utc>,
}

impl<R: GarageRepository + ?Sized> GarageService<R> {
    pub fn new(repo: Arc<R>) -> Self { Self { repo, clock: Utc::now } }

    /// Replace the wall clock used for creation timestamps and bill dates.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub(super) fn now(&self) -> DateTime<Utc> { (self.clock)() }

    pub(super) fn today(&self) -> NaiveDate { self.now().date_naive() }

    /// Book an appointment, creating the customer on first contact.
    #[instrument(skip(self, input), fields(phone = %input.phone, service_id = input.service_id))]
    pub async fn book(&self, input: BookingInput) -> Result<AppointmentDetail, ServiceError> {
        input.validate()?;
        let input = &input;
        retry_on_conflict("book", move || self.try_book(input)).await
    }

    async fn try_book(&self, input: &BookingInput) -> Result<AppointmentDetail, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let service = tx
            .find_service_by_id(input.service_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("service"))?;
        let customer = resolve_in(tx.as_mut(), &input.customer()).await?.value;
        let appointment = tx
            .insert_appointment(NewAppointmentRow {
                customer_id: customer.id,
                service_id: service.id,
                date: input.date.clone(),
                time: input.time.clone(),
                status: AppointmentStatus::Pending,
                created_at: self.now().into(),
            })
            .await?;
        tx.commit().await?;
        info!(appointment_id = appointment.id, customer_id = customer.id, service = %service.name, date = %appointment.date, time = %appointment.time, "appointment_booked");
        Ok(AppointmentDetail { appointment, customer, service, billing: None })
    }

    /// Move an appointment to `status`; completing it issues the bill.
    pub async fn update_status(&self, id: i32, status: &str) -> Result<AppointmentDetail, ServiceError> {
        self.update(id, AppointmentUpdate { status: Some(status.to_string()), ..Default::default() }).await
    }

    /// Change date and/or time. No format or double-booking checks.
    pub async fn reschedule(&self, id: i32, date: Option<String>, time: Option<String>) -> Result<AppointmentDetail, ServiceError> {
        self.update(id, AppointmentUpdate { status: None, date, time }).await
    }

    /// Apply status, date and time changes together in one unit of work.
    #[instrument(skip(self, changes), fields(appointment_id = id, status = ?changes.status))]
    pub async fn update(&self, id: i32, changes: AppointmentUpdate) -> Result<AppointmentDetail, ServiceError> {
        let status = changes.status.as_deref().map(parse_status).transpose()?;
        let changes = &changes;
        retry_on_conflict("update_appointment", move || self.try_update(id, status, changes)).await
    }

    async fn try_update(
        &self,
        id: i32,
        status: Option<AppointmentStatus>,
        changes: &AppointmentUpdate,
    ) -> Result<AppointmentDetail, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let mut appt = tx
            .find_appointment_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("appointment"))?;
        let service = tx
            .find_service_by_id(appt.service_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("service"))?;
        let mut bill = tx.find_billing_by_appointment_id(id).await?;

        if let Some(next) = status {
            let change = apply_status(&mut appt, next, bill.is_some());
            if change.previous != change.next {
                info!(appointment_id = id, from = %change.previous, to = %change.next, "appointment_status_changed");
            }
            if change.derive_billing {
                let derived = derive_in(tx.as_mut(), &appt, &service, None, self.today()).await?;
                bill = Some(derived.value);
            }
        }
        if let Some(date) = &changes.date {
            appt.date = date.clone();
        }
        if let Some(time) = &changes.time {
            appt.time = time.clone();
        }

        let appt = tx.update_appointment(appt).await?;
        let customer = tx
            .find_customer_by_id(appt.customer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("customer"))?;
        tx.commit().await?;
        debug!(appointment_id = id, billed = bill.is_some(), "appointment_updated");
        Ok(AppointmentDetail { appointment: appt, customer, service, billing: bill })
    }

    pub async fn get_appointment(&self, id: i32) -> Result<AppointmentDetail, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let appt = tx
            .find_appointment_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("appointment"))?;
        let detail = detail_in(tx.as_mut(), appt).await?;
        tx.commit().await?;
        Ok(detail)
    }

    /// All appointments in storage order with nested customer, service and bill.
    pub async fn list_appointments(&self) -> Result<Vec<AppointmentDetail>, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let appointments = tx.list_appointments().await?;
        let lookup = Lookup::load(tx.as_mut()).await?;
        tx.commit().await?;
        Ok(appointments.into_iter().filter_map(|a| lookup.detail(a)).collect())
    }
}

/// Load customer, service and bill for one appointment.
pub(super) async fn detail_in(tx: &mut dyn GarageTx, appt: appointment::Model) -> Result<AppointmentDetail, ServiceError> {
    let customer = tx
        .find_customer_by_id(appt.customer_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("customer"))?;
    let service = tx
        .find_service_by_id(appt.service_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))?;
    let billing = tx.find_billing_by_appointment_id(appt.id).await?;
    Ok(AppointmentDetail { appointment: appt, customer, service, billing })
}

/// Id-indexed snapshot of the reference data used to assemble listings.
pub(super) struct Lookup {
    customers: HashMap<i32, customer::Model>,
    services: HashMap<i32, service::Model>,
    billing: HashMap<i32, billing::Model>,
}

impl Lookup {
    pub(super) async fn load(tx: &mut dyn GarageTx) -> Result<Self, ServiceError> {
        let customers = tx.list_customers().await?.into_iter().map(|c| (c.id, c)).collect();
        let services = tx.list_services().await?.into_iter().map(|s| (s.id, s)).collect();
        let billing = tx.list_billing().await?.into_iter().map(|b| (b.appointment_id, b)).collect();
        Ok(Self { customers, services, billing })
    }

    pub(super) fn detail(&self, appt: appointment::Model) -> Option<AppointmentDetail> {
        let (Some(customer), Some(service)) = (self.customers.get(&appt.customer_id), self.services.get(&appt.service_id)) else {
            warn!(appointment_id = appt.id, "appointment references a missing customer or service; skipped");
            return None;
        };
        Some(AppointmentDetail {
            customer: customer.clone(),
            service: service.clone(),
            billing: self.billing.get(&appt.id).cloned(),
            appointment: appt,
        })
    }
}

/// Run `op`; when it loses a uniqueness race, run it once more so the
/// re-read observes the winning row.
pub(super) async fn retry_on_conflict<T, F, Fut>(op: &'static str, mut attempt: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    match attempt().await {
        Err(ServiceError::Conflict(msg)) => {
            warn!(op, conflict = %msg, "unique constraint race; retrying once");
            attempt().await
        }
        other => other,
    }
}
