use chrono::NaiveDate;
use tracing::{info, instrument};

use models::{appointment, billing, service};

use super::domain::{settle, BillingDetail, BillingInput, Resolved};
use super::repository::{GarageRepository, GarageTx, NewBillingRow};
use super::service::{detail_in, retry_on_conflict, GarageService, Lookup};
use crate::errors::ServiceError;

/// Issue the bill for `appt` unless one exists. The amount is frozen from the
/// service price unless `amount` overrides it.
pub(super) async fn derive_in(
    tx: &mut dyn GarageTx,
    appt: &appointment::Model,
    service: &service::Model,
    amount: Option<f64>,
    issued_date: NaiveDate,
) -> Result<Resolved<billing::Model>, ServiceError> {
    if let Some(existing) = tx.find_billing_by_appointment_id(appt.id).await? {
        return Ok(Resolved::existing(existing));
    }
    let amount = amount.unwrap_or(service.price);
    let bill = tx.insert_billing(NewBillingRow::unpaid(appt.id, amount, issued_date)).await?;
    info!(billing_id = bill.id, appointment_id = appt.id, amount, issued_date = %bill.issued_date, "billing_derived");
    Ok(Resolved::created(bill))
}

impl<R: GarageRepository + ?Sized> GarageService<R> {
    /// Create the bill for an appointment, or return the one it already has.
    #[instrument(skip(self, input), fields(appointment_id = input.appointment_id))]
    pub async fn derive_billing(&self, input: BillingInput) -> Result<Resolved<BillingDetail>, ServiceError> {
        if let Some(amount) = input.amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(ServiceError::Validation("amount must be a non-negative number".into()));
            }
        }
        let input = &input;
        retry_on_conflict("derive_billing", move || self.try_derive_billing(input)).await
    }

    async fn try_derive_billing(&self, input: &BillingInput) -> Result<Resolved<BillingDetail>, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let appt = tx
            .find_appointment_by_id(input.appointment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("appointment"))?;
        let service = tx
            .find_service_by_id(appt.service_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("service"))?;
        let issued = input.issued_date.unwrap_or_else(|| self.today());
        let resolved = derive_in(tx.as_mut(), &appt, &service, input.amount, issued).await?;
        let mut appointment = detail_in(tx.as_mut(), appt).await?;
        appointment.billing = None;
        tx.commit().await?;
        Ok(resolved.map(|billing| BillingDetail { billing, appointment }))
    }

    /// Mark a bill paid today. Paying twice just moves the paid date.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, id: i32) -> Result<BillingDetail, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let mut bill = tx
            .find_billing_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("billing"))?;
        let was_paid = bill.is_paid();
        settle(&mut bill, self.today());
        let bill = tx.update_billing(bill).await?;
        let appt = tx
            .find_appointment_by_id(bill.appointment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("appointment"))?;
        let mut appointment = detail_in(tx.as_mut(), appt).await?;
        appointment.billing = None;
        tx.commit().await?;
        info!(billing_id = bill.id, appointment_id = bill.appointment_id, was_paid, paid_date = ?bill.paid_date, "billing_paid");
        Ok(BillingDetail { billing: bill, appointment })
    }

    /// Every bill with its appointment, in storage order.
    pub async fn list_billing(&self) -> Result<Vec<BillingDetail>, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let bills = tx.list_billing().await?;
        let appointments = tx.list_appointments().await?;
        let lookup = Lookup::load(tx.as_mut()).await?;
        tx.commit().await?;

        let by_id: std::collections::HashMap<i32, appointment::Model> = appointments.into_iter().map(|a| (a.id, a)).collect();
        Ok(bills
            .into_iter()
            .filter_map(|billing| {
                let appt = by_id.get(&billing.appointment_id)?.clone();
                let mut appointment = lookup.detail(appt)?;
                appointment.billing = None;
                Some(BillingDetail { billing, appointment })
            })
            .collect())
    }
}
