//! In-memory gateway used by tests and doc examples.
//!
//! A unit of work holds the store lock and edits a private copy of the
//! committed state; `commit` swaps the copy in. Uniqueness of customer phone
//! and of billing-per-appointment is enforced like the SQL schema does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use models::{appointment, billing, customer, service};

use crate::errors::ServiceError;
use crate::garage::repository::{
    GarageRepository, GarageTx, NewAppointmentRow, NewBillingRow, NewCustomerRow, NewServiceRow,
};

#[derive(Clone, Debug, Default)]
struct MemoryState {
    customers: Vec<customer::Model>,
    services: Vec<service::Model>,
    appointments: Vec<appointment::Model>,
    billing: Vec<billing::Model>,
    seq: Sequences,
}

#[derive(Clone, Copy, Debug, Default)]
struct Sequences {
    customer: i32,
    service: i32,
    appointment: i32,
    billing: i32,
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Faults {
    fail_next_billing_insert: AtomicBool,
    /// Customer committed by a "concurrent" writer right before our insert.
    phone_race: StdMutex<Option<NewCustomerRow>>,
    /// Bill committed by a "concurrent" completion right before our insert.
    billing_race: StdMutex<Option<NewBillingRow>>,
}

#[derive(Clone, Default)]
pub struct MemoryGarageRepository {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

impl MemoryGarageRepository {
    pub fn new() -> Self { Self::default() }

    /// Make the next `insert_billing` fail with a database error.
    pub fn fail_next_billing_insert(&self) {
        self.faults.fail_next_billing_insert.store(true, Ordering::SeqCst);
    }

    /// Simulate another request committing `racer` between our phone lookup
    /// and our insert: the next insert for that phone reports a conflict.
    pub fn race_next_customer_insert(&self, racer: NewCustomerRow) {
        if let Ok(mut slot) = self.faults.phone_race.lock() {
            *slot = Some(racer);
        }
    }

    /// Simulate another request billing the same appointment between our
    /// lookup and our insert: the next insert for it reports a conflict.
    pub fn race_next_billing_insert(&self, racer: NewBillingRow) {
        if let Ok(mut slot) = self.faults.billing_race.lock() {
            *slot = Some(racer);
        }
    }

    pub async fn customer_count(&self) -> usize { self.state.lock().await.customers.len() }
    pub async fn appointment_count(&self) -> usize { self.state.lock().await.appointments.len() }
    pub async fn billing_count(&self) -> usize { self.state.lock().await.billing.len() }
}

#[async_trait]
impl GarageRepository for MemoryGarageRepository {
    async fn begin(&self) -> Result<Box<dyn GarageTx>, ServiceError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryGarageTx { guard: Some(guard), work, faults: Arc::clone(&self.faults) }))
    }
}

pub struct MemoryGarageTx {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    work: MemoryState,
    faults: Arc<Faults>,
}

impl MemoryGarageTx {
    fn state(&mut self) -> Result<&mut MemoryState, ServiceError> {
        if self.guard.is_none() {
            return Err(ServiceError::Db("transaction already finished".into()));
        }
        Ok(&mut self.work)
    }

    fn take_race(&self, phone: &str) -> Option<NewCustomerRow> {
        let mut slot = self.faults.phone_race.lock().ok()?;
        if slot.as_ref().is_some_and(|r| r.phone == phone) { slot.take() } else { None }
    }

    fn take_billing_race(&self, appointment_id: i32) -> Option<NewBillingRow> {
        let mut slot = self.faults.billing_race.lock().ok()?;
        if slot.as_ref().is_some_and(|r| r.appointment_id == appointment_id) { slot.take() } else { None }
    }
}

#[async_trait]
impl GarageTx for MemoryGarageTx {
    async fn find_customer_by_phone(&mut self, phone: &str) -> Result<Option<customer::Model>, ServiceError> {
        Ok(self.state()?.customers.iter().find(|c| c.phone == phone).cloned())
    }

    async fn find_customer_by_id(&mut self, id: i32) -> Result<Option<customer::Model>, ServiceError> {
        Ok(self.state()?.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_customer(&mut self, row: NewCustomerRow) -> Result<customer::Model, ServiceError> {
        if let Some(racer) = self.take_race(&row.phone) {
            // the competing writer commits straight into the shared state
            if let Some(committed) = self.guard.as_mut() {
                let id = next(&mut committed.seq.customer);
                committed.customers.push(customer::Model { id, name: racer.name, phone: racer.phone, email: racer.email });
            }
            return Err(ServiceError::Conflict(format!("phone {} already registered", row.phone)));
        }
        let st = self.state()?;
        if st.customers.iter().any(|c| c.phone == row.phone) {
            return Err(ServiceError::Conflict(format!("phone {} already registered", row.phone)));
        }
        let model = customer::Model { id: next(&mut st.seq.customer), name: row.name, phone: row.phone, email: row.email };
        st.customers.push(model.clone());
        Ok(model)
    }

    async fn list_customers(&mut self) -> Result<Vec<customer::Model>, ServiceError> {
        Ok(self.state()?.customers.clone())
    }

    async fn find_service_by_id(&mut self, id: i32) -> Result<Option<service::Model>, ServiceError> {
        Ok(self.state()?.services.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_service(&mut self, row: NewServiceRow) -> Result<service::Model, ServiceError> {
        let st = self.state()?;
        let model = service::Model { id: next(&mut st.seq.service), name: row.name, price: row.price };
        st.services.push(model.clone());
        Ok(model)
    }

    async fn list_services(&mut self) -> Result<Vec<service::Model>, ServiceError> {
        Ok(self.state()?.services.clone())
    }

    async fn find_appointment_by_id(&mut self, id: i32) -> Result<Option<appointment::Model>, ServiceError> {
        Ok(self.state()?.appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn insert_appointment(&mut self, row: NewAppointmentRow) -> Result<appointment::Model, ServiceError> {
        let st = self.state()?;
        if !st.customers.iter().any(|c| c.id == row.customer_id) || !st.services.iter().any(|s| s.id == row.service_id) {
            return Err(ServiceError::Validation("appointment references a missing customer or service".into()));
        }
        let model = appointment::Model {
            id: next(&mut st.seq.appointment),
            customer_id: row.customer_id,
            service_id: row.service_id,
            date: row.date,
            time: row.time,
            status: row.status,
            created_at: row.created_at,
        };
        st.appointments.push(model.clone());
        Ok(model)
    }

    async fn update_appointment(&mut self, model: appointment::Model) -> Result<appointment::Model, ServiceError> {
        let st = self.state()?;
        let slot = st
            .appointments
            .iter_mut()
            .find(|a| a.id == model.id)
            .ok_or_else(|| ServiceError::not_found("appointment"))?;
        *slot = appointment::Model { created_at: slot.created_at, ..model };
        Ok(slot.clone())
    }

    async fn list_appointments(&mut self) -> Result<Vec<appointment::Model>, ServiceError> {
        Ok(self.state()?.appointments.clone())
    }

    async fn find_billing_by_id(&mut self, id: i32) -> Result<Option<billing::Model>, ServiceError> {
        Ok(self.state()?.billing.iter().find(|b| b.id == id).cloned())
    }

    async fn find_billing_by_appointment_id(&mut self, appointment_id: i32) -> Result<Option<billing::Model>, ServiceError> {
        Ok(self.state()?.billing.iter().find(|b| b.appointment_id == appointment_id).cloned())
    }

    async fn insert_billing(&mut self, row: NewBillingRow) -> Result<billing::Model, ServiceError> {
        if self.faults.fail_next_billing_insert.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::Db("injected billing insert failure".into()));
        }
        if let Some(racer) = self.take_billing_race(row.appointment_id) {
            if let Some(committed) = self.guard.as_mut() {
                let id = next(&mut committed.seq.billing);
                committed.billing.push(billing::Model {
                    id,
                    appointment_id: racer.appointment_id,
                    amount: racer.amount,
                    payment_status: racer.payment_status,
                    issued_date: racer.issued_date,
                    paid_date: racer.paid_date,
                });
            }
            return Err(ServiceError::Conflict(format!("appointment {} already billed", row.appointment_id)));
        }
        let st = self.state()?;
        if st.billing.iter().any(|b| b.appointment_id == row.appointment_id) {
            return Err(ServiceError::Conflict(format!("appointment {} already billed", row.appointment_id)));
        }
        if !st.appointments.iter().any(|a| a.id == row.appointment_id) {
            return Err(ServiceError::Validation(format!("appointment {} does not exist", row.appointment_id)));
        }
        let model = billing::Model {
            id: next(&mut st.seq.billing),
            appointment_id: row.appointment_id,
            amount: row.amount,
            payment_status: row.payment_status,
            issued_date: row.issued_date,
            paid_date: row.paid_date,
        };
        st.billing.push(model.clone());
        Ok(model)
    }

    async fn update_billing(&mut self, model: billing::Model) -> Result<billing::Model, ServiceError> {
        let st = self.state()?;
        let slot = st
            .billing
            .iter_mut()
            .find(|b| b.id == model.id)
            .ok_or_else(|| ServiceError::not_found("billing"))?;
        *slot = billing::Model { appointment_id: slot.appointment_id, ..model };
        Ok(slot.clone())
    }

    async fn list_billing(&mut self) -> Result<Vec<billing::Model>, ServiceError> {
        Ok(self.state()?.billing.clone())
    }

    async fn commit(&mut self) -> Result<(), ServiceError> {
        let mut guard = self.guard.take().ok_or_else(|| ServiceError::Db("transaction already finished".into()))?;
        *guard = std::mem::take(&mut self.work);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), ServiceError> {
        self.guard.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commit_publishes_and_drop_discards() -> Result<(), ServiceError> {
        let repo = MemoryGarageRepository::new();
        let mut tx = repo.begin().await?;
        tx.insert_service(NewServiceRow { name: "Tire Rotation".into(), price: 1000.0 }).await?;
        tx.commit().await?;

        {
            let mut tx = repo.begin().await?;
            tx.insert_service(NewServiceRow { name: "AC Service".into(), price: 3500.0 }).await?;
        }

        let mut tx = repo.begin().await?;
        let services = tx.list_services().await?;
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "Tire Rotation");
        Ok(())
    }

    #[tokio::test]
    async fn phone_is_unique() -> Result<(), ServiceError> {
        let repo = MemoryGarageRepository::new();
        let mut tx = repo.begin().await?;
        let row = NewCustomerRow { name: "Mary".into(), phone: "+254723456789".into(), email: None };
        tx.insert_customer(row.clone()).await?;
        assert!(matches!(tx.insert_customer(row).await, Err(ServiceError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn raced_insert_lands_in_committed_state() -> Result<(), ServiceError> {
        let repo = MemoryGarageRepository::new();
        repo.race_next_customer_insert(NewCustomerRow { name: "Racer".into(), phone: "+1".into(), email: None });
        {
            let mut tx = repo.begin().await?;
            let res = tx.insert_customer(NewCustomerRow { name: "Loser".into(), phone: "+1".into(), email: None }).await;
            assert!(matches!(res, Err(ServiceError::Conflict(_))));
        }
        let mut tx = repo.begin().await?;
        let found = tx.find_customer_by_phone("+1").await?.expect("racer committed");
        assert_eq!(found.name, "Racer");
        Ok(())
    }
}
