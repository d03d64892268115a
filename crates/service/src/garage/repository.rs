use async_trait::async_trait;
use chrono::NaiveDate;

use models::appointment::{self, AppointmentStatus};
use models::billing::{self, PaymentStatus};
use models::{customer, service};

use crate::errors::ServiceError;

/// Persistence gateway for the garage domain.
///
/// Every operation of the domain module runs inside one [`GarageTx`]; the
/// read-then-write sequences it performs are atomic because the whole unit of
/// work is.
#[async_trait]
pub trait GarageRepository: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn GarageTx>, ServiceError>;
}

/// A unit of work. Dropping it without `commit` discards every write.
#[async_trait]
pub trait GarageTx: Send {
    async fn find_customer_by_phone(&mut self, phone: &str) -> Result<Option<customer::Model>, ServiceError>;
    async fn find_customer_by_id(&mut self, id: i32) -> Result<Option<customer::Model>, ServiceError>;
    /// Fails with `Conflict` when the phone is already taken.
    async fn insert_customer(&mut self, row: NewCustomerRow) -> Result<customer::Model, ServiceError>;
    async fn list_customers(&mut self) -> Result<Vec<customer::Model>, ServiceError>;

    async fn find_service_by_id(&mut self, id: i32) -> Result<Option<service::Model>, ServiceError>;
    async fn insert_service(&mut self, row: NewServiceRow) -> Result<service::Model, ServiceError>;
    async fn list_services(&mut self) -> Result<Vec<service::Model>, ServiceError>;

    async fn find_appointment_by_id(&mut self, id: i32) -> Result<Option<appointment::Model>, ServiceError>;
    async fn insert_appointment(&mut self, row: NewAppointmentRow) -> Result<appointment::Model, ServiceError>;
    async fn update_appointment(&mut self, model: appointment::Model) -> Result<appointment::Model, ServiceError>;
    async fn list_appointments(&mut self) -> Result<Vec<appointment::Model>, ServiceError>;

    async fn find_billing_by_id(&mut self, id: i32) -> Result<Option<billing::Model>, ServiceError>;
    async fn find_billing_by_appointment_id(&mut self, appointment_id: i32) -> Result<Option<billing::Model>, ServiceError>;
    /// Fails with `Conflict` when the appointment already has a bill.
    async fn insert_billing(&mut self, row: NewBillingRow) -> Result<billing::Model, ServiceError>;
    async fn update_billing(&mut self, model: billing::Model) -> Result<billing::Model, ServiceError>;
    async fn list_billing(&mut self) -> Result<Vec<billing::Model>, ServiceError>;

    async fn commit(&mut self) -> Result<(), ServiceError>;
    async fn rollback(&mut self) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct NewCustomerRow {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewServiceRow {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct NewAppointmentRow {
    pub customer_id: i32,
    pub service_id: i32,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct NewBillingRow {
    pub appointment_id: i32,
    pub amount: f64,
    pub payment_status: PaymentStatus,
    pub issued_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
}

impl NewBillingRow {
    /// A fresh unpaid bill.
    pub fn unpaid(appointment_id: i32, amount: f64, issued_date: NaiveDate) -> Self {
        Self { appointment_id, amount, payment_status: PaymentStatus::Unpaid, issued_date, paid_date: None }
    }
}
