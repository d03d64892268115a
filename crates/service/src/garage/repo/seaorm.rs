use sea_orm::{
    ActiveModelTrait, ActiveValue::{NotSet, Set, Unchanged}, ColumnTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::debug;

use models::{appointment, billing, customer, service};

use crate::errors::ServiceError;
use crate::garage::repository::{
    GarageRepository, GarageTx, NewAppointmentRow, NewBillingRow, NewCustomerRow, NewServiceRow,
};

/// SeaORM-backed gateway; one database transaction per unit of work.
#[derive(Clone)]
pub struct SeaOrmGarageRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmGarageRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

#[async_trait::async_trait]
impl GarageRepository for SeaOrmGarageRepository {
    async fn begin(&self) -> Result<Box<dyn GarageTx>, ServiceError> {
        let txn = self.db.begin().await?;
        Ok(Box::new(SeaOrmGarageTx { txn: Some(txn) }))
    }
}

pub struct SeaOrmGarageTx {
    txn: Option<DatabaseTransaction>,
}

impl SeaOrmGarageTx {
    fn conn(&self) -> Result<&DatabaseTransaction, ServiceError> {
        self.txn.as_ref().ok_or_else(|| ServiceError::Db("transaction already finished".into()))
    }
}

#[async_trait::async_trait]
impl GarageTx for SeaOrmGarageTx {
    async fn find_customer_by_phone(&mut self, phone: &str) -> Result<Option<customer::Model>, ServiceError> {
        let found = customer::Entity::find()
            .filter(customer::Column::Phone.eq(phone))
            .one(self.conn()?)
            .await?;
        Ok(found)
    }

    async fn find_customer_by_id(&mut self, id: i32) -> Result<Option<customer::Model>, ServiceError> {
        Ok(customer::Entity::find_by_id(id).one(self.conn()?).await?)
    }

    async fn insert_customer(&mut self, row: NewCustomerRow) -> Result<customer::Model, ServiceError> {
        let am = customer::ActiveModel {
            id: NotSet,
            name: Set(row.name),
            phone: Set(row.phone),
            email: Set(row.email),
        };
        Ok(am.insert(self.conn()?).await?)
    }

    async fn list_customers(&mut self) -> Result<Vec<customer::Model>, ServiceError> {
        Ok(customer::Entity::find().order_by_asc(customer::Column::Id).all(self.conn()?).await?)
    }

    async fn find_service_by_id(&mut self, id: i32) -> Result<Option<service::Model>, ServiceError> {
        Ok(service::Entity::find_by_id(id).one(self.conn()?).await?)
    }

    async fn insert_service(&mut self, row: NewServiceRow) -> Result<service::Model, ServiceError> {
        let am = service::ActiveModel { id: NotSet, name: Set(row.name), price: Set(row.price) };
        Ok(am.insert(self.conn()?).await?)
    }

    async fn list_services(&mut self) -> Result<Vec<service::Model>, ServiceError> {
        Ok(service::Entity::find().order_by_asc(service::Column::Id).all(self.conn()?).await?)
    }

    async fn find_appointment_by_id(&mut self, id: i32) -> Result<Option<appointment::Model>, ServiceError> {
        Ok(appointment::Entity::find_by_id(id).one(self.conn()?).await?)
    }

    async fn insert_appointment(&mut self, row: NewAppointmentRow) -> Result<appointment::Model, ServiceError> {
        let am = appointment::ActiveModel {
            id: NotSet,
            customer_id: Set(row.customer_id),
            service_id: Set(row.service_id),
            date: Set(row.date),
            time: Set(row.time),
            status: Set(row.status),
            created_at: Set(row.created_at),
        };
        Ok(am.insert(self.conn()?).await?)
    }

    async fn update_appointment(&mut self, model: appointment::Model) -> Result<appointment::Model, ServiceError> {
        let am = appointment::ActiveModel {
            id: Unchanged(model.id),
            customer_id: Set(model.customer_id),
            service_id: Set(model.service_id),
            date: Set(model.date),
            time: Set(model.time),
            status: Set(model.status),
            created_at: Unchanged(model.created_at),
        };
        Ok(am.update(self.conn()?).await?)
    }

    async fn list_appointments(&mut self) -> Result<Vec<appointment::Model>, ServiceError> {
        Ok(appointment::Entity::find().order_by_asc(appointment::Column::Id).all(self.conn()?).await?)
    }

    async fn find_billing_by_id(&mut self, id: i32) -> Result<Option<billing::Model>, ServiceError> {
        Ok(billing::Entity::find_by_id(id).one(self.conn()?).await?)
    }

    async fn find_billing_by_appointment_id(&mut self, appointment_id: i32) -> Result<Option<billing::Model>, ServiceError> {
        let found = billing::Entity::find()
            .filter(billing::Column::AppointmentId.eq(appointment_id))
            .one(self.conn()?)
            .await?;
        Ok(found)
    }

    async fn insert_billing(&mut self, row: NewBillingRow) -> Result<billing::Model, ServiceError> {
        let am = billing::ActiveModel {
            id: NotSet,
            appointment_id: Set(row.appointment_id),
            amount: Set(row.amount),
            payment_status: Set(row.payment_status),
            issued_date: Set(row.issued_date),
            paid_date: Set(row.paid_date),
        };
        Ok(am.insert(self.conn()?).await?)
    }

    async fn update_billing(&mut self, model: billing::Model) -> Result<billing::Model, ServiceError> {
        let am = billing::ActiveModel {
            id: Unchanged(model.id),
            appointment_id: Unchanged(model.appointment_id),
            amount: Set(model.amount),
            payment_status: Set(model.payment_status),
            issued_date: Set(model.issued_date),
            paid_date: Set(model.paid_date),
        };
        Ok(am.update(self.conn()?).await?)
    }

    async fn list_billing(&mut self) -> Result<Vec<billing::Model>, ServiceError> {
        Ok(billing::Entity::find().order_by_asc(billing::Column::Id).all(self.conn()?).await?)
    }

    async fn commit(&mut self) -> Result<(), ServiceError> {
        let txn = self.txn.take().ok_or_else(|| ServiceError::Db("transaction already finished".into()))?;
        txn.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), ServiceError> {
        if let Some(txn) = self.txn.take() {
            txn.rollback().await?;
            debug!("garage unit of work rolled back");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use models::appointment::AppointmentStatus;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() -> anyhow::Result<()> {
        let repo = SeaOrmGarageRepository::new(get_db().await?);
        {
            let mut tx = repo.begin().await?;
            tx.insert_customer(NewCustomerRow { name: "Peter".into(), phone: "+254734567890".into(), email: None }).await?;
            // dropped without commit
        }
        let mut tx = repo.begin().await?;
        assert!(tx.find_customer_by_phone("+254734567890").await?.is_none());
        tx.rollback().await?;
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_phone_is_a_conflict() -> anyhow::Result<()> {
        let repo = SeaOrmGarageRepository::new(get_db().await?);
        let mut tx = repo.begin().await?;
        let row = NewCustomerRow { name: "Sarah".into(), phone: "+254745678901".into(), email: None };
        tx.insert_customer(row.clone()).await?;
        let err = tx.insert_customer(row).await.expect_err("duplicate phone");
        assert!(matches!(err, ServiceError::Conflict(_)), "got {err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn appointment_and_billing_updates_persist() -> anyhow::Result<()> {
        let repo = SeaOrmGarageRepository::new(get_db().await?);
        let mut tx = repo.begin().await?;
        let c = tx.insert_customer(NewCustomerRow { name: "David".into(), phone: "+254756789012".into(), email: None }).await?;
        let s = tx.insert_service(NewServiceRow { name: "Car Wash".into(), price: 500.0 }).await?;
        let mut a = tx
            .insert_appointment(NewAppointmentRow {
                customer_id: c.id,
                service_id: s.id,
                date: "2024-06-02".into(),
                time: "10:00 AM".into(),
                status: AppointmentStatus::Pending,
                created_at: Utc::now().into(),
            })
            .await?;
        a.status = AppointmentStatus::Approved;
        a.time = "11:00 AM".into();
        tx.update_appointment(a.clone()).await?;

        let issued = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        let mut bill = tx.insert_billing(NewBillingRow::unpaid(a.id, s.price, issued)).await?;
        bill.payment_status = models::billing::PaymentStatus::Paid;
        bill.paid_date = Some(issued);
        tx.update_billing(bill).await?;
        tx.commit().await?;

        let mut tx = repo.begin().await?;
        let stored = tx.find_appointment_by_id(a.id).await?.expect("appointment");
        assert_eq!(stored.status, AppointmentStatus::Approved);
        assert_eq!(stored.time, "11:00 AM");
        let stored_bill = tx.find_billing_by_appointment_id(a.id).await?.expect("bill");
        assert!(stored_bill.is_paid());
        assert_eq!(tx.list_billing().await?.len(), 1);
        tx.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn updating_missing_appointment_is_not_found() -> anyhow::Result<()> {
        let repo = SeaOrmGarageRepository::new(get_db().await?);
        let mut tx = repo.begin().await?;
        let ghost = appointment::Model {
            id: 999,
            customer_id: 1,
            service_id: 1,
            date: "2024-06-01".into(),
            time: "09:00 AM".into(),
            status: AppointmentStatus::Pending,
            created_at: Utc::now().into(),
        };
        let err = tx.update_appointment(ghost).await.expect_err("no such row");
        assert!(matches!(err, ServiceError::NotFound(_)), "got {err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn finished_transaction_rejects_further_use() -> anyhow::Result<()> {
        let repo = SeaOrmGarageRepository::new(get_db().await?);
        let mut tx = repo.begin().await?;
        tx.commit().await?;
        assert!(matches!(tx.list_customers().await, Err(ServiceError::Db(_))));
        assert!(tx.commit().await.is_err());
        Ok(())
    }
}
