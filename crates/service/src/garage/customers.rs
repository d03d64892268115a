use tracing::{info, instrument};

use models::{customer, service};

use super::domain::{NewCustomer, NewService, Resolved};
use super::repository::{GarageRepository, GarageTx, NewCustomerRow, NewServiceRow};
use super::service::{retry_on_conflict, GarageService};
use crate::errors::ServiceError;

/// First write wins: an existing phone returns the stored customer untouched.
pub(super) async fn resolve_in(tx: &mut dyn GarageTx, input: &NewCustomer) -> Result<Resolved<customer::Model>, ServiceError> {
    let phone = input.phone.trim();
    if let Some(existing) = tx.find_customer_by_phone(phone).await? {
        return Ok(Resolved::existing(existing));
    }
    let email = customer::normalize_email(input.email.as_deref())?;
    let created = tx
        .insert_customer(NewCustomerRow { name: input.name.trim().to_string(), phone: phone.to_string(), email })
        .await?;
    info!(customer_id = created.id, phone = %created.phone, "customer_created");
    Ok(Resolved::created(created))
}

impl<R: GarageRepository + ?Sized> GarageService<R> {
    /// Return the customer registered under `input.phone`, creating it if new.
    #[instrument(skip(self, input), fields(phone = %input.phone))]
    pub async fn resolve_or_create_customer(&self, input: NewCustomer) -> Result<Resolved<customer::Model>, ServiceError> {
        input.validate()?;
        let input = &input;
        retry_on_conflict("resolve_customer", move || async move {
            let mut tx = self.repo.begin().await?;
            let resolved = resolve_in(tx.as_mut(), input).await?;
            tx.commit().await?;
            Ok(resolved)
        })
        .await
    }

    pub async fn list_customers(&self) -> Result<Vec<customer::Model>, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let customers = tx.list_customers().await?;
        tx.commit().await?;
        Ok(customers)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_service(&self, input: NewService) -> Result<service::Model, ServiceError> {
        input.validate()?;
        let mut tx = self.repo.begin().await?;
        let created = tx
            .insert_service(NewServiceRow { name: input.name.trim().to_string(), price: input.price })
            .await?;
        tx.commit().await?;
        info!(service_id = created.id, price = created.price, "service_created");
        Ok(created)
    }

    pub async fn list_services(&self) -> Result<Vec<service::Model>, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let services = tx.list_services().await?;
        tx.commit().await?;
        Ok(services)
    }
}
