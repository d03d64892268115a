use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Customers: phone is the dedup key
        manager
            .create_index(
                Index::create()
                    .name("uniq_customers_phone")
                    .table(Customers::Table)
                    .col(Customers::Phone)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Billing: at most one bill per appointment
        manager
            .create_index(
                Index::create()
                    .name("uniq_billing_appointment")
                    .table(Billing::Table)
                    .col(Billing::AppointmentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Appointments: FK lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_appointments_customer")
                    .table(Appointments::Table)
                    .col(Appointments::CustomerId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_appointments_service")
                    .table(Appointments::Table)
                    .col(Appointments::ServiceId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uniq_customers_phone").table(Customers::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_billing_appointment").table(Billing::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_appointments_customer").table(Appointments::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_appointments_service").table(Appointments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers { Table, Phone }

#[derive(DeriveIden)]
enum Billing { Table, AppointmentId }

#[derive(DeriveIden)]
enum Appointments { Table, CustomerId, ServiceId }
