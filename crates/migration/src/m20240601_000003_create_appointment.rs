//! Create `appointments` table with FKs to `customers` and `services`.
//!
//! `date` and `time` are stored as the free-form strings the booking form sends.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Appointments::Table)
                    .if_not_exists()
                    .col(pk_auto(Appointments::Id))
                    .col(integer(Appointments::CustomerId))
                    .col(integer(Appointments::ServiceId))
                    .col(string_len(Appointments::Date, 10))
                    .col(string_len(Appointments::Time, 8))
                    .col(string_len(Appointments::Status, 20).default("Pending"))
                    .col(timestamp_with_time_zone(Appointments::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointment_customer")
                            .from(Appointments::Table, Appointments::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointment_service")
                            .from(Appointments::Table, Appointments::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Appointments::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Appointments { Table, Id, CustomerId, ServiceId, Date, Time, Status, CreatedAt }

#[derive(DeriveIden)]
enum Customers { Table, Id }

#[derive(DeriveIden)]
enum Services { Table, Id }
