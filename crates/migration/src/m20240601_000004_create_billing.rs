//! Create `billing` table, owned by its appointment (cascade on delete).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Billing::Table)
                    .if_not_exists()
                    .col(pk_auto(Billing::Id))
                    .col(integer(Billing::AppointmentId))
                    .col(double(Billing::Amount))
                    .col(string_len(Billing::PaymentStatus, 20).default("Unpaid"))
                    .col(date(Billing::IssuedDate))
                    .col(date_null(Billing::PaidDate))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_billing_appointment")
                            .from(Billing::Table, Billing::AppointmentId)
                            .to(Appointments::Table, Appointments::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Billing::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Billing { Table, Id, AppointmentId, Amount, PaymentStatus, IssuedDate, PaidDate }

#[derive(DeriveIden)]
enum Appointments { Table, Id }
