//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_customer;
mod m20240601_000002_create_service;
mod m20240601_000003_create_appointment;
mod m20240601_000004_create_billing;
mod m20240601_000010_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_customer::Migration),
            Box::new(m20240601_000002_create_service::Migration),
            Box::new(m20240601_000003_create_appointment::Migration),
            Box::new(m20240601_000004_create_billing::Migration),
            // Indexes should always be applied last
            Box::new(m20240601_000010_add_indexes::Migration),
        ]
    }
}
