//! Resets the schema and loads sample customers and services.
use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tracing::info;

use configs::AppConfig;
use service::garage::repo::SeaOrmGarageRepository;
use service::garage::{GarageService, NewCustomer, NewService};

const CUSTOMERS: [(&str, &str, &str); 5] = [
    ("John Kamau", "+254712345678", "john@example.com"),
    ("Mary Wanjiku", "+254723456789", "mary@example.com"),
    ("Peter Ochieng", "+254734567890", "peter@example.com"),
    ("Sarah Mwende", "+254745678901", "sarah@example.com"),
    ("David Njoroge", "+254756789012", "david@example.com"),
];

const SERVICES: [(&str, f64); 8] = [
    ("Oil Change", 1500.0),
    ("Brake Pad Replacement", 4000.0),
    ("Engine Tune-up", 3000.0),
    ("Tire Rotation", 1000.0),
    ("Wheel Alignment", 2500.0),
    ("Battery Replacement", 8000.0),
    ("AC Service", 3500.0),
    ("Car Wash", 500.0),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    common::utils::logging::init_logging_default();
    let cfg = AppConfig::load_or_env().context("load configuration")?;

    let db = models::db::connect_with_config(&models::db::DatabaseConfig::from(&cfg.database)).await?;
    // 清空并重建 schema
    migration::Migrator::fresh(&db).await.context("reset schema")?;
    info!(event = "schema_reset", "seeding database with sample data");

    let garage = GarageService::new(Arc::new(SeaOrmGarageRepository::new(db)));
    for (name, phone, email) in CUSTOMERS {
        garage
            .resolve_or_create_customer(NewCustomer { name: name.into(), phone: phone.into(), email: Some(email.into()) })
            .await?;
    }
    for (name, price) in SERVICES {
        garage.create_service(NewService { name: name.into(), price }).await?;
    }

    info!(customers = CUSTOMERS.len(), services = SERVICES.len(), "sample data added");
    Ok(())
}
