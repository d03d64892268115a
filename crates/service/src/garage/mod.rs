//! Garage domain module: three layers (domain, repository, service).
//!
//! `GarageService` owns the business rules and talks to storage only through
//! [`repository::GarageRepository`], one unit of work per operation.

pub mod domain;
pub mod repository;
pub mod repo;
pub mod service;
mod billing;
mod customers;

pub use domain::{AppointmentDetail, AppointmentUpdate, BillingDetail, BillingInput, BookingInput, NewCustomer, NewService, Resolved};
pub use repository::{GarageRepository, GarageTx};
pub use service::GarageService;
