use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use migration::MigratorTrait;
use models::appointment::AppointmentStatus;
use models::billing::PaymentStatus;
use models::db::{connect_with_config, DatabaseConfig};
use service::errors::{ErrorKind, ServiceError};
use service::garage::repo::{MemoryGarageRepository, SeaOrmGarageRepository};
use service::garage::repository::{NewBillingRow, NewCustomerRow};
use service::garage::{
    AppointmentUpdate, BillingInput, BookingInput, GarageRepository, GarageService, NewCustomer, NewService,
};

fn fixed_now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap() }

fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() }

fn memory() -> (MemoryGarageRepository, GarageService<MemoryGarageRepository>) {
    let repo = MemoryGarageRepository::new();
    let svc = GarageService::new(Arc::new(repo.clone())).with_clock(fixed_now);
    (repo, svc)
}

fn alice(service_id: i32) -> BookingInput {
    BookingInput {
        name: "Alice".into(),
        phone: "+254700000001".into(),
        email: Some("alice@example.com".into()),
        service_id,
        date: "2024-06-01".into(),
        time: "09:00 AM".into(),
    }
}

async fn oil_change<R: GarageRepository + ?Sized>(svc: &GarageService<R>) -> Result<i32> {
    Ok(svc.create_service(NewService { name: "Oil Change".into(), price: 1500.0 }).await?.id)
}

#[tokio::test]
async fn first_write_wins_on_phone() -> Result<()> {
    let (repo, svc) = memory();
    let first = svc
        .resolve_or_create_customer(NewCustomer { name: "Alice".into(), phone: "+254700000001".into(), email: Some("a@x.io".into()) })
        .await?;
    let second = svc
        .resolve_or_create_customer(NewCustomer { name: "Alice Smith".into(), phone: "+254700000001".into(), email: Some("b@x.io".into()) })
        .await?;

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.value.id, second.value.id);
    assert_eq!(second.value.name, "Alice");
    assert_eq!(second.value.email.as_deref(), Some("a@x.io"));
    assert_eq!(repo.customer_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn blank_email_is_stored_as_none() -> Result<()> {
    let (_, svc) = memory();
    let c = svc
        .resolve_or_create_customer(NewCustomer { name: "Bob".into(), phone: "+254700000002".into(), email: Some("  ".into()) })
        .await?;
    assert_eq!(c.value.email, None);
    Ok(())
}

#[tokio::test]
async fn booking_flow_end_to_end() -> Result<()> {
    let (repo, svc) = memory();
    let oil = oil_change(&svc).await?;

    let booked = svc.book(alice(oil)).await?;
    assert_eq!(booked.status(), AppointmentStatus::Pending);
    assert_eq!(booked.customer.name, "Alice");
    assert_eq!(booked.service.name, "Oil Change");
    assert_eq!(booked.service.price, 1500.0);
    assert!(booked.billing.is_none());
    assert_eq!(booked.appointment.created_at, fixed_now());

    let done = svc.update_status(booked.id(), "Completed").await?;
    assert_eq!(done.status(), AppointmentStatus::Completed);
    let bill = done.billing.clone().expect("completion issues a bill");
    assert_eq!(bill.amount, 1500.0);
    assert_eq!(bill.payment_status, PaymentStatus::Unpaid);
    assert_eq!(bill.issued_date, today());

    let paid = svc.mark_paid(bill.id).await?;
    assert_eq!(paid.billing.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.billing.paid_date, Some(today()));
    assert_eq!(paid.appointment.id(), booked.id());

    let again = svc.book(BookingInput { name: "Alice Smith".into(), ..alice(oil) }).await?;
    assert_eq!(again.customer.id, booked.customer.id);
    assert_eq!(again.customer.name, "Alice");
    assert_eq!(repo.customer_count().await, 1);
    assert_eq!(repo.appointment_count().await, 2);
    Ok(())
}

#[tokio::test]
async fn completing_twice_issues_one_bill() -> Result<()> {
    let (repo, svc) = memory();
    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;

    let first = svc.update_status(appt.id(), "Completed").await?.billing.unwrap();
    let second = svc.update_status(appt.id(), "Completed").await?.billing.unwrap();
    assert_eq!(first, second);
    assert_eq!(repo.billing_count().await, 1);

    // Re-completing after a detour through Pending keeps the first bill.
    svc.update_status(appt.id(), "Pending").await?;
    let third = svc.update_status(appt.id(), "Completed").await?.billing.unwrap();
    assert_eq!(third.id, first.id);
    assert_eq!(repo.billing_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn bill_amount_is_frozen_at_derivation() -> Result<()> {
    let (_, svc) = memory();
    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;
    let bill = svc.update_status(appt.id(), "Completed").await?.billing.unwrap();

    let listed = svc.list_billing().await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].billing.amount, bill.amount);
    assert_eq!(listed[0].appointment.customer.phone, "+254700000001");
    Ok(())
}

#[tokio::test]
async fn non_completing_transitions_issue_no_bill() -> Result<()> {
    let (repo, svc) = memory();
    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;

    for status in ["Approved", "Cancelled", "Pending"] {
        let updated = svc.update_status(appt.id(), status).await?;
        assert_eq!(updated.status().as_str(), status);
        assert!(updated.billing.is_none());
    }
    assert_eq!(repo.billing_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn invalid_status_is_rejected_without_changes() -> Result<()> {
    let (_, svc) = memory();
    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;

    let err = svc.update_status(appt.id(), "completed").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(svc.get_appointment(appt.id()).await?.status(), AppointmentStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn mark_paid_twice_is_not_an_error() -> Result<()> {
    let (_, svc) = memory();
    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;
    let bill = svc.update_status(appt.id(), "Completed").await?.billing.unwrap();

    svc.mark_paid(bill.id).await?;
    let again = svc.mark_paid(bill.id).await?;
    assert_eq!(again.billing.payment_status, PaymentStatus::Paid);
    Ok(())
}

#[tokio::test]
async fn unknown_ids_are_not_found() -> Result<()> {
    let (_, svc) = memory();
    assert_eq!(svc.update_status(42, "Approved").await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(svc.mark_paid(42).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(svc.get_appointment(42).await.unwrap_err().kind(), ErrorKind::NotFound);
    let err = svc.derive_billing(BillingInput { appointment_id: 42, amount: None, issued_date: None }).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn booking_unknown_service_leaves_no_trace() -> Result<()> {
    let (repo, svc) = memory();
    let err = svc.book(alice(99)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(repo.customer_count().await, 0);
    assert_eq!(repo.appointment_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn booking_requires_contact_and_slot() -> Result<()> {
    let (repo, svc) = memory();
    let oil = oil_change(&svc).await?;
    let err = svc.book(BookingInput { date: "".into(), ..alice(oil) }).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = svc.book(BookingInput { phone: " ".into(), ..alice(oil) }).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(repo.appointment_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn failed_billing_rolls_back_completion() -> Result<()> {
    let (repo, svc) = memory();
    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;

    repo.fail_next_billing_insert();
    let err = svc.update_status(appt.id(), "Completed").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);

    let stored = svc.get_appointment(appt.id()).await?;
    assert_eq!(stored.status(), AppointmentStatus::Pending);
    assert!(stored.billing.is_none());
    assert_eq!(repo.billing_count().await, 0);

    // The fault is one-shot; a retry by the caller succeeds.
    let done = svc.update_status(appt.id(), "Completed").await?;
    assert!(done.billing.is_some());
    Ok(())
}

#[tokio::test]
async fn lost_phone_race_resolves_to_winner() -> Result<()> {
    let (repo, svc) = memory();
    let oil = oil_change(&svc).await?;
    repo.race_next_customer_insert(NewCustomerRow {
        name: "Racer".into(),
        phone: "+254700000001".into(),
        email: None,
    });

    let booked = svc.book(alice(oil)).await?;
    assert_eq!(booked.customer.name, "Racer");
    assert_eq!(repo.customer_count().await, 1);
    assert_eq!(repo.appointment_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn lost_billing_race_on_completion_returns_winner() -> Result<()> {
    let (repo, svc) = memory();
    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;
    repo.race_next_billing_insert(NewBillingRow::unpaid(appt.id(), 999.0, today()));

    let done = svc.update_status(appt.id(), "Completed").await?;
    assert_eq!(done.status(), AppointmentStatus::Completed);
    assert_eq!(done.billing.unwrap().amount, 999.0);
    assert_eq!(repo.billing_count().await, 1);
    assert_eq!(svc.get_appointment(appt.id()).await?.status(), AppointmentStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn lost_billing_race_on_direct_billing_returns_winner() -> Result<()> {
    let (repo, svc) = memory();
    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;
    repo.race_next_billing_insert(NewBillingRow::unpaid(appt.id(), 999.0, today()));

    let resolved = svc.derive_billing(BillingInput { appointment_id: appt.id(), amount: None, issued_date: None }).await?;
    assert!(!resolved.created);
    assert_eq!(resolved.value.billing.amount, 999.0);
    assert_eq!(repo.billing_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn padded_phone_within_limit_is_accepted() -> Result<()> {
    let (repo, svc) = memory();
    let phone = "+2547000000010000000";
    assert_eq!(phone.len(), 20);
    let first = svc
        .resolve_or_create_customer(NewCustomer { name: " Dan ".into(), phone: format!("  {phone}  "), email: None })
        .await?;
    let second = svc
        .resolve_or_create_customer(NewCustomer { name: "Dan".into(), phone: phone.into(), email: None })
        .await?;
    assert_eq!(first.value.phone, phone);
    assert_eq!(first.value.id, second.value.id);
    assert_eq!(repo.customer_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn direct_billing_is_idempotent_and_honours_override() -> Result<()> {
    let (repo, svc) = memory();
    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;
    let issued = NaiveDate::from_ymd_opt(2024, 5, 30).unwrap();

    let first = svc
        .derive_billing(BillingInput { appointment_id: appt.id(), amount: Some(1200.0), issued_date: Some(issued) })
        .await?;
    assert!(first.created);
    assert_eq!(first.value.billing.amount, 1200.0);
    assert_eq!(first.value.billing.issued_date, issued);
    assert_eq!(first.value.billing.payment_status, PaymentStatus::Unpaid);

    let second = svc.derive_billing(BillingInput { appointment_id: appt.id(), amount: None, issued_date: None }).await?;
    assert!(!second.created);
    assert_eq!(second.value.billing.id, first.value.billing.id);

    // Completing afterwards reuses the bill that already exists.
    let done = svc.update_status(appt.id(), "Completed").await?;
    assert_eq!(done.billing.unwrap().amount, 1200.0);
    assert_eq!(repo.billing_count().await, 1);

    let err = svc.derive_billing(BillingInput { appointment_id: appt.id(), amount: Some(-1.0), issued_date: None }).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn update_applies_status_and_slot_together() -> Result<()> {
    let (_, svc) = memory();
    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;

    let moved = svc.reschedule(appt.id(), Some("2024-06-03".into()), None).await?;
    assert_eq!(moved.appointment.date, "2024-06-03");
    assert_eq!(moved.appointment.time, "09:00 AM");

    let updated = svc
        .update(appt.id(), AppointmentUpdate { status: Some("Approved".into()), date: None, time: Some("02:00 PM".into()) })
        .await?;
    assert_eq!(updated.status(), AppointmentStatus::Approved);
    assert_eq!(updated.appointment.time, "02:00 PM");
    assert_eq!(updated.appointment.date, "2024-06-03");
    Ok(())
}

#[tokio::test]
async fn listings_nest_related_records() -> Result<()> {
    let (_, svc) = memory();
    let oil = oil_change(&svc).await?;
    let wash = svc.create_service(NewService { name: "Car Wash".into(), price: 500.0 }).await?;
    let a = svc.book(alice(oil)).await?;
    svc.book(BookingInput { service_id: wash.id, phone: "+254700000002".into(), name: "Bob".into(), email: None, ..alice(oil) }).await?;
    svc.update_status(a.id(), "Completed").await?;

    let all = svc.list_appointments().await?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].service.name, "Oil Change");
    assert!(all[0].billing.is_some());
    assert_eq!(all[1].customer.name, "Bob");
    assert!(all[1].billing.is_none());

    assert_eq!(svc.list_customers().await?.len(), 2);
    assert_eq!(svc.list_services().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn service_price_must_be_valid() -> Result<()> {
    let (_, svc) = memory();
    for price in [-1.0, f64::NAN, f64::INFINITY] {
        let err = svc.create_service(NewService { name: "Bad".into(), price }).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    Ok(())
}

#[tokio::test]
async fn sqlite_backed_flow() -> Result<()> {
    let db = connect_with_config(&DatabaseConfig::in_memory()).await?;
    migration::Migrator::up(&db, None).await?;
    let repo: Arc<dyn GarageRepository> = Arc::new(SeaOrmGarageRepository::new(db));
    let svc = GarageService::new(repo).with_clock(fixed_now);

    let oil = oil_change(&svc).await?;
    let appt = svc.book(alice(oil)).await?;
    let again = svc.book(BookingInput { name: "Alice Smith".into(), ..alice(oil) }).await?;
    assert_eq!(again.customer.id, appt.customer.id);
    assert_eq!(again.customer.name, "Alice");

    let done = svc.update_status(appt.id(), "Completed").await?;
    let bill = done.billing.unwrap();
    assert_eq!(bill.amount, 1500.0);
    assert_eq!(bill.issued_date, today());
    let repeat = svc.update_status(appt.id(), "Completed").await?;
    assert_eq!(repeat.billing.unwrap().id, bill.id);

    let paid = svc.mark_paid(bill.id).await?;
    assert!(paid.billing.is_paid());
    assert_eq!(svc.list_billing().await?.len(), 1);
    assert_eq!(svc.list_appointments().await?.len(), 2);

    let err = svc.book(alice(999)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(svc.list_customers().await?.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_on_sqlite_file() -> Result<()> {
    let path = std::env::temp_dir().join(format!("garage-flow-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let cfg = DatabaseConfig { url: format!("sqlite://{}?mode=rwc", path.display()), max_connections: 10, ..DatabaseConfig::default() };
    let db = connect_with_config(&cfg).await?;
    migration::Migrator::up(&db, None).await?;
    let repo: Arc<dyn GarageRepository> = Arc::new(SeaOrmGarageRepository::new(db));
    let svc = Arc::new(GarageService::new(repo).with_clock(fixed_now));
    let oil = oil_change(svc.as_ref()).await?;

    let mut handles = Vec::new();
    for i in 0..16 {
        let svc = Arc::clone(&svc);
        handles.push(tokio::spawn(async move {
            svc.book(BookingInput { time: format!("{:02}:00", 8 + i % 8), ..alice(oil) }).await
        }));
    }
    for h in handles {
        h.await??;
    }

    assert_eq!(svc.list_customers().await?.len(), 1);
    assert_eq!(svc.list_appointments().await?.len(), 16);
    drop(svc);
    let _ = std::fs::remove_file(&path);
    Ok(())
}
