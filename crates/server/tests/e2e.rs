use std::net::SocketAddr;

use migration::MigratorTrait;
use models::db::{connect_with_config, DatabaseConfig};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use server::routes::build_router;
use server::AppState;

struct TestApp {
    base_url: String,
}

/// Serve the real router over an in-memory SQLite database on an ephemeral port.
async fn start_server() -> anyhow::Result<TestApp> {
    let db = connect_with_config(&DatabaseConfig::in_memory()).await?;
    migration::Migrator::up(&db, None).await?;

    let app = build_router(AppState::with_database(db), CorsLayer::very_permissive());
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url: format!("http://{}:{}", addr.ip(), addr.port()) })
}

#[tokio::test]
async fn e2e_booking_to_payment() -> anyhow::Result<()> {
    let app = start_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", app.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/api/services", app.base_url))
        .json(&json!({"name": "Oil Change", "price": 1500.0}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let service_id = res.json::<Value>().await?["service"]["id"].as_i64().unwrap_or_default();

    let booking = json!({
        "name": "Alice",
        "phone": "+254700000001",
        "email": "alice@example.com",
        "service_id": service_id,
        "date": "2024-06-01",
        "time": "09:00 AM"
    });
    let res = client.post(format!("{}/api/appointments", app.base_url)).json(&booking).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let appt_id = body["appointment"]["id"].as_i64().unwrap_or_default();
    assert_eq!(body["appointment"]["customer"]["email"], "alice@example.com");

    let res = client
        .put(format!("{}/api/appointments/{}", app.base_url, appt_id))
        .json(&json!({"status": "Completed"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["appointment"]["billing"]["amount"], 1500.0);
    let bill_id = body["appointment"]["billing"]["id"].as_i64().unwrap_or_default();

    for _ in 0..2 {
        let res = client.put(format!("{}/api/billing/{}/pay", app.base_url, bill_id)).send().await?;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await?;
        assert_eq!(body["billing"]["payment_status"], "Paid");
    }

    let rebook = json!({
        "name": "Alice Smith",
        "phone": "+254700000001",
        "service_id": service_id,
        "date": "2024-06-08",
        "time": "10:00 AM"
    });
    let res = client.post(format!("{}/api/appointments", app.base_url)).json(&rebook).send().await?;
    let body: Value = res.json().await?;
    assert_eq!(body["appointment"]["customer"]["name"], "Alice");

    let res = client.get(format!("{}/api/appointments", app.base_url)).send().await?;
    assert_eq!(res.json::<Value>().await?["count"], 2);
    Ok(())
}
