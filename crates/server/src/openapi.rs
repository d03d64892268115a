use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct CustomerRequestDoc { pub name: String, pub phone: String, pub email: Option<String> }

#[derive(ToSchema)]
pub struct ServiceRequestDoc { pub name: String, pub price: f64 }

#[derive(ToSchema)]
pub struct BookingRequestDoc {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub service_id: i32,
    /// e.g. `2024-06-01`
    pub date: String,
    /// e.g. `09:00 AM`
    pub time: String,
}

#[derive(ToSchema)]
pub struct AppointmentUpdateDoc {
    /// One of `Pending`, `Approved`, `Completed`, `Cancelled`
    pub status: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

#[derive(ToSchema)]
pub struct BillingRequestDoc {
    pub appointment_id: i32,
    /// Defaults to the service price
    pub amount: Option<f64>,
    /// `YYYY-MM-DD`, defaults to today
    pub issued_date: Option<String>,
}

#[derive(ToSchema)]
pub struct ErrorDoc { pub error: String, pub detail: Option<String> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::customers::create,
        crate::routes::customers::list,
        crate::routes::catalog::create,
        crate::routes::catalog::list,
        crate::routes::appointments::create,
        crate::routes::appointments::list,
        crate::routes::appointments::update,
        crate::routes::billing::create,
        crate::routes::billing::list,
        crate::routes::billing::pay,
    ),
    components(
        schemas(
            HealthResponse,
            CustomerRequestDoc,
            ServiceRequestDoc,
            BookingRequestDoc,
            AppointmentUpdateDoc,
            BillingRequestDoc,
            ErrorDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "customers"),
        (name = "services"),
        (name = "appointments"),
        (name = "billing")
    )
)]
pub struct ApiDoc;
