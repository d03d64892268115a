use serde::Serialize;

/// Liveness check payload.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct Health {
    pub status: &'static str,
}

/// Root banner returned by `GET /`.
#[derive(Serialize, Debug, Clone)]
pub struct Banner {
    pub message: String,
}

impl Banner {
    pub fn running(name: &str) -> Self {
        Self { message: format!("{name} API is running!") }
    }
}
