use std::sync::Arc;

use service::garage::repo::{MemoryGarageRepository, SeaOrmGarageRepository};
use service::garage::{GarageRepository, GarageService};

/// Shared handler state: the garage domain service over whichever gateway
/// the process was started with.
#[derive(Clone)]
pub struct AppState {
    pub garage: Arc<GarageService<dyn GarageRepository>>,
}

impl AppState {
    pub fn new(repo: Arc<dyn GarageRepository>) -> Self {
        Self { garage: Arc::new(GarageService::new(repo)) }
    }

    /// State backed by the SQL database behind `db`.
    pub fn with_database(db: models::db::DatabaseConnection) -> Self {
        Self::new(Arc::new(SeaOrmGarageRepository::new(db)))
    }

    /// Throwaway in-memory state, used by router tests.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryGarageRepository::new()))
    }
}
