use sea_orm::{DbErr, RuntimeErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

/// Coarse classification used by callers that translate errors (HTTP, logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Persistence,
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) | ServiceError::InvalidStatus(_) => ErrorKind::Validation,
            ServiceError::Model(models::errors::ModelError::Validation(_)) => ErrorKind::Validation,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Db(_) | ServiceError::Model(models::errors::ModelError::Db(_)) => ErrorKind::Persistence,
        }
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 2001,
            ServiceError::InvalidStatus(_) => 2002,
            ServiceError::Model(_) => 2003,
            ServiceError::NotFound(_) => 2004,
            ServiceError::Conflict(_) => 2005,
            ServiceError::Db(_) => 2100,
        }
    }
}

/// SQLITE_BUSY / SQLITE_LOCKED: another writer holds the database lock.
fn is_sqlite_busy(e: &DbErr) -> bool {
    let rt = match e {
        DbErr::Conn(rt) | DbErr::Exec(rt) | DbErr::Query(rt) => rt,
        _ => return false,
    };
    match rt {
        RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db)) => matches!(db.code().as_deref(), Some("5" | "6")),
        _ => false,
    }
}

impl From<DbErr> for ServiceError {
    fn from(e: DbErr) -> Self {
        // 锁竞争按冲突处理，交给 retry_on_conflict 重跑一次
        if is_sqlite_busy(&e) {
            return ServiceError::Conflict(format!("database busy: {e}"));
        }
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => return ServiceError::Conflict(msg),
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => return ServiceError::Validation(msg),
            _ => {}
        }
        match e {
            DbErr::RecordNotFound(msg) => ServiceError::NotFound(msg),
            DbErr::RecordNotUpdated => ServiceError::NotFound("record not updated".into()),
            other => ServiceError::Db(other.to_string()),
        }
    }
}
