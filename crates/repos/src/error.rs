use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("database failure: {0}")]
    DatabaseError(String),

    #[error("not found")]
    NotFound(),

    #[error("database uniqueness violation")]
    UniqueViolation(String, String),

    #[error("database foreign key violation")]
    ForeignKeyViolation(String, String),

    #[error("database integrity check")]
    CheckViolation(String, String),

    #[error("database transaction error")]
    TransactionError(),

    #[error("database error")]
    Other(),
}

impl RepoError {
    /// Outcomes that callers report to the client rather than treat as faults.
    pub fn is_expected(&self) -> bool {
        matches!(self, RepoError::UniqueViolation(..) | RepoError::NotFound())
    }
}

pub fn handle_sql_error(err: sqlx::Error) -> RepoError {
    use sqlx::Error as E;

    let mapped = match err {
        E::RowNotFound => RepoError::NotFound(),
        E::Database(ref e) => {
            let constraint = e.constraint().unwrap_or_default().to_string();
            let table = e.table().unwrap_or_default().to_string();

            if e.is_unique_violation() {
                RepoError::UniqueViolation(table, constraint)
            } else if e.is_foreign_key_violation() {
                RepoError::ForeignKeyViolation(table, constraint)
            } else if e.is_check_violation() {
                RepoError::CheckViolation(table, constraint)
            } else {
                RepoError::DatabaseError(e.message().to_string())
            }
        }
        E::PoolTimedOut | E::PoolClosed | E::Io(_) => {
            RepoError::DatabaseError("database unavailable".to_string())
        }
        _ => RepoError::Other(),
    };

    if mapped.is_expected() {
        warn!("SQL error: {}", err);
    } else {
        error!("SQL error: {}", err);
    }
    mapped
}
