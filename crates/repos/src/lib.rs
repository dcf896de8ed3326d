pub mod attendance;
pub mod error;
pub mod user;

use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::error;

use crate::error::RepoError;

#[derive(Debug, Clone)]
pub struct Repo {
    pub pool: PgPool,
}

impl Repo {
    pub fn new(pool: PgPool) -> Repo {
        Repo { pool }
    }

    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, RepoError> {
        self.pool.acquire().await.map_err(|err| {
            error!("Failed to acquire connection: {}", err);
            RepoError::TransactionError()
        })
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, RepoError> {
        self.pool.begin().await.map_err(|err| {
            error!("Failed to begin transaction: {}", err);
            RepoError::TransactionError()
        })
    }

    pub async fn end(&self, transaction: Transaction<'static, Postgres>) -> Result<(), RepoError> {
        transaction.commit().await.map_err(|err| {
            error!("Failed to commit transaction: {}", err);
            RepoError::TransactionError()
        })
    }
}
