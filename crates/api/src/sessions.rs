use sqlx::PgPool;
use std::time::Duration;
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::{debug, error, info};

/// How often expired sessions are swept from the store.
pub const CLEANUP_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Opens the Postgres session store, creating the `tower_sessions.session`
/// table on first use.
pub async fn open_store(pool: PgPool) -> Result<PostgresStore, sqlx::Error> {
    let store = PostgresStore::new(pool);
    store.migrate().await?;
    info!("Session store ready");
    Ok(store)
}

/// Deletes every expired session once. Failures are logged and reported as
/// `false`; the next sweep retries.
pub async fn sweep_expired<Store>(store: &Store) -> bool
where
    Store: ExpiredDeletion,
{
    match store.delete_expired().await {
        Ok(()) => {
            debug!("Expired sessions removed");
            true
        }
        Err(err) => {
            error!("Failed to delete expired sessions: {}", err);
            false
        }
    }
}

/// Sweeps expired sessions every `period` until the task is dropped.
pub async fn sweep_expired_every<Store>(store: Store, period: Duration)
where
    Store: ExpiredDeletion,
{
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        sweep_expired(&store).await;
    }
}
