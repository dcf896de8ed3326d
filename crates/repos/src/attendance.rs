use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Postgres;
use std::fmt::Debug;
use uuid::Uuid;

use crate::{
    Repo,
    error::{RepoError, handle_sql_error},
};
use data::attendance::{AttendanceRecord, AttendanceWithUser};

/// Durable attendance rows with atomic conditional transitions.
///
/// Every mutating method is a single check-and-act: it either changes
/// exactly one row and returns it, or matches nothing and returns `None`.
#[async_trait]
pub trait AttendanceStore: Send + Sync + Debug + 'static {
    /// Inserts a new open record unless the user already has one.
    async fn open_shift(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError>;

    /// Sets `break_start` on the open record if no break was taken yet.
    async fn start_break(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError>;

    /// Sets `break_end` on the open record if a break is in progress.
    async fn end_break(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError>;

    /// Sets `clock_out` on the open record.
    async fn close_shift(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError>;

    async fn latest_open(&self, user_id: Uuid) -> Result<Option<AttendanceRecord>, RepoError>;

    async fn recent_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, RepoError>;

    async fn all_for_user(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>, RepoError>;

    async fn recent_with_users(&self, limit: i64) -> Result<Vec<AttendanceWithUser>, RepoError>;
}

pub struct AttendanceRepo {}

impl AttendanceRepo {
    pub async fn open_shift(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
                INSERT INTO attendance
                  (
                    user_id,
                    clock_in
                  )
                VALUES ($1, $2)
                ON CONFLICT (user_id) WHERE clock_out IS NULL DO NOTHING
                RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(executor)
        .await
        .map_err(handle_sql_error)
    }

    pub async fn start_break(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
                UPDATE attendance
                SET break_start = GREATEST($2, clock_in)
                WHERE user_id = $1
                  AND clock_out IS NULL
                  AND break_start IS NULL
                RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(executor)
        .await
        .map_err(handle_sql_error)
    }

    pub async fn end_break(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
                UPDATE attendance
                SET break_end = GREATEST($2, break_start)
                WHERE user_id = $1
                  AND clock_out IS NULL
                  AND break_start IS NOT NULL
                  AND break_end IS NULL
                RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(executor)
        .await
        .map_err(handle_sql_error)
    }

    pub async fn close_shift(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
                UPDATE attendance
                SET clock_out = GREATEST($2, clock_in, break_start, break_end)
                WHERE user_id = $1
                  AND clock_out IS NULL
                RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(executor)
        .await
        .map_err(handle_sql_error)
    }

    pub async fn latest_open(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        user_id: Uuid,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
                SELECT *
                FROM attendance
                WHERE user_id = $1
                  AND clock_out IS NULL
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(handle_sql_error)
    }

    pub async fn get_by_user(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<AttendanceRecord>, RepoError> {
        // LIMIT NULL is LIMIT ALL
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
                SELECT *
                FROM attendance
                WHERE user_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(executor)
        .await
        .map_err(handle_sql_error)
    }

    pub async fn get_recent_with_users(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        limit: i64,
    ) -> Result<Vec<AttendanceWithUser>, RepoError> {
        sqlx::query_as::<_, AttendanceWithUser>(
            r#"
                SELECT a.*, u.username, u.full_name
                FROM attendance a
                JOIN users u ON a.user_id = u.id
                ORDER BY a.created_at DESC, a.id DESC
                LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(executor)
        .await
        .map_err(handle_sql_error)
    }

    pub async fn count_open(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        user_id: Uuid,
    ) -> Result<i64, RepoError> {
        sqlx::query_scalar::<_, i64>(
            r#"
                SELECT COUNT(*)
                FROM attendance
                WHERE user_id = $1
                  AND clock_out IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(executor)
        .await
        .map_err(handle_sql_error)
    }
}

#[async_trait]
impl AttendanceStore for Repo {
    async fn open_shift(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        AttendanceRepo::open_shift(&self.pool, user_id, now).await
    }

    async fn start_break(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        AttendanceRepo::start_break(&self.pool, user_id, now).await
    }

    async fn end_break(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        AttendanceRepo::end_break(&self.pool, user_id, now).await
    }

    async fn close_shift(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        AttendanceRepo::close_shift(&self.pool, user_id, now).await
    }

    async fn latest_open(&self, user_id: Uuid) -> Result<Option<AttendanceRecord>, RepoError> {
        AttendanceRepo::latest_open(&self.pool, user_id).await
    }

    async fn recent_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, RepoError> {
        AttendanceRepo::get_by_user(&self.pool, user_id, Some(limit)).await
    }

    async fn all_for_user(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>, RepoError> {
        AttendanceRepo::get_by_user(&self.pool, user_id, None).await
    }

    async fn recent_with_users(&self, limit: i64) -> Result<Vec<AttendanceWithUser>, RepoError> {
        AttendanceRepo::get_recent_with_users(&self.pool, limit).await
    }
}
