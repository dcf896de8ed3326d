use common::Role;
use sqlx::Postgres;

use crate::{
    Repo,
    error::{RepoError, handle_sql_error},
};
use data::user::{NewUser, User, UserSummary};

pub struct UserRepo {}

impl UserRepo {
    pub async fn get_by_id(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        id: uuid::Uuid,
    ) -> Result<Option<User>, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
                SELECT *
                FROM users
                WHERE users.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(handle_sql_error)
    }

    pub async fn get_by_name(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        username: &str,
    ) -> Result<Option<User>, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
                SELECT *
                FROM users
                WHERE users.username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(executor)
        .await
        .map_err(handle_sql_error)
    }

    /// All users, newest first. The password verifier is never selected.
    pub async fn get_all(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
    ) -> Result<Vec<UserSummary>, RepoError> {
        sqlx::query_as::<_, UserSummary>(
            r#"
                SELECT id, username, email, full_name, role, created_at
                FROM users
                ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(executor)
        .await
        .map_err(handle_sql_error)
    }

    pub async fn create(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        user: NewUser,
    ) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
                INSERT INTO users
                  (
                    username,
                    email,
                    password,
                    full_name,
                    role
                  )
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            "#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password)
        .bind(user.full_name)
        .bind(user.role.as_str())
        .fetch_one(executor)
        .await
        .map_err(handle_sql_error)
    }

    /// Admits a new user, granting `admin` when no user exists yet.
    ///
    /// The count and the insert share one transaction, which does not stop
    /// two concurrent first registrations from both reading zero.
    pub async fn register(
        repo: &Repo,
        username: String,
        email: String,
        password: String,
        full_name: String,
    ) -> Result<User, RepoError> {
        let mut tx = repo.begin().await?;

        let role = if Self::count(&mut *tx).await? == 0 {
            Role::Admin
        } else {
            Role::User
        };

        let user = Self::create(
            &mut *tx,
            NewUser {
                username,
                email,
                password,
                full_name,
                role,
            },
        )
        .await?;

        repo.end(tx).await?;
        Ok(user)
    }

    /// Grants `admin`. Promoting an admin leaves the row unchanged.
    pub async fn promote(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
        id: uuid::Uuid,
    ) -> Result<Option<User>, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
                UPDATE users
                SET role = $1
                WHERE id = $2
                RETURNING *
            "#,
        )
        .bind(Role::Admin.as_str())
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(handle_sql_error)
    }

    pub async fn count(
        executor: impl sqlx::Executor<'_, Database = Postgres>,
    ) -> Result<i64, RepoError> {
        sqlx::query_scalar::<_, i64>(
            r#"
                SELECT COUNT(*)
                FROM users
            "#,
        )
        .fetch_one(executor)
        .await
        .map_err(handle_sql_error)
    }
}
