use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use common::password::{PasswordError, hash_password, verify_password};
use common::{Identity, Role};
use data::user::UserRef;
use repos::{Repo, user::UserRepo};
use serde::Deserialize;
use serde_json::json;
use std::sync::LazyLock;
use tracing::{error, info};

use crate::{error::ApiError, identity::AuthSession};

/// Verified against when the login name is unknown, so both failure paths
/// pay for one hash comparison.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("no such user").ok());

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::InternalFailure(format!("password task failed: {err}")))?
        .map_err(|err| ApiError::InternalFailure(format!("password hashing failed: {err}")))
}

pub struct AuthApi {}

impl AuthApi {
    pub async fn register(
        State(repo): State<Repo>,
        mut auth: AuthSession,
        payload: Result<Json<RegisterRequest>, JsonRejection>,
    ) -> Result<impl IntoResponse, ApiError> {
        let Json(request) = payload.map_err(|err| ApiError::ValidationError(err.body_text()))?;

        let (Some(username), Some(email), Some(password), Some(full_name)) = (
            required(request.username),
            required(request.email),
            required(request.password),
            required(request.full_name),
        ) else {
            return Err(ApiError::ValidationError(
                "username, email, password and full_name are required".to_string(),
            ));
        };

        let password = run_blocking(move || hash_password(&password)).await?;
        let user = UserRepo::register(&repo, username, email, password, full_name).await?;

        info!("Registered user {} ({}) as {}", user.username, user.id, user.role);

        auth.login(Identity::new(user.id, user.username.clone(), user.role))
            .await?;

        let message = match user.role {
            Role::Admin => "Registration successful. As the first user you have been granted admin rights.",
            Role::User => "Registration successful",
        };

        Ok(Json(json!({
            "message": message,
            "user": UserRef::from(&user),
        })))
    }

    pub async fn login(
        State(repo): State<Repo>,
        mut auth: AuthSession,
        payload: Result<Json<LoginRequest>, JsonRejection>,
    ) -> Result<impl IntoResponse, ApiError> {
        let request = payload.map(|Json(r)| r).unwrap_or_default();
        let (Some(username), Some(password)) =
            (required(request.username), required(request.password))
        else {
            return Err(ApiError::InvalidCredentials);
        };

        let Some(user) = UserRepo::get_by_name(&repo.pool, &username).await? else {
            if let Some(dummy) = DUMMY_HASH.as_ref().cloned() {
                let _ = run_blocking(move || verify_password(&password, &dummy)).await;
            }
            info!("Login failed for unknown user {}", username);
            return Err(ApiError::InvalidCredentials);
        };

        let stored = user.password.clone();
        match run_blocking(move || verify_password(&password, &stored)).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Login failed for user {}: wrong password", user.username);
                return Err(ApiError::InvalidCredentials);
            }
            Err(err) => {
                error!("Stored password hash for {} is unusable: {}", user.username, err);
                return Err(ApiError::InvalidCredentials);
            }
        }

        auth.login(Identity::new(user.id, user.username.clone(), user.role))
            .await?;

        Ok(Json(json!({
            "message": "Login successful",
            "user": UserRef::from(&user),
        })))
    }

    pub async fn logout(mut auth: AuthSession) -> Result<impl IntoResponse, ApiError> {
        auth.logout().await?;
        Ok(Json(json!({ "message": "Logged out" })))
    }

    pub async fn me(Extension(identity): Extension<Identity>) -> Json<Identity> {
        Json(identity)
    }
}
