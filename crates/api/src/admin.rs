use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
    response::IntoResponse,
};
use common::Identity;
use data::attendance::{AttendanceRecord, AttendanceWithUser};
use data::user::{UserRef, UserSummary};
use repos::{Repo, user::UserRepo};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{clock::TimeClock, error::ApiError};

fn user_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::ValidationError("invalid user id".to_string()))
}

pub struct AdminApi {}

impl AdminApi {
    pub async fn users(State(repo): State<Repo>) -> Result<Json<Vec<UserSummary>>, ApiError> {
        Ok(Json(UserRepo::get_all(&repo.pool).await?))
    }

    pub async fn attendance(
        State(clock): State<TimeClock>,
    ) -> Result<Json<Vec<AttendanceWithUser>>, ApiError> {
        Ok(Json(clock.recent_with_users().await?))
    }

    pub async fn user_attendance(
        State(repo): State<Repo>,
        State(clock): State<TimeClock>,
        path: Result<Path<Uuid>, PathRejection>,
    ) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
        let id = user_id(path)?;

        if UserRepo::get_by_id(&repo.pool, id).await?.is_none() {
            return Err(ApiError::NotFound("user".to_string()));
        }

        Ok(Json(clock.history(id).await?))
    }

    pub async fn promote(
        State(repo): State<Repo>,
        Extension(admin): Extension<Identity>,
        path: Result<Path<Uuid>, PathRejection>,
    ) -> Result<impl IntoResponse, ApiError> {
        let id = user_id(path)?;

        let user = UserRepo::promote(&repo.pool, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("user".to_string()))?;

        info!("User {} promoted {} ({}) to admin", admin.username, user.username, user.id);

        Ok(Json(json!({
            "message": "User promoted to admin",
            "user": UserRef::from(&user),
        })))
    }
}
