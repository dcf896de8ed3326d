use axum::{Extension, Json, extract::State, response::IntoResponse};
use common::Identity;
use data::attendance::{AttendanceRecord, ClockAction};
use serde_json::json;

use crate::{
    clock::{StatusReport, TimeClock},
    error::ApiError,
};

pub struct AttendanceApi {}

impl AttendanceApi {
    async fn transition(
        clock: &TimeClock,
        identity: &Identity,
        action: ClockAction,
    ) -> Result<AttendanceRecord, ApiError> {
        Ok(clock.apply(identity.id, action).await?)
    }

    pub async fn clock_in(
        State(clock): State<TimeClock>,
        Extension(identity): Extension<Identity>,
    ) -> Result<impl IntoResponse, ApiError> {
        let record = Self::transition(&clock, &identity, ClockAction::ClockIn).await?;
        Ok(Json(json!({
            "message": ClockAction::ClockIn.success_message(),
            "id": record.id,
        })))
    }

    pub async fn break_start(
        State(clock): State<TimeClock>,
        Extension(identity): Extension<Identity>,
    ) -> Result<impl IntoResponse, ApiError> {
        Self::transition(&clock, &identity, ClockAction::BreakStart).await?;
        Ok(Json(json!({ "message": ClockAction::BreakStart.success_message() })))
    }

    pub async fn break_end(
        State(clock): State<TimeClock>,
        Extension(identity): Extension<Identity>,
    ) -> Result<impl IntoResponse, ApiError> {
        Self::transition(&clock, &identity, ClockAction::BreakEnd).await?;
        Ok(Json(json!({ "message": ClockAction::BreakEnd.success_message() })))
    }

    pub async fn clock_out(
        State(clock): State<TimeClock>,
        Extension(identity): Extension<Identity>,
    ) -> Result<impl IntoResponse, ApiError> {
        Self::transition(&clock, &identity, ClockAction::ClockOut).await?;
        Ok(Json(json!({ "message": ClockAction::ClockOut.success_message() })))
    }

    pub async fn status(
        State(clock): State<TimeClock>,
        Extension(identity): Extension<Identity>,
    ) -> Result<Json<StatusReport>, ApiError> {
        Ok(Json(clock.status(identity.id).await?))
    }

    pub async fn records(
        State(clock): State<TimeClock>,
        Extension(identity): Extension<Identity>,
    ) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
        Ok(Json(clock.records(identity.id).await?))
    }
}
