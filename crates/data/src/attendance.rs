use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    pub break_start: Option<DateTime<Utc>>,
    pub break_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }

    /// Status contributed by this record alone. A closed record contributes
    /// nothing.
    pub fn status(&self) -> AttendanceStatus {
        if !self.is_open() {
            return AttendanceStatus::None;
        }
        if self.break_start.is_some() && self.break_end.is_none() {
            return AttendanceStatus::OnBreak;
        }
        AttendanceStatus::Working
    }

    /// `clock_in <= break_start <= break_end <= clock_out` over the fields
    /// that are set, and no break end without a break start.
    pub fn is_well_ordered(&self) -> bool {
        if self.break_end.is_some() && self.break_start.is_none() {
            return false;
        }
        let set: Vec<DateTime<Utc>> = [self.clock_in, self.break_start, self.break_end, self.clock_out]
            .into_iter()
            .flatten()
            .collect();
        set.windows(2).all(|pair| pair[0] <= pair[1])
    }
}

/// An attendance row joined with the identity of its owner.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct AttendanceWithUser {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: AttendanceRecord,
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    None,
    Working,
    OnBreak,
}

impl AttendanceStatus {
    /// Derives the caller's status from the latest open record, if any.
    pub fn derive(latest_open: Option<&AttendanceRecord>) -> Self {
        latest_open
            .map(AttendanceRecord::status)
            .unwrap_or(AttendanceStatus::None)
    }

    pub fn message(&self) -> &'static str {
        match self {
            AttendanceStatus::None => "Not clocked in",
            AttendanceStatus::Working => "Working",
            AttendanceStatus::OnBreak => "On break",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ClockAction {
    ClockIn,
    BreakStart,
    BreakEnd,
    ClockOut,
}

impl ClockAction {
    pub const ALL: [ClockAction; 4] = [
        ClockAction::ClockIn,
        ClockAction::BreakStart,
        ClockAction::BreakEnd,
        ClockAction::ClockOut,
    ];

    /// The transition table. `None` means the action is illegal from `from`.
    pub fn transition(&self, from: AttendanceStatus) -> Option<AttendanceStatus> {
        use AttendanceStatus as S;

        match (self, from) {
            (ClockAction::ClockIn, S::None) => Some(S::Working),
            (ClockAction::BreakStart, S::Working) => Some(S::OnBreak),
            (ClockAction::BreakEnd, S::OnBreak) => Some(S::Working),
            (ClockAction::ClockOut, S::Working | S::OnBreak) => Some(S::None),
            _ => None,
        }
    }

    /// Whether the action may be applied to `record`. Only a record that
    /// has never had a break may start one, so a shift holds at most one
    /// break interval.
    pub fn admits(&self, record: &AttendanceRecord) -> bool {
        if self.transition(record.status()).is_none() {
            return false;
        }
        match self {
            ClockAction::ClockIn => false,
            ClockAction::BreakStart => record.break_start.is_none(),
            ClockAction::BreakEnd => record.break_start.is_some() && record.break_end.is_none(),
            ClockAction::ClockOut => true,
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            ClockAction::ClockIn => "Clocked in",
            ClockAction::BreakStart => "Break started",
            ClockAction::BreakEnd => "Break ended",
            ClockAction::ClockOut => "Clocked out",
        }
    }

    pub fn rejection_message(&self) -> &'static str {
        match self {
            ClockAction::ClockIn => "Already clocked in",
            ClockAction::BreakStart => "No shift eligible for a break",
            ClockAction::BreakEnd => "No break in progress",
            ClockAction::ClockOut => "No open shift to clock out of",
        }
    }
}
