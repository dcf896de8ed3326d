use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use data::attendance::{AttendanceRecord, AttendanceWithUser, ClockAction};
use repos::attendance::AttendanceStore;
use repos::error::RepoError;

/// In-process attendance table. Each transition holds the table lock for its
/// whole check-and-act, mirroring the single-statement updates of the
/// PostgreSQL store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAttendanceStore {
    records: Arc<Mutex<Vec<AttendanceRecord>>>,
    users: Arc<Mutex<HashMap<Uuid, (String, String)>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the identity used by the joined listing.
    pub fn add_user(&self, user_id: Uuid, username: &str, full_name: &str) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(user_id, (username.to_string(), full_name.to_string()));
        }
    }

    /// Makes every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn open_count(&self, user_id: Uuid) -> usize {
        self.records()
            .iter()
            .filter(|r| r.user_id == user_id && r.is_open())
            .count()
    }

    fn check_available(&self) -> Result<(), RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::DatabaseError("database unavailable".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AttendanceRecord>>, RepoError> {
        self.check_available()?;
        self.records.lock().map_err(|_| RepoError::Other())
    }

    fn apply(
        &self,
        user_id: Uuid,
        action: ClockAction,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        let mut records = self.lock()?;

        if action == ClockAction::ClockIn {
            if records.iter().any(|r| r.user_id == user_id && r.is_open()) {
                return Ok(None);
            }
            let record = AttendanceRecord {
                id: Uuid::new_v4(),
                user_id,
                clock_in: Some(now),
                clock_out: None,
                break_start: None,
                break_end: None,
                created_at: now,
            };
            records.push(record.clone());
            return Ok(Some(record));
        }

        let Some(record) = records
            .iter_mut()
            .rev()
            .find(|r| r.user_id == user_id && r.is_open())
        else {
            return Ok(None);
        };

        if !action.admits(record) {
            return Ok(None);
        }

        // Same clamping as the SQL store: a stamp never precedes an earlier one.
        let latest = [record.clock_in, record.break_start, record.break_end]
            .into_iter()
            .flatten()
            .fold(now, |acc, stamp| acc.max(stamp));

        match action {
            ClockAction::BreakStart => record.break_start = Some(latest),
            ClockAction::BreakEnd => record.break_end = Some(latest),
            ClockAction::ClockOut => record.clock_out = Some(latest),
            ClockAction::ClockIn => unreachable!("handled above"),
        }

        Ok(Some(record.clone()))
    }

    fn newest_first(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>, RepoError> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    async fn open_shift(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        self.apply(user_id, ClockAction::ClockIn, now)
    }

    async fn start_break(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        self.apply(user_id, ClockAction::BreakStart, now)
    }

    async fn end_break(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        self.apply(user_id, ClockAction::BreakEnd, now)
    }

    async fn close_shift(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        self.apply(user_id, ClockAction::ClockOut, now)
    }

    async fn latest_open(&self, user_id: Uuid) -> Result<Option<AttendanceRecord>, RepoError> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .rev()
            .find(|r| r.user_id == user_id && r.is_open())
            .cloned())
    }

    async fn recent_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, RepoError> {
        let mut records = self.newest_first(user_id)?;
        records.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(records)
    }

    async fn all_for_user(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>, RepoError> {
        self.newest_first(user_id)
    }

    async fn recent_with_users(&self, limit: i64) -> Result<Vec<AttendanceWithUser>, RepoError> {
        let records = self.lock()?;
        let users = self.users.lock().map_err(|_| RepoError::Other())?;

        Ok(records
            .iter()
            .rev()
            .filter_map(|record| {
                users.get(&record.user_id).map(|(username, full_name)| AttendanceWithUser {
                    record: record.clone(),
                    username: username.clone(),
                    full_name: full_name.clone(),
                })
            })
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }
}
