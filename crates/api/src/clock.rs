use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use data::attendance::{AttendanceRecord, AttendanceStatus, AttendanceWithUser, ClockAction};
use repos::attendance::AttendanceStore;
use repos::error::RepoError;

/// How many of a user's own records `records` returns.
pub const OWN_RECORDS_LIMIT: i64 = 30;

/// How many joined records the administrative listing returns.
pub const ALL_RECORDS_LIMIT: i64 = 100;

#[derive(Error, Debug)]
pub enum ClockError {
    #[error("{0} is not allowed in the current state")]
    PreconditionFailed(ClockAction),

    #[error("attendance store failure: {0}")]
    Store(#[from] RepoError),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusReport {
    pub status: AttendanceStatus,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<AttendanceRecord>,
}

/// Per-user attendance state machine.
///
/// Status is never stored; it is projected from the latest open record on
/// every read. Each transition is handed to the store as one conditional
/// write, and a write that matches no row is the rejection.
#[derive(Debug, Clone)]
pub struct TimeClock {
    store: Arc<dyn AttendanceStore>,
}

impl TimeClock {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    pub async fn apply(
        &self,
        user_id: Uuid,
        action: ClockAction,
    ) -> Result<AttendanceRecord, ClockError> {
        self.apply_at(user_id, action, Utc::now()).await
    }

    pub async fn apply_at(
        &self,
        user_id: Uuid,
        action: ClockAction,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, ClockError> {
        let outcome = match action {
            ClockAction::ClockIn => self.store.open_shift(user_id, now).await,
            ClockAction::BreakStart => self.store.start_break(user_id, now).await,
            ClockAction::BreakEnd => self.store.end_break(user_id, now).await,
            ClockAction::ClockOut => self.store.close_shift(user_id, now).await,
        }
        .map_err(|err| {
            error!("Failed to apply {} for user {}: {}", action, user_id, err);
            err
        })?;

        match outcome {
            Some(record) => {
                info!("User {} {} (record {})", user_id, action, record.id);
                Ok(record)
            }
            None => {
                info!("Rejected {} for user {}: precondition not met", action, user_id);
                Err(ClockError::PreconditionFailed(action))
            }
        }
    }

    pub async fn clock_in(&self, user_id: Uuid) -> Result<AttendanceRecord, ClockError> {
        self.apply(user_id, ClockAction::ClockIn).await
    }

    pub async fn start_break(&self, user_id: Uuid) -> Result<AttendanceRecord, ClockError> {
        self.apply(user_id, ClockAction::BreakStart).await
    }

    pub async fn end_break(&self, user_id: Uuid) -> Result<AttendanceRecord, ClockError> {
        self.apply(user_id, ClockAction::BreakEnd).await
    }

    pub async fn clock_out(&self, user_id: Uuid) -> Result<AttendanceRecord, ClockError> {
        self.apply(user_id, ClockAction::ClockOut).await
    }

    pub async fn status(&self, user_id: Uuid) -> Result<StatusReport, ClockError> {
        let latest_open = self.store.latest_open(user_id).await?;
        let status = AttendanceStatus::derive(latest_open.as_ref());

        Ok(StatusReport {
            status,
            message: status.message(),
            record: latest_open.filter(|_| status != AttendanceStatus::None),
        })
    }

    pub async fn records(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>, ClockError> {
        Ok(self.store.recent_for_user(user_id, OWN_RECORDS_LIMIT).await?)
    }

    pub async fn history(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>, ClockError> {
        Ok(self.store.all_for_user(user_id).await?)
    }

    pub async fn recent_with_users(&self) -> Result<Vec<AttendanceWithUser>, ClockError> {
        Ok(self.store.recent_with_users(ALL_RECORDS_LIMIT).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use futures::future::join_all;
    use mockall::mock;
    use testware::MemoryAttendanceStore;

    mock! {
        pub Store {}

        #[async_trait]
        impl AttendanceStore for Store {
            async fn open_shift(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<AttendanceRecord>, RepoError>;
            async fn start_break(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<AttendanceRecord>, RepoError>;
            async fn end_break(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<AttendanceRecord>, RepoError>;
            async fn close_shift(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<AttendanceRecord>, RepoError>;
            async fn latest_open(&self, user_id: Uuid) -> Result<Option<AttendanceRecord>, RepoError>;
            async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<AttendanceRecord>, RepoError>;
            async fn all_for_user(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>, RepoError>;
            async fn recent_with_users(&self, limit: i64) -> Result<Vec<AttendanceWithUser>, RepoError>;
        }
    }

    impl std::fmt::Debug for MockStore {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("MockStore")
        }
    }

    fn memory_clock() -> (TimeClock, MemoryAttendanceStore) {
        let store = MemoryAttendanceStore::new();
        (TimeClock::new(Arc::new(store.clone())), store)
    }

    async fn drive_to(clock: &TimeClock, user: Uuid, status: AttendanceStatus) {
        match status {
            AttendanceStatus::None => {}
            AttendanceStatus::Working => {
                clock.clock_in(user).await.unwrap();
            }
            AttendanceStatus::OnBreak => {
                clock.clock_in(user).await.unwrap();
                clock.start_break(user).await.unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_status_none_without_records() {
        let (clock, _) = memory_clock();
        let report = clock.status(Uuid::new_v4()).await.unwrap();

        assert_eq!(report.status, AttendanceStatus::None);
        assert_eq!(report.message, "Not clocked in");
        assert!(report.record.is_none());
    }

    #[tokio::test]
    async fn test_every_state_action_pair() {
        use AttendanceStatus as S;

        for from in [S::None, S::Working, S::OnBreak] {
            for action in ClockAction::ALL {
                let (clock, _) = memory_clock();
                let user = Uuid::new_v4();
                drive_to(&clock, user, from).await;

                let result = clock.apply(user, action).await;
                let after = clock.status(user).await.unwrap().status;

                match action.transition(from) {
                    Some(next) => {
                        assert!(result.is_ok(), "{action} from {from} should succeed");
                        assert_eq!(after, next, "{action} from {from}");
                    }
                    None => {
                        assert!(
                            matches!(result, Err(ClockError::PreconditionFailed(a)) if a == action),
                            "{action} from {from} should be rejected"
                        );
                        assert_eq!(after, from, "rejected {action} must not change state");
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_round_trip_produces_one_ordered_record() {
        let (clock, store) = memory_clock();
        let user = Uuid::new_v4();
        let start = Utc::now();

        clock.apply_at(user, ClockAction::ClockIn, start).await.unwrap();
        clock
            .apply_at(user, ClockAction::BreakStart, start + Duration::minutes(120))
            .await
            .unwrap();
        clock
            .apply_at(user, ClockAction::BreakEnd, start + Duration::minutes(150))
            .await
            .unwrap();
        let closed = clock
            .apply_at(user, ClockAction::ClockOut, start + Duration::minutes(480))
            .await
            .unwrap();

        assert!(closed.clock_in.is_some());
        assert!(closed.break_start.is_some());
        assert!(closed.break_end.is_some());
        assert!(closed.clock_out.is_some());
        assert!(closed.is_well_ordered());

        assert_eq!(store.records().len(), 1);
        assert_eq!(clock.status(user).await.unwrap().status, AttendanceStatus::None);
    }

    #[tokio::test]
    async fn test_second_break_in_same_shift_rejected() {
        let (clock, _) = memory_clock();
        let user = Uuid::new_v4();

        clock.clock_in(user).await.unwrap();
        clock.start_break(user).await.unwrap();
        clock.end_break(user).await.unwrap();

        let report = clock.status(user).await.unwrap();
        assert_eq!(report.status, AttendanceStatus::Working);
        assert!(report.record.is_some());

        assert!(matches!(
            clock.start_break(user).await,
            Err(ClockError::PreconditionFailed(ClockAction::BreakStart))
        ));
    }

    #[tokio::test]
    async fn test_status_reports_open_record() {
        let (clock, _) = memory_clock();
        let user = Uuid::new_v4();

        let opened = clock.clock_in(user).await.unwrap();
        clock.start_break(user).await.unwrap();

        let report = clock.status(user).await.unwrap();
        assert_eq!(report.status, AttendanceStatus::OnBreak);
        assert_eq!(report.message, "On break");
        assert_eq!(report.record.unwrap().id, opened.id);
    }

    #[tokio::test]
    async fn test_concurrent_clock_in_admits_exactly_one() {
        let (clock, store) = memory_clock();
        let user = Uuid::new_v4();

        let attempts = (0..8).map(|_| clock.clock_in(user));
        let results = join_all(attempts).await;

        let admitted = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(ClockError::PreconditionFailed(ClockAction::ClockIn))))
            .count();

        assert_eq!(admitted, 1);
        assert_eq!(rejected, 7);
        assert_eq!(store.open_count(user), 1);
    }

    #[tokio::test]
    async fn test_interleavings_keep_one_open_record() {
        let (clock, store) = memory_clock();
        let user = Uuid::new_v4();

        // A fixed pseudo-random walk over the four actions.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..200 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let action = ClockAction::ALL[(seed % 4) as usize];
            let _ = clock.apply(user, action).await;

            assert!(store.open_count(user) <= 1);
            assert!(store.records().iter().all(AttendanceRecord::is_well_ordered));
        }
    }

    #[tokio::test]
    async fn test_users_do_not_interfere() {
        let (clock, _) = memory_clock();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        clock.clock_in(alice).await.unwrap();
        clock.clock_in(bob).await.unwrap();
        clock.clock_out(alice).await.unwrap();

        assert_eq!(clock.status(alice).await.unwrap().status, AttendanceStatus::None);
        assert_eq!(clock.status(bob).await.unwrap().status, AttendanceStatus::Working);
    }

    #[tokio::test]
    async fn test_records_limited_and_newest_first() {
        let (clock, _) = memory_clock();
        let user = Uuid::new_v4();
        let start = Utc::now();

        for shift in 0..(OWN_RECORDS_LIMIT + 5) {
            let at = start + Duration::hours(shift * 24);
            clock.apply_at(user, ClockAction::ClockIn, at).await.unwrap();
            clock
                .apply_at(user, ClockAction::ClockOut, at + Duration::hours(8))
                .await
                .unwrap();
        }

        let records = clock.records(user).await.unwrap();
        assert_eq!(records.len(), OWN_RECORDS_LIMIT as usize);
        assert!(records[0].clock_in > records[1].clock_in);

        let history = clock.history(user).await.unwrap();
        assert_eq!(history.len(), (OWN_RECORDS_LIMIT + 5) as usize);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let (clock, store) = memory_clock();
        store.set_unavailable(true);

        let result = clock.clock_in(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ClockError::Store(RepoError::DatabaseError(_)))));
    }

    #[tokio::test]
    async fn test_status_is_a_pure_read() {
        let mut store = MockStore::new();
        store.expect_latest_open().times(1).returning(|_| Ok(None));
        store.expect_open_shift().never();
        store.expect_start_break().never();
        store.expect_end_break().never();
        store.expect_close_shift().never();

        let clock = TimeClock::new(Arc::new(store));
        let report = clock.status(Uuid::new_v4()).await.unwrap();
        assert_eq!(report.status, AttendanceStatus::None);
    }

    #[tokio::test]
    async fn test_transition_issues_single_write_with_now() {
        let user = Uuid::new_v4();
        let now = Utc::now();

        let mut store = MockStore::new();
        store
            .expect_close_shift()
            .withf(move |u, at| *u == user && *at == now)
            .times(1)
            .returning(|_, _| Ok(None));
        store.expect_latest_open().never();

        let clock = TimeClock::new(Arc::new(store));
        let result = clock.apply_at(user, ClockAction::ClockOut, now).await;
        assert!(matches!(
            result,
            Err(ClockError::PreconditionFailed(ClockAction::ClockOut))
        ));
    }

    #[test]
    fn test_clock_debug_names_its_store() {
        let clock = TimeClock::new(Arc::new(MockStore::new()));
        assert!(format!("{clock:?}").contains("MockStore"));
    }

    #[tokio::test]
    async fn test_stale_clock_out_never_precedes_break() {
        let (clock, _) = memory_clock();
        let user = Uuid::new_v4();
        let start = Utc::now();

        clock.apply_at(user, ClockAction::ClockIn, start).await.unwrap();
        clock
            .apply_at(user, ClockAction::BreakStart, start + Duration::minutes(60))
            .await
            .unwrap();

        // A clock-out whose timestamp was taken before the break committed.
        let closed = clock
            .apply_at(user, ClockAction::ClockOut, start + Duration::minutes(30))
            .await
            .unwrap();

        assert_eq!(closed.clock_out, closed.break_start);
        assert!(closed.is_well_ordered());
        assert_eq!(clock.status(user).await.unwrap().status, AttendanceStatus::None);
    }

    #[tokio::test]
    async fn test_recent_with_users_uses_fixed_page() {
        let mut store = MockStore::new();
        store
            .expect_recent_with_users()
            .withf(|limit| *limit == ALL_RECORDS_LIMIT)
            .times(1)
            .returning(|_| Ok(vec![]));

        let clock = TimeClock::new(Arc::new(store));
        assert!(clock.recent_with_users().await.unwrap().is_empty());
    }
}
