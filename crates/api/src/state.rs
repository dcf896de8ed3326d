use axum::extract::FromRef;
use common::settings::Settings;
use repos::Repo;
use std::sync::Arc;

use crate::clock::TimeClock;

#[derive(FromRef, Debug, Clone)]
pub struct AppState {
    pub repo: Repo,
    pub clock: TimeClock,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// State backed entirely by PostgreSQL.
    pub fn new(repo: Repo, settings: Arc<Settings>) -> Self {
        let clock = TimeClock::new(Arc::new(repo.clone()));
        Self {
            repo,
            clock,
            settings,
        }
    }
}
