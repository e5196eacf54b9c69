use std::{sync::Arc, time::Duration};

use crate::config::Config;
use crate::utils::throttle::{InMemoryThrottle, SubmissionThrottle};
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub throttle: Arc<dyn SubmissionThrottle>,
}

impl AppState {
    /// Builds the state with the in-process submission throttle.
    pub fn new(pool: PgPool, config: Config) -> Self {
        let throttle = Arc::new(InMemoryThrottle::new(Duration::from_secs(
            config.comment_rate_limit_secs,
        )));
        Self {
            pool,
            config,
            throttle,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn SubmissionThrottle> {
    fn from_ref(state: &AppState) -> Self {
        state.throttle.clone()
    }
}
