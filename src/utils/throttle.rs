use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use axum::http::HeaderMap;

/// Decides whether a client may submit another comment right now.
///
/// Implementations backed by a shared key-value store with expiry can be
/// dropped in here to enforce the window across several server instances.
#[async_trait]
pub trait SubmissionThrottle: Send + Sync {
    /// Returns `true` and records the attempt when the client is allowed.
    /// A rejected attempt does not extend the client's window.
    async fn try_acquire(&self, client: &str) -> bool;
}

/// Tracked clients below which expired entries are left alone.
const DEFAULT_SWEEP_THRESHOLD: usize = 1024;

/// Process-local fixed-window throttle: one accepted submission per client
/// per `window`.
///
/// Expired entries are swept only when the table outgrows its threshold,
/// and the threshold then doubles past the live size, so sweeping stays
/// amortized constant per submission.
pub struct InMemoryThrottle {
    window: Duration,
    min_sweep_threshold: usize,
    clients: Mutex<ClientTable>,
}

struct ClientTable {
    last_accepted: HashMap<String, Instant>,
    sweep_at: usize,
}

impl InMemoryThrottle {
    pub fn new(window: Duration) -> Self {
        Self::with_sweep_threshold(window, DEFAULT_SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(window: Duration, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            window,
            min_sweep_threshold: threshold,
            clients: Mutex::new(ClientTable {
                last_accepted: HashMap::new(),
                sweep_at: threshold,
            }),
        }
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }

        let mut clients = match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(&last) = clients.last_accepted.get(client) {
            if now.duration_since(last) < self.window {
                return false;
            }
        }

        clients.last_accepted.insert(client.to_string(), now);

        if clients.last_accepted.len() >= clients.sweep_at {
            let window = self.window;
            clients
                .last_accepted
                .retain(|_, &mut last| now.duration_since(last) < window);
            clients.sweep_at = (clients.last_accepted.len() * 2).max(self.min_sweep_threshold);
        }
        true
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.clients
            .lock()
            .map(|t| t.last_accepted.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SubmissionThrottle for InMemoryThrottle {
    async fn try_acquire(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }
}

/// Identifies the submitting client by the first `X-Forwarded-For` hop.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
