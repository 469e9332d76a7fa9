//! Per-client sliding-window rate limiter.
//!
//! Each client key owns an ordered queue of admission timestamps inside a
//! [`DashMap`] shard.  The prune-check-append sequence runs while the shard
//! entry is held, so concurrent requests from one client cannot over-admit
//! and unrelated clients only contend when they hash to the same shard.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Minimum spacing between two rejection warnings for the same client.
const WARNING_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct ClientWindow {
    /// Admission times inside the trailing window, oldest first.
    hits: VecDeque<Instant>,
    last_warning: Option<Instant>,
}

impl ClientWindow {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.hits.front() {
            if now.duration_since(oldest) < window {
                break;
            }
            self.hits.pop_front();
        }
    }
}

/// Outcome of [`SlidingWindowLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request admitted; `remaining` more fit in the current window.
    Admitted { remaining: u32 },
    /// Quota exhausted.  `warn` is set at most once per minute per client.
    Rejected { warn: bool },
}

/// Sliding-window limiter keyed by client address.
pub struct SlidingWindowLimiter {
    clients: DashMap<String, ClientWindow>,
    max_requests: u32,
    window: Duration,
}

impl SlidingWindowLimiter {
    /// Admit at most `max_requests` per client in any trailing `window`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request from `client_key` and decide whether to admit it.
    pub fn check(&self, client_key: &str) -> Admission {
        let now = Instant::now();
        let mut entry = self.clients.entry(client_key.to_string()).or_default();
        entry.prune(now, self.window);

        let used = u32::try_from(entry.hits.len()).unwrap_or(u32::MAX);
        if used >= self.max_requests {
            let warn = entry
                .last_warning
                .is_none_or(|last| now.duration_since(last) >= WARNING_INTERVAL);
            if warn {
                entry.last_warning = Some(now);
            }
            return Admission::Rejected { warn };
        }

        entry.hits.push_back(now);
        Admission::Admitted {
            remaining: self.max_requests - used - 1,
        }
    }

    /// Drop clients with no admission inside the window.  Returns the number
    /// of entries removed.
    pub fn purge_stale(&self) -> usize {
        let now = Instant::now();
        let before = self.clients.len();
        self.clients.retain(|_, state| {
            state
                .hits
                .back()
                .is_some_and(|newest| now.duration_since(*newest) < self.window)
        });
        before.saturating_sub(self.clients.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Run [`purge_stale`](Self::purge_stale) once per window until the
    /// returned handle is aborted.
    pub fn spawn_reaper(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.window);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.purge_stale();
                if removed > 0 {
                    debug!(
                        removed,
                        tracked = self.tracked_clients(),
                        "evicted idle rate-limit entries"
                    );
                }
            }
        })
    }
}
