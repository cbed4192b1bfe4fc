//! Core fixed-window rate limiter.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::entry::{RateLimitEntry, WindowState};
use super::stats::{ClientStats, RateLimitStats};

/// Default window length.
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default number of allowed actions per window.
const DEFAULT_MAX_REQUESTS: u32 = 3;

/// Window length and quota enforced for every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    /// Length of one fixed window
    pub window: Duration,
    /// Allowed actions per client per window
    pub max_requests: u32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            max_requests: DEFAULT_MAX_REQUESTS,
        }
    }
}

impl LimitConfig {
    fn window_ms(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Outcome of a single [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Quota left in the window after this action
    pub remaining: u32,
    /// Epoch milliseconds at which the window closes
    pub window_end: u64,
    /// The configured ceiling
    pub limit: u32,
}

/// In-memory fixed-window rate limiter keyed by client identifier.
///
/// Windows start at a client's first action and reset wholesale once they
/// pass; this is not a sliding window, so a client may burst up to twice the
/// quota across a window edge.
///
/// The store is a `DashMap`: a check holds the shard lock for its key for the
/// whole read-modify-write, so concurrent checks for one client cannot both
/// take the last slot. Different clients never share a decision.
pub struct RateLimiter {
    /// Quota records indexed by client identifier
    store: DashMap<String, RateLimitEntry>,
    limits: LimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a rate limiter on the system clock.
    pub fn new(limits: LimitConfig) -> Self {
        Self::with_clock(limits, Arc::new(SystemClock))
    }

    /// Create a rate limiter reading time from `clock`.
    pub fn with_clock(limits: LimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: DashMap::new(),
            limits,
            clock,
        }
    }

    pub fn limits(&self) -> LimitConfig {
        self.limits
    }

    /// Current time according to the injected clock.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Count one action for `client_id` and decide whether it is allowed.
    pub fn check(&self, client_id: &str) -> RateLimitDecision {
        self.check_at(client_id, self.clock.now_millis())
    }

    /// [`check`](Self::check) at an explicit time.
    pub fn check_at(&self, client_id: &str, now: u64) -> RateLimitDecision {
        let max = self.limits.max_requests;
        let window_ms = self.limits.window_ms();

        let decision = match self.store.entry(client_id.to_string()) {
            Entry::Vacant(vacant) => {
                let entry = RateLimitEntry::open(now, window_ms);
                vacant.insert(entry);
                self.allowed(entry)
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_expired(now) {
                    *entry = RateLimitEntry::open(now, window_ms);
                    self.allowed(*entry)
                } else if entry.count < max {
                    entry.count += 1;
                    self.allowed(*entry)
                } else {
                    RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        window_end: entry.window_end,
                        limit: max,
                    }
                }
            }
        };

        trace!(
            client_id = %client_id,
            allowed = decision.allowed,
            remaining = decision.remaining,
            window_end = decision.window_end,
            "Checked rate limit"
        );

        decision
    }

    fn allowed(&self, entry: RateLimitEntry) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            remaining: entry.remaining(self.limits.max_requests),
            window_end: entry.window_end,
            limit: self.limits.max_requests,
        }
    }

    /// Where `client_id` currently sits in its window.
    pub fn state(&self, client_id: &str) -> WindowState {
        let now = self.clock.now_millis();
        self.store
            .get(client_id)
            .map(|entry| entry.state(now, self.limits.max_requests))
            .unwrap_or(WindowState::NoEntry)
    }

    /// Snapshot of the stored record for `client_id`, expired or not.
    pub fn entry(&self, client_id: &str) -> Option<RateLimitEntry> {
        self.store.get(client_id).map(|entry| *entry)
    }

    /// Remove every entry whose window has passed. Returns how many were
    /// removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.clock.now_millis())
    }

    /// [`sweep`](Self::sweep) at an explicit time.
    pub fn sweep_at(&self, now: u64) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.store.len());

        if removed > 0 {
            debug!(removed, remaining = self.store.len(), "Swept expired rate limit entries");
        }
        removed
    }

    /// Diagnostic view of every tracked client.
    pub fn stats(&self) -> RateLimitStats {
        let now = self.clock.now_millis();
        let max = self.limits.max_requests;

        let mut entries: Vec<ClientStats> = self
            .store
            .iter()
            .map(|item| ClientStats::new(item.key(), item.value(), max, now))
            .collect();
        entries.sort_by(|a, b| a.client_id.cmp(&b.client_id));

        RateLimitStats {
            total_clients: entries.len(),
            entries,
        }
    }

    /// Number of tracked clients, including expired entries not yet swept.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimitConfig::default())
    }
}
