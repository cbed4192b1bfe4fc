//! Per-client quota record.

/// Where a client sits in its fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// No live window: never seen, swept, or expired.
    NoEntry,
    /// Window running with quota left.
    WindowOpen,
    /// Window running and the quota is used up.
    WindowFull,
}

/// Quota consumed by one client in its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Allowed actions counted in this window
    pub count: u32,
    /// Epoch milliseconds at which the window closes
    pub window_end: u64,
}

impl RateLimitEntry {
    /// Open a new window at `now` with the first action already counted.
    pub fn open(now: u64, window_ms: u64) -> Self {
        Self {
            count: 1,
            window_end: now.saturating_add(window_ms),
        }
    }

    /// A window is expired only once `now` is strictly past its end.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.window_end
    }

    /// Quota left under `max_requests`.
    pub fn remaining(&self, max_requests: u32) -> u32 {
        max_requests.saturating_sub(self.count)
    }

    /// Classify this entry at `now`.
    pub fn state(&self, now: u64, max_requests: u32) -> WindowState {
        if self.is_expired(now) {
            WindowState::NoEntry
        } else if self.count < max_requests {
            WindowState::WindowOpen
        } else {
            WindowState::WindowFull
        }
    }
}
