//! Read-only diagnostics over the limiter store.

use chrono::SecondsFormat;
use serde::Serialize;

use super::clock::to_datetime;
use super::entry::RateLimitEntry;

/// Snapshot of every tracked client.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStats {
    #[serde(rename = "totalIPs")]
    pub total_clients: usize,
    pub entries: Vec<ClientStats>,
}

/// Quota position of one client at the time of the snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStats {
    #[serde(rename = "ip")]
    pub client_id: String,
    pub count: u32,
    pub remaining: u32,
    /// ISO-8601 end of the window
    pub reset_time: String,
    /// Window already passed but the entry has not been swept yet
    pub expired: bool,
}

impl ClientStats {
    pub(crate) fn new(client_id: &str, entry: &RateLimitEntry, max_requests: u32, now: u64) -> Self {
        Self {
            client_id: client_id.to_string(),
            count: entry.count,
            remaining: entry.remaining(max_requests),
            reset_time: format_reset(entry.window_end),
            expired: entry.is_expired(now),
        }
    }
}

/// Render a window end the way `X-RateLimit-Reset` carries it.
pub fn format_reset(window_end: u64) -> String {
    to_datetime(window_end).to_rfc3339_opts(SecondsFormat::Millis, true)
}
