//! Fixed-window rate limiting and request admission.

mod client;
mod clock;
mod entry;
mod gate;
mod limiter;
mod stats;
mod sweeper;

pub use client::{ClientIdentifier, Extraction, HeaderRule, FALLBACK_CLIENT_ID};
pub use clock::{to_datetime, Clock, ManualClock, SystemClock};
pub use entry::{RateLimitEntry, WindowState};
pub use gate::{enforce, RateLimitGate, Rejection};
pub use limiter::{LimitConfig, RateLimitDecision, RateLimiter};
pub use stats::{format_reset, ClientStats, RateLimitStats};
pub use sweeper::SweeperHandle;
