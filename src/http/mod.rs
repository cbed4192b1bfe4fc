//! HTTP surface: lead submission routes behind the rate limit gate, plus
//! health and diagnostics.

mod error;
mod handlers;
mod server;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::leads::{ConfirmationSender, LeadNotifier, LeadSheet};
use crate::ratelimit::{enforce, RateLimitGate};

pub use error::ApiError;
pub use server::HttpServer;

/// Shared request-handling context.
pub struct AppState {
    pub gate: Arc<RateLimitGate>,
    /// Lead sinks, primary first
    pub notifiers: Vec<Arc<dyn LeadNotifier>>,
    /// Submitter confirmation emails
    pub mailer: Option<Arc<dyn ConfirmationSender>>,
    /// Contact spreadsheet
    pub sheet: Option<Arc<dyn LeadSheet>>,
    pub diagnostics_secret: Option<String>,
}

/// Build the application router. Only the submission routes are gated.
pub fn router(state: Arc<AppState>) -> Router {
    let submissions = Router::new()
        .route("/api/lead", post(handlers::submit_lead))
        .route("/api/contact", post(handlers::submit_contact))
        .route("/api/vida-mujer-lead", post(handlers::submit_womens_life))
        .route("/api/segubeca-contact", post(handlers::submit_education))
        .route("/api/sendToSheet", post(handlers::submit_sheet_row))
        .route("/api/send-email", post(handlers::send_confirmation))
        .route_layer(middleware::from_fn_with_state(state.gate.clone(), enforce));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/rate-limit-stats", get(handlers::rate_limit_stats))
        .route("/api/send-email", get(handlers::confirmation_usage))
        .merge(submissions)
        .with_state(state)
}
