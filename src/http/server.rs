//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use super::{router, AppState};
use crate::error::{LeadgateError, Result};

/// HTTP server for the lead submission API.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        Self { addr, state }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server stops accepting connections when `signal` resolves and
    /// returns once in-flight requests have finished.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind HTTP listener");
            LeadgateError::Io(e)
        })?;

        info!(addr = %self.addr, "Starting HTTP server");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                LeadgateError::Io(e)
            })
    }
}
