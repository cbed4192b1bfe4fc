//! JSON error responses for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::leads::DispatchReport;

/// Failures a handler reports to the caller.
#[derive(Debug)]
pub enum ApiError {
    /// Body was not valid JSON for the expected form
    InvalidBody(String),
    /// Required form fields absent or blank
    MissingFields(Vec<&'static str>),
    /// No notification sink configured
    NotConfigured,
    /// The primary notifier did not acknowledge the lead
    DeliveryFailed(DispatchReport),
    /// Submitted email address is not deliverable
    InvalidEmail,
    /// A single-integration endpoint failed downstream
    IntegrationFailed(&'static str),
    /// Diagnostics secret absent or wrong
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidBody(reason) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": "Solicitud inválida", "error": reason }),
            ),
            ApiError::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "message": "Todos los campos obligatorios deben ser completados",
                    "missing": fields,
                }),
            ),
            ApiError::NotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "message": "Error de configuración del servidor" }),
            ),
            ApiError::DeliveryFailed(report) => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "success": false,
                    "message": "Error interno del servidor",
                    "details": report.details(),
                }),
            ),
            ApiError::InvalidEmail => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": "Formato de email inválido" }),
            ),
            ApiError::IntegrationFailed(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "message": message }),
            ),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })),
        };

        (status, Json(body)).into_response()
    }
}
