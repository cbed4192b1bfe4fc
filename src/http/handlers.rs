//! Route handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use subtle::ConstantTimeEq;
use tracing::{error, info, instrument, warn};

use super::error::ApiError;
use super::AppState;
use crate::leads::{
    contact_notification, dispatch, education_notification, parse_address, quote_notification,
    womens_life_notification, ConfirmationRequest, ContactMessage, EducationLead, Notification, QuoteLead,
    SheetRow, SheetSubmission, WomensLifeLead,
};

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Accept an insurance quote request.
#[instrument(skip_all)]
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QuoteLead>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    ensure_notifiers(&state)?;
    let Json(lead) = body.map_err(invalid_body)?;

    let missing = lead.missing_fields();
    if !missing.is_empty() {
        warn!(?missing, "Quote lead rejected");
        return Err(ApiError::MissingFields(missing));
    }

    let notification = quote_notification(&lead, Utc::now());
    deliver(&state, notification, "Cotización procesada correctamente").await
}

/// Accept a contact form message.
#[instrument(skip_all)]
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ContactMessage>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    ensure_notifiers(&state)?;
    let Json(msg) = body.map_err(invalid_body)?;

    let missing = msg.missing_fields();
    if !missing.is_empty() {
        warn!(?missing, "Contact message rejected");
        return Err(ApiError::MissingFields(missing));
    }

    let notification = contact_notification(&msg, Utc::now());
    deliver(&state, notification, "Mensaje enviado correctamente").await
}

/// Accept a women's life insurance lead.
#[instrument(skip_all)]
pub async fn submit_womens_life(
    State(state): State<Arc<AppState>>,
    body: Result<Json<WomensLifeLead>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    ensure_notifiers(&state)?;
    let Json(lead) = body.map_err(invalid_body)?;

    let missing = lead.missing_fields();
    if !missing.is_empty() {
        warn!(?missing, "Women's life lead rejected");
        return Err(ApiError::MissingFields(missing));
    }

    let notification = womens_life_notification(&lead, Utc::now());
    deliver(&state, notification, "Lead Vida Mujer procesado correctamente").await
}

/// Accept an education savings lead.
#[instrument(skip_all)]
pub async fn submit_education(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EducationLead>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    ensure_notifiers(&state)?;
    let Json(lead) = body.map_err(invalid_body)?;

    let missing = lead.missing_fields();
    if !missing.is_empty() {
        warn!(?missing, "Education lead rejected");
        return Err(ApiError::MissingFields(missing));
    }

    let notification = education_notification(&lead, Utc::now());
    deliver(&state, notification, "Lead de Segubeca procesado correctamente").await
}

/// Record contact details as a spreadsheet row.
#[instrument(skip_all)]
pub async fn submit_sheet_row(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SheetSubmission>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Some(sheet) = &state.sheet else {
        error!("No spreadsheet configured");
        return Err(ApiError::NotConfigured);
    };
    let Json(submission) = body.map_err(invalid_body)?;

    let missing = submission.missing_fields();
    if !missing.is_empty() {
        warn!(?missing, "Sheet row rejected");
        return Err(ApiError::MissingFields(missing));
    }

    let row = SheetRow::new(&submission, Utc::now());
    match sheet.append(&row).await {
        Ok(written) => {
            info!(row = written, "Contact saved to spreadsheet");
            Ok(Json(json!({
                "success": true,
                "message": "Datos guardados en Google Sheet",
                "row": written,
            })))
        }
        Err(e) => {
            error!(error = %e, "Spreadsheet write failed");
            Err(ApiError::IntegrationFailed("Error interno del servidor al escribir en la hoja"))
        }
    }
}

/// Email the submitter a confirmation that their request was received.
#[instrument(skip_all)]
pub async fn send_confirmation(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ConfirmationRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Some(mailer) = &state.mailer else {
        error!("No SMTP relay configured");
        return Err(ApiError::NotConfigured);
    };
    let Json(request) = body.map_err(invalid_body)?;

    let Some(raw) = request.email else {
        return Err(ApiError::MissingFields(vec!["email"]));
    };
    let Some(address) = parse_address(&raw) else {
        warn!("Confirmation requested for malformed address");
        return Err(ApiError::InvalidEmail);
    };

    if let Err(e) = mailer.send_confirmation(&address).await {
        error!(error = %e, "Confirmation email failed");
        return Err(ApiError::IntegrationFailed("Error interno del servidor al enviar el email"));
    }

    info!(domain = address.domain(), "Confirmation email sent");
    Ok(Json(json!({
        "success": true,
        "message": "Email enviado correctamente",
    })))
}

/// Usage hint for the confirmation endpoint.
pub async fn confirmation_usage() -> Json<Value> {
    Json(json!({
        "message": "API para envío de emails de confirmación. Use método POST con { \"email\": \"usuario@ejemplo.com\" }",
        "endpoints": {
            "POST": "/api/send-email",
            "body": { "email": "string (requerido)" },
        },
    }))
}

fn ensure_notifiers(state: &AppState) -> Result<(), ApiError> {
    if state.notifiers.is_empty() {
        error!("No lead notifiers configured");
        return Err(ApiError::NotConfigured);
    }
    Ok(())
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    warn!(error = %rejection, "Malformed submission body");
    ApiError::InvalidBody(rejection.body_text())
}

async fn deliver(state: &AppState, notification: Notification, message: &str) -> Result<Json<Value>, ApiError> {
    let report = dispatch(&state.notifiers, &notification).await;

    if !report.primary_succeeded() {
        error!(lead_id = %notification.id, "Primary notifier failed, lead not acknowledged");
        return Err(ApiError::DeliveryFailed(report));
    }

    info!(lead_id = %notification.id, details = %report.details(), "Lead delivered");
    Ok(Json(json!({
        "success": true,
        "message": message,
        "leadId": notification.id,
        "details": report.details(),
    })))
}

/// Compare a presented secret without short-circuiting on the first
/// differing byte. An unset expected secret matches nothing.
fn secret_matches(expected: Option<&str>, given: Option<&str>) -> bool {
    match (expected, given) {
        (Some(expected), Some(given)) => expected.as_bytes().ct_eq(given.as_bytes()).into(),
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    secret: Option<String>,
}

/// Rate limiter diagnostics behind the shared secret.
pub async fn rate_limit_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, ApiError> {
    if !secret_matches(state.diagnostics_secret.as_deref(), query.secret.as_deref()) {
        warn!("Unauthorized rate limit stats request");
        return Err(ApiError::Unauthorized);
    }

    let stats = state.gate.limiter().stats();
    Ok(Json(json!({
        "success": true,
        "timestamp": Utc::now().to_rfc3339(),
        "rateLimitStats": stats,
    })))
}
