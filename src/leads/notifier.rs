//! Lead notification sinks and best-effort fan-out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::email::SmtpMailer;
use crate::config::{LeadgateConfig, TelegramConfig};
use crate::error::{LeadgateError, Result};

/// Inline link shown under a bot message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkButton {
    pub text: String,
    pub url: String,
}

/// A rendered lead announcement, ready for any sink.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Reference returned to the submitter and logged by every sink
    pub id: Uuid,
    /// One-line summary, used as the email subject
    pub subject: String,
    /// Markdown body
    pub text: String,
    pub button: Option<LinkButton>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            text: text.into(),
            button: None,
        }
    }

    pub fn with_button(mut self, button: LinkButton) -> Self {
        self.button = Some(button);
        self
    }

    /// The body with bold markers dropped and escapes resolved, for sinks
    /// that do not render Markdown.
    pub fn plain_text(&self) -> String {
        let mut plain = String::with_capacity(self.text.len());
        let mut chars = self.text.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => plain.extend(chars.next()),
                '*' => {}
                _ => plain.push(c),
            }
        }
        plain
    }
}

/// A destination for lead announcements.
#[async_trait]
pub trait LeadNotifier: Send + Sync {
    /// Short name used in logs and the response `details`.
    fn name(&self) -> &'static str;

    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Posts announcements through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: reqwest::Client,
    /// Full method URL; embeds the bot token, never log it
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
        })
    }

    /// `sendMessage` request body.
    pub fn payload(&self, notification: &Notification) -> Value {
        let mut body = json!({
            "chat_id": self.chat_id,
            "text": notification.text,
            "parse_mode": "Markdown",
        });
        if let Some(button) = &notification.button {
            body["reply_markup"] = json!({ "inline_keyboard": [[button]] });
        }
        body
    }
}

#[async_trait]
impl LeadNotifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.payload(notification))
            .send()
            .await
            .map_err(|e| LeadgateError::HttpClient(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadgateError::Notify {
                notifier: self.name(),
                reason: format!("status {}: {}", status, body),
            });
        }

        debug!(lead_id = %notification.id, "Telegram accepted lead announcement");
        Ok(())
    }
}

/// Build every notifier enabled in the configuration, primary first. The
/// mailer joins as a secondary sink when it has a team recipient.
pub fn notifiers_from_config(
    config: &LeadgateConfig,
    mailer: Option<&Arc<SmtpMailer>>,
) -> Result<Vec<Arc<dyn LeadNotifier>>> {
    let mut notifiers: Vec<Arc<dyn LeadNotifier>> = Vec::new();

    if let Some(telegram) = &config.telegram {
        notifiers.push(Arc::new(TelegramNotifier::new(telegram)?));
    }
    if let Some(mailer) = mailer.filter(|m| m.notifies_team()) {
        notifiers.push(Arc::clone(mailer) as Arc<dyn LeadNotifier>);
    }

    info!(
        notifiers = ?notifiers.iter().map(|n| n.name()).collect::<Vec<_>>(),
        "Lead notifiers configured"
    );
    Ok(notifiers)
}

/// Outcome of one sink during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub notifier: &'static str,
    pub delivered: bool,
}

/// Per-sink outcomes of [`dispatch`], in notifier order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    /// The first notifier is the acknowledgment path.
    pub fn primary_succeeded(&self) -> bool {
        self.deliveries.first().is_some_and(|d| d.delivered)
    }

    /// `{ "<notifier>": <delivered> }`
    pub fn details(&self) -> Value {
        let map: Map<String, Value> = self
            .deliveries
            .iter()
            .map(|d| (d.notifier.to_string(), Value::Bool(d.delivered)))
            .collect();
        Value::Object(map)
    }
}

/// Send `notification` to every notifier concurrently. A failing sink is
/// logged and recorded without affecting the others.
pub async fn dispatch(notifiers: &[Arc<dyn LeadNotifier>], notification: &Notification) -> DispatchReport {
    let outcomes = join_all(notifiers.iter().map(|notifier| async move {
        let outcome = notifier.notify(notification).await;
        (notifier.name(), outcome)
    }))
    .await;

    let deliveries = outcomes
        .into_iter()
        .map(|(name, outcome)| {
            if let Err(e) = &outcome {
                warn!(notifier = name, lead_id = %notification.id, error = %e, "Lead notification failed");
            }
            Delivery {
                notifier: name,
                delivered: outcome.is_ok(),
            }
        })
        .collect();

    DispatchReport { deliveries }
}
