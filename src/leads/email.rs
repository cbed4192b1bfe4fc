//! SMTP delivery: team copies of each lead and submitter confirmations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use super::notifier::{LeadNotifier, Notification};
use crate::config::{LeadgateConfig, SmtpConfig};
use crate::error::{LeadgateError, Result};

const CONFIRMATION_HTML: &str = include_str!("confirmation.html");

/// Sends the "we received your request" email to a submitter.
#[async_trait]
pub trait ConfirmationSender: Send + Sync {
    async fn send_confirmation(&self, to: &Address) -> Result<()>;
}

/// Parse a submitted address, requiring a dotted domain.
pub fn parse_address(raw: &str) -> Option<Address> {
    let address: Address = raw.trim().parse().ok()?;
    let domain = address.domain();
    let dotted = domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty());
    dotted.then_some(address)
}

fn configured_address(field: &str, raw: &str) -> Result<Address> {
    raw.trim()
        .parse()
        .map_err(|e| LeadgateError::Config(format!("smtp.{}: {}", field, e)))
}

/// Mail sender over an authenticated STARTTLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    notify_to: Option<Mailbox>,
    confirmation_subject: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = Mailbox::new(Some(config.from_name.clone()), configured_address("from", &config.from)?);
        let notify_to = config
            .notify_to
            .as_deref()
            .map(|raw| configured_address("notify_to", raw).map(|addr| Mailbox::new(None, addr)))
            .transpose()?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self {
            transport,
            from,
            notify_to,
            confirmation_subject: config.confirmation_subject.clone(),
        })
    }

    /// Whether lead copies go to a team mailbox.
    pub fn notifies_team(&self) -> bool {
        self.notify_to.is_some()
    }

    /// Plain-text copy of a lead announcement for the team mailbox.
    pub fn lead_message(&self, notification: &Notification) -> Result<Message> {
        let to = self
            .notify_to
            .clone()
            .ok_or_else(|| LeadgateError::Config("smtp.notify_to is not set".to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(lead_body(notification))?;
        Ok(message)
    }

    /// HTML confirmation for a submitter.
    pub fn confirmation_message(&self, to: &Address) -> Result<Message> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, to.clone()))
            .subject(self.confirmation_subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(CONFIRMATION_HTML.to_string())?;
        Ok(message)
    }
}

/// Email body for a lead copy: the announcement, its WhatsApp link and the
/// lead reference.
pub fn lead_body(notification: &Notification) -> String {
    let mut body = notification.plain_text();
    if let Some(button) = &notification.button {
        body.push_str(&format!("\n\n{}: {}", button.text, button.url));
    }
    body.push_str(&format!("\n\nReferencia: {}", notification.id));
    body
}

#[async_trait]
impl LeadNotifier for SmtpMailer {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        let message = self.lead_message(notification)?;
        self.transport.send(message).await?;
        debug!(lead_id = %notification.id, "Team mailbox accepted lead copy");
        Ok(())
    }
}

#[async_trait]
impl ConfirmationSender for SmtpMailer {
    async fn send_confirmation(&self, to: &Address) -> Result<()> {
        let message = self.confirmation_message(to)?;
        self.transport.send(message).await?;
        debug!(domain = to.domain(), "Confirmation email sent");
        Ok(())
    }
}

/// Build the mailer when an `smtp` section is configured.
pub fn mailer_from_config(config: &LeadgateConfig) -> Result<Option<Arc<SmtpMailer>>> {
    let Some(smtp) = &config.smtp else {
        return Ok(None);
    };
    let mailer = SmtpMailer::new(smtp)?;
    info!(
        host = %smtp.host,
        port = smtp.port,
        team_copies = mailer.notifies_team(),
        "SMTP mailer configured"
    );
    Ok(Some(Arc::new(mailer)))
}
