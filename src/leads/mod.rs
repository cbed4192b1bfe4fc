//! Lead submissions: payloads, rendering, and delivery to notification
//! sinks, the team mailbox and the contact spreadsheet.

mod email;
mod format;
mod model;
mod notifier;
mod sheets;

pub use email::{lead_body, mailer_from_config, parse_address, ConfirmationSender, SmtpMailer};
pub use format::{
    clean_phone, contact_notification, education_notification, escape_markdown, format_local_date,
    quote_notification, whatsapp_link, womens_life_notification,
};
pub use model::{ConfirmationRequest, ContactMessage, EducationLead, QuoteLead, SheetSubmission, WomensLifeLead};
pub use notifier::{
    dispatch, notifiers_from_config, Delivery, DispatchReport, LeadNotifier, LinkButton, Notification,
    TelegramNotifier,
};
pub use sheets::{first_empty_row, sheet_from_config, values_url, GoogleSheets, LeadSheet, SheetRow};

#[cfg(test)]
pub(crate) use email::tests::FakeMailer;
#[cfg(test)]
pub(crate) use notifier::tests::FakeNotifier;
#[cfg(test)]
pub(crate) use sheets::tests::FakeSheet;
