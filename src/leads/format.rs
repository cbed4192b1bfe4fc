//! Bot message and WhatsApp deep-link rendering.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;

use super::model::{ContactMessage, EducationLead, QuoteLead, WomensLifeLead};
use super::notifier::{LinkButton, Notification};

const WHATSAPP_BASE: &str = "https://wa.me/";
/// Country code prepended to local numbers.
const WHATSAPP_COUNTRY_CODE: &str = "+52";
/// Shortest digit string treated as a dialable number.
const MIN_PHONE_DIGITS: usize = 10;

/// Mexico City has been fixed at UTC-6 since 2022.
const MEXICO_CITY_UTC_OFFSET_HOURS: i64 = -6;

/// Characters left as-is in a URI component; spaces become `%20`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'(')
    .remove(b')');

/// Characters with meaning in Telegram's legacy Markdown.
const MARKDOWN_SPECIAL: [char; 4] = ['_', '*', '`', '['];

const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

fn or_default<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value.as_deref().unwrap_or(fallback)
}

/// A submitted value ready to interpolate into Markdown.
fn field(value: &Option<String>, fallback: &str) -> String {
    escape_markdown(or_default(value, fallback))
}

/// Backslash-escape the legacy Markdown entity characters so submitted text
/// renders literally.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render a timestamp in Mexico City local time, long Spanish form.
pub fn format_local_date(at: DateTime<Utc>) -> String {
    let local = at.naive_utc() + Duration::hours(MEXICO_CITY_UTC_OFFSET_HOURS);
    format!(
        "{} de {} de {}, {:02}:{:02}",
        local.day(),
        MONTHS_ES[local.month0() as usize],
        local.year(),
        local.hour(),
        local.minute()
    )
}

/// Digits of a phone number with all formatting stripped.
pub fn clean_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Link opening a WhatsApp chat prefilled with `message`; addressed to the
/// client when the phone has enough digits, generic otherwise.
pub fn whatsapp_link(phone: Option<&str>, message: &str) -> Option<(Url, bool)> {
    let digits = phone.map(clean_phone).unwrap_or_default();
    let direct = digits.len() >= MIN_PHONE_DIGITS;

    let base = if direct {
        format!("{}{}{}", WHATSAPP_BASE, WHATSAPP_COUNTRY_CODE, digits)
    } else {
        WHATSAPP_BASE.to_string()
    };

    let mut url = Url::parse(&base).ok()?;
    let text = utf8_percent_encode(message, URI_COMPONENT).to_string();
    url.set_query(Some(&format!("text={}", text)));
    Some((url, direct))
}

/// Attach a WhatsApp button addressed to `phone`, labelled with the client
/// name when the chat is direct.
fn with_whatsapp_button(notification: Notification, phone: Option<&str>, name: &str, greeting: &str) -> Notification {
    let Some((url, direct)) = whatsapp_link(phone, greeting) else {
        return notification;
    };

    let label = if direct {
        format!("💬 Contactar a {name} por WhatsApp")
    } else {
        "💬 Contactar por WhatsApp".to_string()
    };
    notification.with_button(LinkButton {
        text: label,
        url: url.to_string(),
    })
}

/// Announcement for a quote request, with a WhatsApp button.
pub fn quote_notification(lead: &QuoteLead, at: DateTime<Utc>) -> Notification {
    let name = or_default(&lead.name, "");
    let insurance_type = or_default(&lead.insurance_type, "");

    let text = format!(
        "🆕 *NUEVA COTIZACIÓN - ASESORES SEGUROS MONTERREY*\n\
         \n\
         👤 *Cliente:* {client}\n\
         📧 *Email:* {email}\n\
         📱 *Teléfono:* {phone}\n\
         \n\
         🎯 *Información de Cotización:*\n\
         • *Edad:* {age}\n\
         • *Tipo de Seguro:* {kind}\n\
         💰 *Rango de Presupuesto:* {budget}\n\
         \n\
         💬 *Mensaje adicional:*\n\
         {message}\n\
         \n\
         📊 *Información de Campaign:*\n\
         • *Fuente:* {source}\n\
         • *Campaña:* {campaign}\n\
         \n\
         ⏰ *Fecha:* {date}",
        client = escape_markdown(name),
        email = field(&lead.email, ""),
        phone = field(&lead.phone, ""),
        age = field(&lead.age, ""),
        kind = escape_markdown(insurance_type),
        budget = field(&lead.budget_range, "No especificado"),
        message = field(&lead.message, "Sin mensaje adicional"),
        source = field(&lead.source, "Landing Asesores Monterrey NYL"),
        campaign = field(&lead.campaign, "SEM Google Ads - Asesores Seguros Monterrey"),
        date = format_local_date(at),
    );

    let greeting = format!(
        "Hola {name} 👋\n\n\
         Vi que solicitaste una cotización de {}.\n\n\
         ¿Te parece si platicamos sobre tus opciones de seguros? 😊",
        insurance_type.to_lowercase()
    );
    let notification = Notification::new(format!("Nueva cotización: {name}"), text);
    with_whatsapp_button(notification, lead.phone.as_deref(), name, &greeting)
}

/// Announcement for a women's life insurance lead, with a WhatsApp button.
pub fn womens_life_notification(lead: &WomensLifeLead, at: DateTime<Utc>) -> Notification {
    let name = or_default(&lead.name, "");

    let text = format!(
        "👩 *NUEVO LEAD - VIDA MUJER* 💫\n\
         \n\
         👤 *Cliente:* {client}\n\
         📧 *Email:* {email}\n\
         📱 *Teléfono:* {phone}\n\
         🏙️ *Ciudad:* {city}\n\
         \n\
         🎯 *Perfil de Cliente:*\n\
         • *Edad:* {age}\n\
         • *Preferencia de contacto:* {contact}\n\
         \n\
         💭 *Qué quiere proteger:*\n\
         {notes}\n\
         \n\
         📊 *Información de Campaign:*\n\
         • *Fuente:* {source}\n\
         • *Campaña:* {campaign}\n\
         \n\
         ⏰ *Fecha:* {date}",
        client = escape_markdown(name),
        email = field(&lead.email, ""),
        phone = field(&lead.phone, ""),
        city = field(&lead.city, "No especificada"),
        age = field(&lead.age, ""),
        contact = field(&lead.contact, "WhatsApp (Preferido)"),
        notes = field(&lead.notes, "No especificado"),
        source = field(&lead.source, "Vida Mujer Landing"),
        campaign = field(&lead.campaign, "SEM Vida Mujer"),
        date = format_local_date(at),
    );

    let greeting = format!(
        "Hola {name} 👋\n\n\
         Vi que estás interesada en el seguro Vida Mujer 💫\n\n\
         Como asesora especializada en protección para mujeres, me encantaría platicar contigo \
         sobre las opciones que mejor se adapten a tus necesidades.\n\n\
         ¿Te parece si coordinamos una llamada? 😊"
    );
    let notification = Notification::new(format!("Nuevo lead Vida Mujer: {name}"), text);
    with_whatsapp_button(notification, lead.phone.as_deref(), name, &greeting)
}

/// Announcement for an education savings lead, with a WhatsApp button.
pub fn education_notification(lead: &EducationLead, at: DateTime<Utc>) -> Notification {
    let parent = or_default(&lead.parent_name, "");
    let child = or_default(&lead.child_name, "");

    let text = format!(
        "🎓 *NUEVO LEAD - SEGUBECA (Seguros Educativos)*\n\
         \n\
         👨‍👩‍👧‍👦 *Información Familiar:*\n\
         • *Padre/Madre:* {parent_md} ({parent_age} años)\n\
         • *Hijo/a:* {child_md} ({child_age} años)\n\
         \n\
         💰 *Capacidad de Ahorro:*\n\
         • *Monto mensual deseado:* {savings}\n\
         \n\
         📧 *Contacto:*\n\
         • *Email:* {email}\n\
         • *WhatsApp:* {whatsapp}\n\
         \n\
         🌐 *Información de Campaign:*\n\
         • *Fuente:* {source}\n\
         • *Campaña:* {campaign}\n\
         \n\
         ⏰ *Fecha:* {date}",
        parent_md = escape_markdown(parent),
        parent_age = field(&lead.parent_age, "?"),
        child_md = escape_markdown(child),
        child_age = field(&lead.child_age, "?"),
        savings = field(&lead.monthly_savings, "No especificado"),
        email = field(&lead.email, ""),
        whatsapp = field(&lead.whatsapp, ""),
        source = field(&lead.source, "Segubeca Landing"),
        campaign = field(&lead.campaign, "Seguros Educativos"),
        date = format_local_date(at),
    );

    let greeting = format!(
        "Hola {parent} 👋\n\n\
         Vi que estás interesado/a en asegurar el futuro educativo de {child}.\n\n\
         ¿Te parece si platicamos sobre las opciones de Segubeca? 🎓😊"
    );
    let notification = Notification::new(format!("Nuevo lead Segubeca: {parent}"), text);
    with_whatsapp_button(notification, lead.whatsapp.as_deref(), parent, &greeting)
}

/// Announcement for a contact form message.
pub fn contact_notification(msg: &ContactMessage, at: DateTime<Utc>) -> Notification {
    let name = or_default(&msg.name, "");
    let text = format!(
        "🆕 *Nuevo mensaje de contacto*\n\
         \n\
         👤 *Nombre:* {client}\n\
         📧 *Email:* {email}\n\
         📱 *Teléfono:* {phone}\n\
         \n\
         💬 *Mensaje:*\n\
         {message}\n\
         \n\
         ⏰ *Fecha:* {date}",
        client = escape_markdown(name),
        email = field(&msg.email, ""),
        phone = field(&msg.phone, "No proporcionado"),
        message = field(&msg.message, ""),
        date = format_local_date(at),
    );
    Notification::new(format!("Nuevo mensaje de contacto: {name}"), text)
}
