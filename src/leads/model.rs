//! Form submission payloads.

use serde::{Deserialize, Deserializer, Serialize};

/// Accept strings, numbers, or booleans; blank values count as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
    }

    let value = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Number(n)) => n.to_string(),
        Some(Raw::Flag(b)) => b.to_string(),
        None => return Ok(None),
    };
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

fn require(missing: &mut Vec<&'static str>, field: &'static str, value: &Option<String>) {
    if value.is_none() {
        missing.push(field);
    }
}

/// Insurance quote request from the landing page form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLead {
    #[serde(default, alias = "nombre", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, alias = "telefono", deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, alias = "edad", deserialize_with = "lenient_string")]
    pub age: Option<String>,
    #[serde(default, alias = "tipoSeguro", deserialize_with = "lenient_string")]
    pub insurance_type: Option<String>,
    #[serde(default, alias = "rangoPresupuesto", deserialize_with = "lenient_string")]
    pub budget_range: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub campaign: Option<String>,
}

impl QuoteLead {
    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        require(&mut missing, "name", &self.name);
        require(&mut missing, "email", &self.email);
        require(&mut missing, "phone", &self.phone);
        require(&mut missing, "age", &self.age);
        require(&mut missing, "insuranceType", &self.insurance_type);
        missing
    }
}

/// General contact form message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactMessage {
    #[serde(default, alias = "nombre", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, alias = "telefono", deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
}

impl ContactMessage {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        require(&mut missing, "name", &self.name);
        require(&mut missing, "email", &self.email);
        require(&mut missing, "message", &self.message);
        missing
    }
}

/// Lead from the women's life insurance landing page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WomensLifeLead {
    #[serde(default, alias = "nombre", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, alias = "telefono", deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, alias = "ciudad", deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(default, alias = "edad", deserialize_with = "lenient_string")]
    pub age: Option<String>,
    /// Preferred contact channel
    #[serde(default, deserialize_with = "lenient_string")]
    pub contact: Option<String>,
    /// What the client wants to protect
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub campaign: Option<String>,
}

impl WomensLifeLead {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        require(&mut missing, "name", &self.name);
        require(&mut missing, "email", &self.email);
        require(&mut missing, "phone", &self.phone);
        require(&mut missing, "age", &self.age);
        missing
    }
}

/// Education savings plan lead: a parent saving for a child.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationLead {
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub child_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_age: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub child_age: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub monthly_savings: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub whatsapp: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub campaign: Option<String>,
}

impl EducationLead {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        require(&mut missing, "parentName", &self.parent_name);
        require(&mut missing, "childName", &self.child_name);
        require(&mut missing, "email", &self.email);
        require(&mut missing, "whatsapp", &self.whatsapp);
        missing
    }
}

/// Contact details recorded as a spreadsheet row. A `message` field may be
/// sent by the form but is not stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetSubmission {
    #[serde(default, alias = "nombre", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, alias = "telefono", deserialize_with = "lenient_string")]
    pub phone: Option<String>,
}

impl SheetSubmission {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        require(&mut missing, "name", &self.name);
        require(&mut missing, "email", &self.email);
        missing
    }
}

/// Request for a confirmation email to the submitter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_accepts_spanish_form_names() {
        let lead: QuoteLead = serde_json::from_value(json!({
            "nombre": "Ana",
            "email": "ana@example.com",
            "telefono": "81 1234 5678",
            "edad": 34,
            "tipoSeguro": "Gastos Médicos",
            "rangoPresupuesto": "",
        }))
        .unwrap();

        assert_eq!(lead.name.as_deref(), Some("Ana"));
        assert_eq!(lead.age.as_deref(), Some("34"));
        assert_eq!(lead.insurance_type.as_deref(), Some("Gastos Médicos"));
        assert!(lead.budget_range.is_none());
        assert!(lead.missing_fields().is_empty());
    }

    #[test]
    fn test_quote_reports_missing_fields() {
        let lead: QuoteLead = serde_json::from_value(json!({
            "name": "Ana",
            "email": "   ",
            "insuranceType": "Vida",
        }))
        .unwrap();

        assert_eq!(lead.missing_fields(), vec!["email", "phone", "age"]);
    }

    #[test]
    fn test_contact_phone_is_optional() {
        let msg: ContactMessage = serde_json::from_value(json!({
            "name": "Luis",
            "email": "luis@example.com",
            "message": "Hola",
        }))
        .unwrap();

        assert!(msg.missing_fields().is_empty());
        assert!(msg.phone.is_none());

        let msg: ContactMessage = serde_json::from_value(json!({ "name": "Luis" })).unwrap();
        assert_eq!(msg.missing_fields(), vec!["email", "message"]);
    }

    #[test]
    fn test_womens_life_lead_required_fields() {
        let lead: WomensLifeLead = serde_json::from_value(json!({
            "name": "Marta",
            "email": "marta@example.com",
            "ciudad": "Monterrey",
            "notes": "A mis hijas",
        }))
        .unwrap();

        assert_eq!(lead.city.as_deref(), Some("Monterrey"));
        assert_eq!(lead.missing_fields(), vec!["phone", "age"]);
    }

    #[test]
    fn test_education_lead_uses_camel_case() {
        let lead: EducationLead = serde_json::from_value(json!({
            "parentName": "Jorge",
            "childName": "Sofía",
            "parentAge": 38,
            "childAge": 4,
            "monthlySavings": "$2,000",
            "email": "jorge@example.com",
        }))
        .unwrap();

        assert_eq!(lead.child_age.as_deref(), Some("4"));
        assert_eq!(lead.monthly_savings.as_deref(), Some("$2,000"));
        assert_eq!(lead.missing_fields(), vec!["whatsapp"]);
    }

    #[test]
    fn test_sheet_submission_ignores_message() {
        let row: SheetSubmission = serde_json::from_value(json!({
            "name": "Luis",
            "email": "luis@example.com",
            "message": "no se guarda",
        }))
        .unwrap();

        assert!(row.missing_fields().is_empty());
        assert!(row.phone.is_none());

        let row: SheetSubmission = serde_json::from_value(json!({ "phone": "811" })).unwrap();
        assert_eq!(row.missing_fields(), vec!["name", "email"]);
    }
}
