//! Contact rows written to a Google Sheet as a service account.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::format::format_local_date;
use super::model::SheetSubmission;
use crate::config::{LeadgateConfig, SheetsConfig};
use crate::error::{LeadgateError, Result};

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime of a signed assertion; Google caps it at one hour.
const ASSERTION_TTL_SECS: i64 = 3600;
/// Row 1 holds the headers.
const FIRST_DATA_ROW: usize = 2;

/// One recorded submission: columns B to E. Column A is left to the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub date: String,
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl SheetRow {
    pub fn new(submission: &SheetSubmission, at: DateTime<Utc>) -> Self {
        Self {
            date: format_local_date(at),
            name: submission.name.clone().unwrap_or_default(),
            phone: submission.phone.clone().unwrap_or_default(),
            email: submission.email.clone().unwrap_or_default(),
        }
    }

    fn values(&self) -> [&str; 4] {
        [&self.date, &self.name, &self.phone, &self.email]
    }
}

/// A spreadsheet that accepts contact rows.
#[async_trait]
pub trait LeadSheet: Send + Sync {
    /// Write `row` and return the 1-based sheet row it landed in.
    async fn append(&self, row: &SheetRow) -> Result<usize>;
}

/// First row whose data columns (B to E) are all blank, or the row after
/// the last one in use. `rows` is the `A:E` range including the header row.
pub fn first_empty_row(rows: &[Vec<String>]) -> usize {
    let mut target = FIRST_DATA_ROW;
    for (index, row) in rows.iter().enumerate().skip(1) {
        let blank = row.iter().skip(1).take(4).all(|cell| cell.trim().is_empty());
        if blank {
            return index + 1;
        }
        target = index + 2;
    }
    target
}

/// `{api_base}/v4/spreadsheets/{id}/values/{range}` with the range encoded
/// as a single path segment.
pub fn values_url(api_base: &Url, spreadsheet_id: &str, range: &str) -> Result<Url> {
    let mut url = api_base.clone();
    url.path_segments_mut()
        .map_err(|_| LeadgateError::Config(format!("sheets.api_base is not a base URL: {}", api_base)))?
        .pop_if_empty()
        .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);
    Ok(url)
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Sheets API v4 client authenticated with a signed JWT assertion.
pub struct GoogleSheets {
    client: reqwest::Client,
    key: EncodingKey,
    service_account_email: String,
    token_uri: String,
    api_base: Url,
    spreadsheet_id: String,
    sheet_name: String,
}

impl GoogleSheets {
    pub fn new(config: &SheetsConfig) -> Result<Self> {
        let pem = config.private_key.replace("\\n", "\n");
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| LeadgateError::Config(format!("sheets.private_key: {}", e)))?;
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| LeadgateError::Config(format!("sheets.api_base: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            key,
            service_account_email: config.service_account_email.clone(),
            token_uri: config.token_uri.clone(),
            api_base,
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.service_account_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| LeadgateError::Sheets(format!("signing assertion: {}", e)))?;

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?
            .error_for_status()?;
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn used_rows(&self, token: &str) -> Result<Vec<Vec<String>>> {
        let range = format!("{}!A:E", self.sheet_name);
        let url = values_url(&self.api_base, &self.spreadsheet_id, &range)?;
        let range: ValueRange = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(range.values)
    }
}

#[async_trait]
impl LeadSheet for GoogleSheets {
    async fn append(&self, row: &SheetRow) -> Result<usize> {
        let token = self.access_token().await?;
        let target = first_empty_row(&self.used_rows(&token).await?);

        let range = format!("{}!B{}:E{}", self.sheet_name, target, target);
        let url = values_url(&self.api_base, &self.spreadsheet_id, &range)?;
        self.client
            .put(url)
            .bearer_auth(&token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": [row.values()] }))
            .send()
            .await?
            .error_for_status()?;

        debug!(row = target, "Contact row written");
        Ok(target)
    }
}

/// Build the sheet client when a `sheets` section is configured.
pub fn sheet_from_config(config: &LeadgateConfig) -> Result<Option<GoogleSheets>> {
    let Some(sheets) = &config.sheets else {
        return Ok(None);
    };
    let client = GoogleSheets::new(sheets)?;
    info!(sheet = %sheets.sheet_name, "Google Sheets configured");
    Ok(Some(client))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// In-memory sheet that records rows.
    #[derive(Default)]
    pub(crate) struct FakeSheet {
        pub fail: bool,
        pub rows: Mutex<Vec<SheetRow>>,
    }

    #[async_trait]
    impl LeadSheet for FakeSheet {
        async fn append(&self, row: &SheetRow) -> Result<usize> {
            if self.fail {
                return Err(LeadgateError::Sheets("quota exceeded".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            rows.push(row.clone());
            Ok(rows.len() + 1)
        }
    }

    fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_first_empty_row_on_header_only_sheet() {
        assert_eq!(first_empty_row(&[]), 2);
        assert_eq!(first_empty_row(&rows(&[&["ID", "Fecha", "Nombre", "Teléfono", "Correo"]])), 2);
    }

    #[test]
    fn test_first_empty_row_after_last_used() {
        let sheet = rows(&[
            &["ID", "Fecha", "Nombre", "Teléfono", "Correo"],
            &["1", "1 de marzo", "Ana", "811", "ana@example.com"],
            &["2", "2 de marzo", "Luis", "", "luis@example.com"],
        ]);
        assert_eq!(first_empty_row(&sheet), 4);
    }

    #[test]
    fn test_first_empty_row_reuses_gap_with_only_id() {
        let sheet = rows(&[
            &["ID", "Fecha", "Nombre", "Teléfono", "Correo"],
            &["1", "1 de marzo", "Ana", "811", "ana@example.com"],
            &["2", " ", ""],
            &["3", "3 de marzo", "Eva", "", "eva@example.com"],
        ]);
        assert_eq!(first_empty_row(&sheet), 3);
    }

    #[test]
    fn test_values_url_encodes_range() {
        let base = Url::parse("https://sheets.googleapis.com").unwrap();
        let url = values_url(&base, "sheet-id", "LEADS!B7:E7").unwrap();
        assert_eq!(url.as_str(), "https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/LEADS!B7:E7");

        let url = values_url(&base, "sheet-id", "Mis Leads!A:E").unwrap();
        assert_eq!(url.path(), "/v4/spreadsheets/sheet-id/values/Mis%20Leads!A:E");
    }

    #[test]
    fn test_row_from_submission() {
        let submission = SheetSubmission {
            name: Some("Ana".to_string()),
            email: Some("ana@example.com".to_string()),
            phone: None,
        };
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 20, 7, 0).unwrap();

        let row = SheetRow::new(&submission, at);
        assert_eq!(row.values(), ["5 de marzo de 2024, 14:07", "Ana", "", "ana@example.com"]);
    }

    #[test]
    fn test_rejects_invalid_private_key() {
        let config = SheetsConfig {
            service_account_email: "bot@project.iam.gserviceaccount.com".to_string(),
            private_key: "not a key".to_string(),
            spreadsheet_id: "sheet-id".to_string(),
            sheet_name: "LEADS".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            api_base: "https://sheets.googleapis.com".to_string(),
            timeout_secs: 5,
        };
        assert!(matches!(GoogleSheets::new(&config), Err(LeadgateError::Config(_))));
    }
}
