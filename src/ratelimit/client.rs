//! Client identification from trusted proxy headers.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Identifier used when no trusted header is present (local runs, tests).
pub const FALLBACK_CLIENT_ID: &str = "127.0.0.1";

/// How a client identifier is pulled out of a header value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extraction {
    /// The trimmed header value as-is.
    #[default]
    Whole,
    /// The first entry of a comma-separated hop chain (`client, proxy1, ...`).
    FirstInList,
}

/// One trusted header and the rule for reading it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    pub header: String,
    #[serde(default)]
    pub extraction: Extraction,
}

impl HeaderRule {
    pub fn new(header: impl Into<String>, extraction: Extraction) -> Self {
        Self {
            header: header.into(),
            extraction,
        }
    }

    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(self.header.as_str())?.to_str().ok()?;
        let candidate = match self.extraction {
            Extraction::Whole => value.trim(),
            Extraction::FirstInList => value.split(',').next().unwrap_or_default().trim(),
        };
        (!candidate.is_empty()).then(|| candidate.to_string())
    }
}

/// Ordered table of header rules; the first rule yielding a non-empty value
/// wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentifier {
    rules: Vec<HeaderRule>,
}

impl ClientIdentifier {
    pub fn new(rules: Vec<HeaderRule>) -> Self {
        Self { rules }
    }

    /// CDN-injected and reverse-proxy "real IP" headers ahead of the generic
    /// forwarding chain.
    pub fn default_rules() -> Vec<HeaderRule> {
        vec![
            HeaderRule::new("cf-connecting-ip", Extraction::Whole),
            HeaderRule::new("x-real-ip", Extraction::Whole),
            HeaderRule::new("x-forwarded-for", Extraction::FirstInList),
            HeaderRule::new("x-client-ip", Extraction::Whole),
        ]
    }

    pub fn rules(&self) -> &[HeaderRule] {
        &self.rules
    }

    /// Derive the rate-limit key for a request.
    pub fn identify(&self, headers: &HeaderMap) -> String {
        self.rules
            .iter()
            .find_map(|rule| rule.extract(headers))
            .unwrap_or_else(|| FALLBACK_CLIENT_ID.to_string())
    }
}

impl Default for ClientIdentifier {
    fn default() -> Self {
        Self::new(Self::default_rules())
    }
}
