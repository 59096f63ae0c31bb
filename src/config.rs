// src/config.rs
//! Credential loading from process environment variables.
//! In production all credentials are managed through the platform's env
//! settings; nothing is ever read from or written to disk.

use serde::Serialize;

/// API credentials and optional-stage configuration resolved at startup.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub huggingface_api_key: Option<String>,
    pub runwayml_api_key: Option<String>,
    pub google_spreadsheet_id: Option<String>,
    pub gmail_recipient: Option<String>,
    /// Bearer token shared by the Google Sheets and Gmail integrations.
    pub google_api_token: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            huggingface_api_key: non_empty_env("HUGGINGFACE_API_KEY"),
            runwayml_api_key: non_empty_env("RUNWAYML_API_KEY"),
            google_spreadsheet_id: non_empty_env("GOOGLE_SPREADSHEET_ID"),
            gmail_recipient: non_empty_env("GMAIL_RECIPIENT"),
            google_api_token: non_empty_env("GOOGLE_API_BEARER_TOKEN"),
        }
    }

    /// Presence report for the credentials endpoint. Values are never echoed.
    pub fn report(&self) -> CredentialReport {
        CredentialReport {
            openai: status_of(&self.openai_api_key),
            huggingface: status_of(&self.huggingface_api_key),
            runwayml: status_of(&self.runwayml_api_key),
            google_spreadsheet_id: status_of(&self.google_spreadsheet_id),
            gmail_recipient: status_of(&self.gmail_recipient),
            google_api_token: status_of(&self.google_api_token),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CredentialReport {
    pub openai: &'static str,
    pub huggingface: &'static str,
    pub runwayml: &'static str,
    pub google_spreadsheet_id: &'static str,
    pub gmail_recipient: &'static str,
    pub google_api_token: &'static str,
}

fn status_of(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "configured"
    } else {
        "not_configured"
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_reflects_presence_without_echoing_values() {
        let creds = Credentials {
            openai_api_key: Some("sk-secret".to_string()),
            runwayml_api_key: Some("rw-secret".to_string()),
            ..Default::default()
        };

        let report = creds.report();
        assert_eq!(report.openai, "configured");
        assert_eq!(report.runwayml, "configured");
        assert_eq!(report.huggingface, "not_configured");
        assert_eq!(report.gmail_recipient, "not_configured");

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("secret"));
    }
}
