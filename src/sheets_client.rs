// src/sheets_client.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::workflow::ActivityLog;

/// Appends one row per finished task to the configured spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: Client,
    token: String,
    spreadsheet_id: String,
    range: String,
}

impl SheetsClient {
    pub fn new(token: String, spreadsheet_id: String) -> Self {
        Self {
            client: Client::new(),
            token,
            spreadsheet_id,
            range: "Sheet1".to_string(),
        }
    }
}

#[async_trait]
impl ActivityLog for SheetsClient {
    async fn append_row(&self, values: Vec<String>) -> Result<(), String> {
        let url = format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}:append",
            self.spreadsheet_id, self.range
        );

        let response = self
            .client
            .post(&url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&self.token)
            .timeout(Duration::from_secs(30))
            .json(&json!({ "values": [values] }))
            .send()
            .await
            .map_err(|e| format!("Google Sheets API request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Google Sheets API error ({}): {}", status, body));
        }

        tracing::debug!("Appended activity row to spreadsheet {}", self.spreadsheet_id);
        Ok(())
    }
}
