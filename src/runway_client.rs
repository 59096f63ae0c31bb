// src/runway_client.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::workflow::VideoGenerator;

#[derive(Debug, Clone)]
pub struct RunwayClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    image_url: &'a str,
    text_prompt: &'a str,
}

impl RunwayClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.runwayml.com/v1".to_string(),
        }
    }
}

#[async_trait]
impl VideoGenerator for RunwayClient {
    async fn submit_video(&self, image_url: &str, text_prompt: &str) -> Result<Value, String> {
        let response = self
            .client
            .post(format!("{}/tasks", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(30))
            .json(&CreateTaskRequest { image_url, text_prompt })
            .send()
            .await
            .map_err(|e| format!("RunwayML API request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read RunwayML API response: {}", e))?;

        if !status.is_success() {
            return Err(format!("RunwayML API request failed ({}): {}", status, body));
        }

        serde_json::from_str(&body).map_err(|e| {
            format!("Failed to parse RunwayML API response for task creation: {}. Response: {}", e, body)
        })
    }

    async fn job_status(&self, job_id: &str) -> Result<Value, String> {
        let response = self
            .client
            .get(format!("{}/tasks/{}", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| format!("RunwayML API status check failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read RunwayML API status response: {}", e))?;

        if !status.is_success() {
            return Err(format!("RunwayML API status check failed ({}): {}", status, body));
        }

        serde_json::from_str(&body)
            .map_err(|e| format!("Failed to parse RunwayML API status response: {}. Response: {}", e, body))
    }
}
