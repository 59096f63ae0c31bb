// src/openai_client.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::workflow::PromptGenerator;

const SYSTEM_PROMPT: &str = "You are an assistant that generates detailed, vivid, and creative prompts \
for an image generation model. The user will provide a simple scene description, and you should expand \
it into a rich prompt suitable for creating a POV (Point of View) image. Focus on visual details, \
atmosphere, and emotion. The output should be only the prompt itself.";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
        }
    }

    async fn chat_completion(&self, scene_description: &str) -> Result<String, String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: scene_description },
            ],
            max_tokens: 300,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(30))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("OpenAI API request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read OpenAI API response: {}", e))?;

        if !status.is_success() {
            return Err(format!("OpenAI API error ({}): {}", status, body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| format!("Failed to parse OpenAI API response: {}. Response: {}", e, body))?;

        parsed
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| format!("OpenAI response contained no choices. Response: {}", body))
    }
}

#[async_trait]
impl PromptGenerator for OpenAiClient {
    async fn generate_prompt(&self, scene_description: &str) -> Result<String, String> {
        tracing::debug!("Expanding scene description ({} chars)", scene_description.len());
        self.chat_completion(scene_description).await
    }
}
