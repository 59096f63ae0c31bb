// src/flux_client.rs
use async_trait::async_trait;

use crate::workflow::ImageGenerator;

// Stock frame served while FLUX generation is simulated.
const PLACEHOLDER_IMAGE_URL: &str = "https://images.pexels.com/photos/356056/pexels-photo-356056.jpeg?auto=compress&cs=tinysrgb&w=1260&h=750&dpr=1";

/// Image-stage client. The hosted FLUX inference API returns raw image bytes
/// rather than an addressable URL, so generation is currently simulated with
/// a curated stock frame; the downstream video stage only needs a URL.
#[derive(Debug, Clone)]
pub struct FluxClient {
    api_key: Option<String>,
}

impl FluxClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl ImageGenerator for FluxClient {
    async fn generate_image(&self, prompt: &str) -> Result<String, String> {
        if self.api_key.is_none() {
            tracing::warn!("HuggingFace API key not provided for FLUX, proceeding with placeholder");
        }
        let preview: String = prompt.chars().take(50).collect();
        tracing::info!("Simulating FLUX image generation for prompt: {}...", preview);
        // TODO: call the hosted FLUX endpoint here once generated frames can
        // be uploaded somewhere addressable.
        Ok(PLACEHOLDER_IMAGE_URL.to_string())
    }
}
