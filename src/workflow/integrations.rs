// Adapter seams the orchestrator drives. Each call performs one external
// request and normalizes its outcome into Ok(payload) or Err(message); the
// pipeline never looks past that boundary.

use async_trait::async_trait;
use serde_json::Value;

/// Expands a short scene description into a detailed generation prompt.
#[async_trait]
pub trait PromptGenerator: Send + Sync {
    async fn generate_prompt(&self, scene_description: &str) -> Result<String, String>;
}

/// Turns a generation prompt into an addressable image URL.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<String, String>;
}

/// Submits an image-to-video render job and reports its status.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Submit a render job. Returns the raw success payload; the caller owns
    /// extracting the job identifier from it.
    async fn submit_video(&self, image_url: &str, text_prompt: &str) -> Result<Value, String>;

    /// Fetch the current status payload for a previously submitted job.
    async fn job_status(&self, job_id: &str) -> Result<Value, String>;
}

/// Best-effort activity log (spreadsheet row per finished task).
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append_row(&self, values: Vec<String>) -> Result<(), String>;
}

/// Best-effort completion notification (email to the configured recipient).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), String>;
}
