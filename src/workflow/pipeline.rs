// The POV generation pipeline: prompt -> image -> video submission -> bounded
// status polling -> best-effort logging/notification -> finalization. One
// execution per task, spawned fire-and-forget by the submission handler; all
// progress is written through the shared task store so clients can poll
// mid-flight.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;

use super::integrations::{ActivityLog, ImageGenerator, Notifier, PromptGenerator, VideoGenerator};
use crate::tasks::{SharedTaskStore, StepRecord, StepStatus, TaskId, TaskStatus};

/// Delay between render status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Status checks before a render is declared timed out.
pub const MAX_POLL_ATTEMPTS: u32 = 30;

pub const STEP_CREDENTIAL_CHECK: &str = "Credential Check";
pub const STEP_PROMPT: &str = "GPT-4 Prompt Generation";
pub const STEP_IMAGE: &str = "FLUX Image Generation";
pub const STEP_VIDEO_SUBMIT: &str = "RunwayML Video Generation";
pub const STEP_VIDEO_POLL: &str = "RunwayML Video Processing";
pub const STEP_SHEET: &str = "Google Sheets Update";
pub const STEP_EMAIL: &str = "Gmail Notification";
pub const STEP_FINISHED: &str = "Workflow Finished";
pub const STEP_WORKFLOW_ERROR: &str = "Workflow Error";
pub const STEP_INIT_ERROR: &str = "Workflow Initialization Error";

/// Terminal failure of a mandatory pipeline stage.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Missing API credentials for OpenAI or RunwayML.")]
    MissingCredentials,
    #[error("{stage} Error: {message}")]
    Stage { stage: &'static str, message: String },
    #[error("RunwayML Video Creation did not return a task ID. Response: {raw}")]
    MissingJobId { raw: String },
    #[error("RunwayML Succeeded but no video URL found. Response: {raw}")]
    MissingVideoUrl { raw: String },
    #[error("RunwayML Video Generation Failed: {reason} - Full Response: {raw}")]
    RenderFailed { reason: String, raw: String },
    #[error("RunwayML video generation timed out after {attempts} status checks.")]
    PollTimeout { attempts: u32 },
    #[error("Workflow panicked: {0}")]
    Panicked(String),
}

/// The orchestrator. Holds the task store and whichever adapters are
/// configured; missing mandatory adapters fail the task before any call.
pub struct PovWorkflow {
    pub store: SharedTaskStore,
    pub prompts: Option<Arc<dyn PromptGenerator>>,
    pub images: Arc<dyn ImageGenerator>,
    pub videos: Option<Arc<dyn VideoGenerator>>,
    pub sheet: Option<Arc<dyn ActivityLog>>,
    pub mail: Option<Arc<dyn Notifier>>,
}

impl PovWorkflow {
    /// Launch the pipeline for a task on its own execution unit and return
    /// immediately.
    pub fn spawn(self: Arc<Self>, task_id: TaskId) {
        tokio::spawn(async move {
            self.run(task_id).await;
        });
    }

    /// Run the pipeline to its terminal state. Any failure, including a
    /// panic inside a stage, ends as a terminal `error` on the task.
    pub async fn run(self: Arc<Self>, task_id: TaskId) {
        match AssertUnwindSafe(self.execute(task_id)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.fail_task(task_id, &err).await,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.fail_task(task_id, &WorkflowError::Panicked(reason)).await;
            }
        }
    }

    async fn execute(&self, task_id: TaskId) -> Result<(), WorkflowError> {
        let description = match self.store.get(task_id).await {
            Some(task) => task.description,
            None => {
                tracing::error!("Task {} vanished before its pipeline started", task_id);
                return Ok(());
            }
        };

        self.store
            .mutate(task_id, |task| task.status = TaskStatus::Processing)
            .await;
        tracing::info!("🎬 Task {} processing: {}", task_id, description);

        // Mandatory credentials first; nothing external runs without them.
        let (prompts, videos) = match (self.prompts.clone(), self.videos.clone()) {
            (Some(prompts), Some(videos)) => (prompts, videos),
            _ => {
                let message = WorkflowError::MissingCredentials.to_string();
                self.store
                    .mutate(task_id, |task| {
                        task.push_step(
                            StepRecord::new(STEP_CREDENTIAL_CHECK, StepStatus::Error)
                                .with_message(message.clone()),
                        );
                        task.mark_error(message.clone());
                    })
                    .await;
                tracing::error!("❌ Task {} aborted: {}", task_id, message);
                return Ok(());
            }
        };

        // 1. Prompt expansion
        self.begin_step(task_id, STEP_PROMPT).await;
        let prompt = prompts
            .generate_prompt(&description)
            .await
            .map_err(|message| WorkflowError::Stage { stage: "GPT-4", message })?;
        self.store
            .mutate(task_id, |task| {
                if let Some(step) = task.last_step_mut() {
                    step.set_status(StepStatus::Completed);
                    step.output = Some(prompt.clone());
                }
                task.prompt = Some(prompt.clone());
            })
            .await;

        // 2. Image generation
        self.begin_step(task_id, STEP_IMAGE).await;
        let image_url = self
            .images
            .generate_image(&prompt)
            .await
            .map_err(|message| WorkflowError::Stage { stage: "FLUX Image Generation", message })?;
        self.store
            .mutate(task_id, |task| {
                if let Some(step) = task.last_step_mut() {
                    step.set_status(StepStatus::Completed);
                    step.output = Some(image_url.clone());
                }
                task.image_url = Some(image_url.clone());
            })
            .await;

        // 3. Video render submission
        self.begin_step(task_id, STEP_VIDEO_SUBMIT).await;
        let submission = videos
            .submit_video(&image_url, &prompt)
            .await
            .map_err(|message| WorkflowError::Stage { stage: "RunwayML Video Creation", message })?;
        let job_id = extract_job_id(&submission)
            .ok_or_else(|| WorkflowError::MissingJobId { raw: submission.to_string() })?;
        self.store
            .mutate(task_id, |task| {
                if let Some(step) = task.last_step_mut() {
                    step.set_status(StepStatus::Submitted);
                    step.output = Some(job_id.clone());
                }
            })
            .await;
        tracing::info!("📤 Task {} submitted render job {}", task_id, job_id);

        // 4. Bounded status polling
        self.store
            .mutate(task_id, |task| {
                task.push_step(StepRecord::new(STEP_VIDEO_POLL, StepStatus::Polling));
            })
            .await;
        let video_url = self.poll_video(task_id, videos.as_ref(), &job_id).await?;
        self.store
            .mutate(task_id, |task| {
                if let Some(step) = task.last_step_mut() {
                    step.set_status(StepStatus::Completed);
                    step.output = Some(video_url.clone());
                }
                task.video_url = Some(video_url.clone());
            })
            .await;

        // 5. Best-effort side effects; failures degrade to warnings.
        if let Some(sheet) = &self.sheet {
            self.begin_step(task_id, STEP_SHEET).await;
            let row = vec![
                description.clone(),
                prompt.clone(),
                image_url.clone(),
                video_url.clone(),
                "Completed".to_string(),
                Utc::now().to_rfc2822(),
            ];
            match sheet.append_row(row).await {
                Ok(()) => self.complete_last_step(task_id).await,
                Err(e) => {
                    self.warn_last_step(task_id, format!("Google Sheets Error: {}", e))
                        .await
                }
            }
        }

        if let Some(mail) = &self.mail {
            self.begin_step(task_id, STEP_EMAIL).await;
            let short: String = description.chars().take(30).collect();
            let subject = format!("POV Video Generated: {}...", short);
            let body = format!(
                "Your POV video for the scene '{}' has been generated.\n\n\
                 Prompt: {}\nImage URL: {}\nVideo URL: {}",
                description, prompt, image_url, video_url
            );
            match mail.notify(&subject, &body).await {
                Ok(()) => self.complete_last_step(task_id).await,
                Err(e) => self.warn_last_step(task_id, format!("Gmail Error: {}", e)).await,
            }
        }

        // 6. Finalize
        self.store
            .mutate(task_id, |task| {
                task.mark_completed(video_url.clone());
                task.push_step(StepRecord::new(STEP_FINISHED, StepStatus::Completed));
            })
            .await;
        tracing::info!("✅ Task {} completed: {}", task_id, video_url);
        Ok(())
    }

    /// Poll the render job until it succeeds, fails, or the attempt bound is
    /// exhausted. Only a still-pending status is retried; adapter errors and
    /// malformed payloads abort immediately.
    async fn poll_video(
        &self,
        task_id: TaskId,
        videos: &dyn VideoGenerator,
        job_id: &str,
    ) -> Result<String, WorkflowError> {
        for attempt in 1..=MAX_POLL_ATTEMPTS {
            let payload = videos
                .job_status(job_id)
                .await
                .map_err(|message| WorkflowError::Stage { stage: "RunwayML Status Check", message })?;

            let status = payload
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            self.store
                .mutate(task_id, |task| {
                    if let Some(step) = task.last_step_mut() {
                        step.message = Some(format!(
                            "render status: {} (attempt {}/{})",
                            status, attempt, MAX_POLL_ATTEMPTS
                        ));
                    }
                })
                .await;
            tracing::debug!(
                "Task {} render job {} status {} ({}/{})",
                task_id,
                job_id,
                status,
                attempt,
                MAX_POLL_ATTEMPTS
            );

            match status.as_str() {
                "succeeded" => {
                    return resolve_video_url(&payload)
                        .ok_or_else(|| WorkflowError::MissingVideoUrl { raw: payload.to_string() });
                }
                "failed" => {
                    let reason = payload
                        .get("error_message")
                        .and_then(Value::as_str)
                        .or_else(|| payload.get("error").and_then(Value::as_str))
                        .unwrap_or("Unknown RunwayML error")
                        .to_string();
                    return Err(WorkflowError::RenderFailed { reason, raw: payload.to_string() });
                }
                _ => {
                    if attempt < MAX_POLL_ATTEMPTS {
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                }
            }
        }
        Err(WorkflowError::PollTimeout { attempts: MAX_POLL_ATTEMPTS })
    }

    async fn begin_step(&self, task_id: TaskId, name: &'static str) {
        self.store
            .mutate(task_id, |task| {
                task.push_step(StepRecord::new(name, StepStatus::Processing));
            })
            .await;
    }

    async fn complete_last_step(&self, task_id: TaskId) {
        self.store
            .mutate(task_id, |task| {
                if let Some(step) = task.last_step_mut() {
                    step.set_status(StepStatus::Completed);
                }
            })
            .await;
    }

    async fn warn_last_step(&self, task_id: TaskId, message: String) {
        tracing::warn!("⚠️ Task {}: {}", task_id, message);
        self.store
            .mutate(task_id, |task| {
                if let Some(step) = task.last_step_mut() {
                    step.set_status(StepStatus::Warning);
                    step.message = Some(message);
                }
            })
            .await;
    }

    /// Record a terminal failure: the in-flight step takes the message, or a
    /// fresh error step is appended when the last step already settled.
    async fn fail_task(&self, task_id: TaskId, err: &WorkflowError) {
        let message = err.to_string();
        tracing::error!("❌ Task {} failed: {}", task_id, message);
        self.store
            .mutate(task_id, |task| {
                if task.status.is_terminal() {
                    return;
                }
                match task.last_step_mut() {
                    Some(step) if step.status.is_in_flight() => {
                        step.set_status(StepStatus::Error);
                        step.message = Some(message.clone());
                    }
                    Some(_) => task.push_step(
                        StepRecord::new(STEP_WORKFLOW_ERROR, StepStatus::Error)
                            .with_message(message.clone()),
                    ),
                    None => task.push_step(
                        StepRecord::new(STEP_INIT_ERROR, StepStatus::Error)
                            .with_message(message.clone()),
                    ),
                }
                task.mark_error(message.clone());
            })
            .await;
    }
}

fn extract_job_id(payload: &Value) -> Option<String> {
    payload
        .get("uuid")
        .and_then(Value::as_str)
        .or_else(|| payload.get("task_id").and_then(Value::as_str))
        .map(str::to_string)
}

/// Ordered extraction strategies for the rendered video URL. Finished-render
/// payloads have shipped the URL under several shapes; each known shape is
/// tried in turn rather than trusting any single one.
pub fn resolve_video_url(payload: &Value) -> Option<String> {
    let strategies: [fn(&Value) -> Option<&str>; 3] = [
        |p| p.get("outputs")?.get(0)?.get("video")?.as_str(),
        |p| p.get("url")?.as_str(),
        |p| p.get("output")?.as_str().filter(|s| s.starts_with("http")),
    ];
    strategies
        .iter()
        .find_map(|extract| extract(payload).map(str::to_string))
}
