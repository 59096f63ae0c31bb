// Workflow orchestration module - drives one POV generation pipeline per task
pub mod integrations;
pub mod pipeline;

pub use integrations::{ActivityLog, ImageGenerator, Notifier, PromptGenerator, VideoGenerator};
pub use pipeline::{PovWorkflow, WorkflowError, MAX_POLL_ATTEMPTS, POLL_INTERVAL};
