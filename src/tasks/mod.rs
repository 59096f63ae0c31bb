// src/tasks/mod.rs
//! In-memory task registry for POV generation workflows.
//! Single source of truth for task progress; readers may poll any task while
//! its pipeline is still running.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Unique identifier for a generation task. Allocated monotonically, never reused.
pub type TaskId = u64;

/// Lifecycle of a whole task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }
}

/// State of one pipeline stage as recorded in the task's audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Processing,
    Polling,
    Submitted,
    Completed,
    Warning,
    Error,
}

impl StepStatus {
    /// A step still owned by the pipeline; may be rewritten in place.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            StepStatus::Processing | StepStatus::Polling | StepStatus::Submitted
        )
    }
}

/// Audit-trail entry for one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StepRecord {
    pub fn new(name: &str, status: StepStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            timestamp: Utc::now(),
            output: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }

    /// Update the step's status, refreshing its timestamp.
    pub fn set_status(&mut self, status: StepStatus) {
        self.status = status;
        self.timestamp = Utc::now();
    }
}

/// One end-to-end generation run for a single scene description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub status: TaskStatus,
    pub steps: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    fn new(id: TaskId, description: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            description,
            status: TaskStatus::Pending,
            steps: Vec::new(),
            prompt: None,
            image_url: None,
            video_url: None,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push_step(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    pub fn last_step_mut(&mut self) -> Option<&mut StepRecord> {
        self.steps.last_mut()
    }

    /// Finalize the task successfully. Ignored once the task is terminal.
    pub fn mark_completed(&mut self, result: String) {
        if self.status.is_terminal() {
            tracing::warn!("Task {} is already terminal, ignoring completion", self.id);
            return;
        }
        self.status = TaskStatus::Completed;
        self.result = Some(result);
    }

    /// Finalize the task with a failure message. Ignored once the task is terminal.
    pub fn mark_error(&mut self, message: String) {
        if self.status.is_terminal() {
            tracing::warn!("Task {} is already terminal, ignoring error: {}", self.id, message);
            return;
        }
        self.status = TaskStatus::Error;
        self.error = Some(message);
    }
}

/// Concurrently-accessed registry of all tasks.
///
/// Each task sits behind its own lock so pipelines driving different tasks
/// never contend; the outer map lock is only held long enough to look up or
/// insert an entry. Readers always see a whole task snapshot, never a
/// half-written step.
pub struct TaskStore {
    next_id: AtomicU64,
    tasks: RwLock<BTreeMap<TaskId, Arc<RwLock<Task>>>>,
}

pub type SharedTaskStore = Arc<TaskStore>;

impl TaskStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            tasks: RwLock::new(BTreeMap::new()),
        }
    }

    /// Allocate a fresh task in `pending` state and return its id.
    pub async fn create(&self, description: &str) -> TaskId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task = Task::new(id, description.to_string());
        let mut tasks = self.tasks.write().await;
        tasks.insert(id, Arc::new(RwLock::new(task)));
        tracing::info!("🎬 Created task {}", id);
        id
    }

    /// Snapshot of a single task, or `None` for unknown ids.
    pub async fn get(&self, id: TaskId) -> Option<Task> {
        let entry = {
            let tasks = self.tasks.read().await;
            tasks.get(&id).cloned()
        };
        match entry {
            Some(task) => Some(task.read().await.clone()),
            None => None,
        }
    }

    /// Apply a mutation to one task under its exclusive lock.
    /// Returns false when the id is unknown.
    pub async fn mutate<F>(&self, id: TaskId, f: F) -> bool
    where
        F: FnOnce(&mut Task),
    {
        let entry = {
            let tasks = self.tasks.read().await;
            tasks.get(&id).cloned()
        };
        match entry {
            Some(task) => {
                let mut task = task.write().await;
                f(&mut task);
                task.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Snapshot of every task, in creation (id) order.
    pub async fn list(&self) -> Vec<Task> {
        let entries: Vec<Arc<RwLock<Task>>> = {
            let tasks = self.tasks.read().await;
            tasks.values().cloned().collect()
        };
        let mut snapshot = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshot.push(entry.read().await.clone());
        }
        snapshot
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_allocates_sequential_pending_tasks() {
        let store = TaskStore::new();
        let first = store.create("a cat on a windowsill").await;
        let second = store.create("a dog on a beach").await;
        assert_eq!(second, first + 1);

        let task = store.get(first).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.steps.is_empty());
        assert_eq!(task.description, "a cat on a windowsill");
        assert!(task.result.is_none());
        assert!(task.error.is_none());
    }

    #[tokio::test]
    async fn get_and_mutate_unknown_ids() {
        let store = TaskStore::new();
        assert!(store.get(42).await.is_none());
        assert!(!store.mutate(42, |_| {}).await);
    }

    #[tokio::test]
    async fn list_returns_tasks_in_creation_order() {
        let store = TaskStore::new();
        for i in 0..5 {
            store.create(&format!("scene {}", i)).await;
        }
        let tasks = store.list().await;
        let ids: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn concurrent_creation_never_reuses_ids() {
        let store = Arc::new(TaskStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..50 {
                    ids.push(store.create("concurrent scene").await);
                }
                ids
            }));
        }

        let mut all_ids = Vec::new();
        for handle in handles {
            all_ids.extend(handle.await.unwrap());
        }
        all_ids.sort_unstable();
        all_ids.dedup();
        assert_eq!(all_ids.len(), 16 * 50);
        assert_eq!(store.list().await.len(), 16 * 50);
    }

    #[tokio::test]
    async fn readers_never_observe_torn_step_updates() {
        let store = Arc::new(TaskStore::new());
        let id = store.create("torn write probe").await;
        store
            .mutate(id, |task| {
                task.push_step(StepRecord::new("probe", StepStatus::Processing));
            })
            .await;

        // The writer always updates status and output together; a torn read
        // would surface as a completed step without its matching output.
        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for round in 0..200u32 {
                    store
                        .mutate(id, |task| {
                            let step = task.last_step_mut().unwrap();
                            if round % 2 == 0 {
                                step.set_status(StepStatus::Completed);
                                step.output = Some(format!("round-{}", round));
                            } else {
                                step.set_status(StepStatus::Processing);
                                step.output = None;
                            }
                        })
                        .await;
                }
            })
        };

        let reader = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let task = store.get(id).await.unwrap();
                    let step = &task.steps[0];
                    match step.status {
                        StepStatus::Completed => assert!(step.output.is_some()),
                        StepStatus::Processing => assert!(step.output.is_none()),
                        other => panic!("unexpected step status {:?}", other),
                    }
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn terminal_tasks_are_never_overwritten() {
        let store = TaskStore::new();
        let id = store.create("terminal protection").await;

        store
            .mutate(id, |task| task.mark_completed("https://cdn.example/v.mp4".to_string()))
            .await;
        store
            .mutate(id, |task| task.mark_error("late failure".to_string()))
            .await;

        let task = store.get(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result.as_deref(), Some("https://cdn.example/v.mp4"));
        assert!(task.error.is_none());
    }
}
