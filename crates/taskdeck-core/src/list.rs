//! The authoritative in-memory task collection.
//!
//! Every mutation goes through the gateway first and is applied to the
//! collection only from the gateway's response. A failed call leaves the
//! collection exactly as it was.
//!
//! Operations take `&self` and may run concurrently. The collection lock is
//! held only for the splice, never across an await, so two in-flight calls
//! on the same id resolve last-writer-wins.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use taskdeck_shared::{TaskCreate, TaskPatch, TaskToggleArgs, TaskUpdateArgs};
use tracing::{debug, error, info, instrument};

use crate::error::GatewayError;
use crate::form::ValidDraft;
use crate::gateway::TaskGateway;
use crate::notify::{Notice, Notifier};
use crate::task::{Progress, Task, TaskId};

pub const MSG_CREATED: &str = "Task created successfully!";
pub const MSG_CREATE_FAILED: &str = "Failed to create task";
pub const MSG_UPDATED: &str = "Task updated successfully";
pub const MSG_UPDATE_FAILED: &str = "Failed to update task";
pub const MSG_COMPLETED: &str = "🎉 Task completed! Great job!";
pub const MSG_DELETED: &str = "Task deleted";
pub const MSG_DELETE_FAILED: &str = "Failed to delete task";
pub const MSG_LOAD_FAILED: &str = "Failed to load tasks";

const DEFAULT_NOTICE_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Default)]
struct ListState {
    tasks: Vec<Task>,
    loading: bool,
}

pub struct TaskListController {
    gateway: Arc<dyn TaskGateway>,
    notifier: Arc<dyn Notifier>,
    notice_duration: Duration,
    state: Mutex<ListState>,
}

impl TaskListController {
    pub fn new(gateway: Arc<dyn TaskGateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            notifier,
            notice_duration: DEFAULT_NOTICE_DURATION,
            state: Mutex::new(ListState::default()),
        }
    }

    /// Auto-dismiss applied to success and info notices.
    pub fn with_notice_duration(mut self, duration: Duration) -> Self {
        self.notice_duration = duration;
        self
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.state.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn progress(&self) -> Progress {
        Progress::of(&self.state.lock().tasks)
    }

    /// Replaces the whole collection from the gateway. On failure the prior
    /// collection is kept and one error notice is posted.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), GatewayError> {
        self.state.lock().loading = true;
        let result = self.gateway.list().await;

        let mut state = self.state.lock();
        state.loading = false;
        match result {
            Ok(tasks) => {
                info!(count = tasks.len(), "tasks loaded");
                state.tasks = dedupe_by_id(tasks);
                Ok(())
            }
            Err(err) => {
                drop(state);
                error!(error = %err, "failed to load tasks");
                self.notify(Notice::error(MSG_LOAD_FAILED));
                Err(err)
            }
        }
    }

    #[instrument(skip(self, draft), fields(title_len = draft.title().len()))]
    pub async fn create(&self, draft: ValidDraft) -> Result<Task, GatewayError> {
        let create = TaskCreate::new(draft.title(), draft.description());
        match self.gateway.create(create).await {
            Ok(task) => {
                info!(id = %task.id, "task created");
                self.splice(|tasks| {
                    tasks.retain(|t| t.id != task.id);
                    tasks.insert(0, task.clone());
                });
                self.notify(Notice::success(MSG_CREATED).with_duration(self.notice_duration));
                Ok(task)
            }
            Err(err) => {
                error!(error = %err, "failed to create task");
                self.notify(Notice::error(MSG_CREATE_FAILED));
                Err(err)
            }
        }
    }

    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        id: TaskId,
        draft: ValidDraft,
        completed: bool,
    ) -> Result<Task, GatewayError> {
        let args = TaskUpdateArgs {
            id,
            patch: TaskPatch {
                title: draft.title().to_string(),
                description: draft.description().to_string(),
                completed,
            },
        };
        match self.gateway.update(args).await {
            Ok(task) => {
                info!(id = %task.id, "task updated");
                self.replace(&task);
                self.notify(Notice::success(MSG_UPDATED).with_duration(self.notice_duration));
                Ok(task)
            }
            Err(err) => {
                error!(id = %id, error = %err, "failed to update task");
                self.notify(Notice::error(MSG_UPDATE_FAILED));
                Err(err)
            }
        }
    }

    /// Flips the completion flag. Unknown ids are a no-op returning `None`.
    #[instrument(skip(self))]
    pub async fn toggle(&self, id: TaskId) -> Result<Option<Task>, GatewayError> {
        let Some(current) = self.get(id) else {
            debug!(id = %id, "toggle ignored for unknown task");
            return Ok(None);
        };

        let args = TaskToggleArgs {
            id,
            completed: !current.completed,
        };
        match self.gateway.toggle(args).await {
            Ok(task) => {
                info!(id = %task.id, completed = task.completed, "task toggled");
                self.replace(&task);
                if task.completed {
                    self.notify(
                        Notice::success(MSG_COMPLETED).with_duration(self.notice_duration),
                    );
                }
                Ok(Some(task))
            }
            Err(err) => {
                error!(id = %id, error = %err, "failed to toggle task");
                self.notify(Notice::error(MSG_UPDATE_FAILED));
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: TaskId) -> Result<(), GatewayError> {
        match self.gateway.remove(id).await {
            Ok(()) => {
                info!(id = %id, "task deleted");
                self.splice(|tasks| tasks.retain(|t| t.id != id));
                self.notify(Notice::info(MSG_DELETED).with_duration(self.notice_duration));
                Ok(())
            }
            Err(err) => {
                error!(id = %id, error = %err, "failed to delete task");
                self.notify(Notice::error(MSG_DELETE_FAILED));
                Err(err)
            }
        }
    }

    /// Swaps in the gateway's copy. A task removed meanwhile stays removed.
    fn replace(&self, task: &Task) {
        self.splice(|tasks| {
            if let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) {
                *slot = task.clone();
            } else {
                debug!(id = %task.id, "response for task no longer in collection");
            }
        });
    }

    fn splice<F>(&self, apply: F)
    where
        F: FnOnce(&mut Vec<Task>),
    {
        let mut state = self.state.lock();
        apply(&mut state.tasks);
    }

    fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }
}

/// Keeps the first occurrence of each id.
fn dedupe_by_id(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = std::collections::HashSet::with_capacity(tasks.len());
    tasks.into_iter().filter(|t| seen.insert(t.id)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn task(id: u64) -> Task {
        Task {
            id: TaskId(id),
            title: format!("t{id}"),
            description: String::new(),
            completed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn dedupe_keeps_first() {
        let mut second = task(1);
        second.title = "later".to_string();
        let out = dedupe_by_id(vec![task(1), task(2), second]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "t1");
    }
}
