use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::error::{FormError, GatewayError};
use crate::form::TaskFormController;
use crate::list::TaskListController;
use crate::notify::{LiveNotice, NotificationCenter, NoticeId};
use crate::session::{SessionStore, greeting_name};
use crate::task::{Task, TaskId};

/// How long a card fades out before its delete is issued.
pub const REMOVAL_ANIMATION: Duration = Duration::from_millis(300);

/// Cards the view is animating out. Purely cosmetic: a marked task is still
/// a member of the collection until its delete succeeds.
#[derive(Debug, Clone, Default)]
pub struct RemovalMarks {
    due: BTreeMap<TaskId, Instant>,
}

impl RemovalMarks {
    pub fn mark(&mut self, id: TaskId, now: Instant, delay: Duration) {
        self.due.entry(id).or_insert(now + delay);
    }

    pub fn is_marked(&self, id: TaskId) -> bool {
        self.due.contains_key(&id)
    }

    pub fn unmark(&mut self, id: TaskId) -> bool {
        self.due.remove(&id).is_some()
    }

    /// Removes and returns the ids whose animation has finished.
    pub fn take_due(&mut self, now: Instant) -> Vec<TaskId> {
        let ready: Vec<TaskId> = self
            .due
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &ready {
            self.due.remove(id);
        }
        ready
    }

    pub fn is_empty(&self) -> bool {
        self.due.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub greeting_name: String,
    pub completed: usize,
    pub total: usize,
    pub pending: usize,
    pub progress: u8,
    pub status_line: String,
}

/// The task dashboard: collection, modal form, notices and greeting.
pub struct Dashboard {
    list: Arc<TaskListController>,
    form: TaskFormController,
    notices: Arc<NotificationCenter>,
    session: Arc<dyn SessionStore>,
    removals: RemovalMarks,
}

impl Dashboard {
    pub fn new(
        list: Arc<TaskListController>,
        notices: Arc<NotificationCenter>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            list,
            form: TaskFormController::new(),
            notices,
            session,
            removals: RemovalMarks::default(),
        }
    }

    pub fn list(&self) -> &Arc<TaskListController> {
        &self.list
    }

    pub fn form(&self) -> &TaskFormController {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut TaskFormController {
        &mut self.form
    }

    pub fn notices(&self) -> &Arc<NotificationCenter> {
        &self.notices
    }

    pub fn removals(&self) -> &RemovalMarks {
        &self.removals
    }

    /// Initial load. The error notice is already posted on failure.
    pub async fn activate(&self) -> Result<(), GatewayError> {
        self.list.refresh().await
    }

    pub fn edit(&mut self, id: TaskId) -> bool {
        match self.list.get(id) {
            Some(task) => {
                self.form.open_for_edit(&task);
                true
            }
            None => {
                debug!(id = %id, "edit requested for unknown task");
                false
            }
        }
    }

    pub async fn submit_form(&mut self) -> Result<Task, FormError> {
        self.form.submit(&self.list).await
    }

    /// Starts the fade-out; the delete is issued by [`Self::settle_removals`].
    pub fn request_delete(&mut self, id: TaskId, now: Instant) {
        self.removals.mark(id, now, REMOVAL_ANIMATION);
    }

    /// Deletes every task whose fade-out finished. Failed deletes simply
    /// reappear because the collection never dropped them.
    #[instrument(skip(self))]
    pub async fn settle_removals(&mut self, now: Instant) -> Vec<(TaskId, Result<(), GatewayError>)> {
        let mut outcomes = Vec::new();
        for id in self.removals.take_due(now) {
            let result = self.list.delete(id).await;
            if let Err(err) = &result {
                warn!(id = %id, error = %err, "delete failed after fade-out");
            }
            outcomes.push((id, result));
        }
        outcomes
    }

    pub fn visible_notices(&self, now: Instant) -> Vec<LiveNotice> {
        self.notices.visible(now)
    }

    pub fn dismiss_notice(&self, id: NoticeId) -> bool {
        self.notices.dismiss(id)
    }

    pub fn summary(&self) -> DashboardSummary {
        let progress = self.list.progress();
        let status_line = if progress.total == 0 {
            "System initialized. Waiting for task deployment.".to_string()
        } else {
            format!(
                "Completed {} tasks. {} remaining.",
                progress.completed,
                progress.pending()
            )
        };
        DashboardSummary {
            greeting_name: greeting_name(self.session.as_ref()),
            completed: progress.completed,
            total: progress.total,
            pending: progress.pending(),
            progress: progress.percent(),
            status_line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn marks_become_due_after_delay() {
        let mut marks = RemovalMarks::default();
        let start = Instant::now();
        marks.mark(TaskId(1), start, REMOVAL_ANIMATION);
        marks.mark(TaskId(2), start + Duration::from_millis(200), REMOVAL_ANIMATION);

        assert!(marks.take_due(start + Duration::from_millis(299)).is_empty());
        assert_eq!(
            marks.take_due(start + Duration::from_millis(300)),
            vec![TaskId(1)]
        );
        assert!(marks.is_marked(TaskId(2)));
        assert!(marks.unmark(TaskId(2)));
        assert!(marks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn remarking_keeps_first_deadline() {
        let mut marks = RemovalMarks::default();
        let start = Instant::now();
        marks.mark(TaskId(3), start, REMOVAL_ANIMATION);
        marks.mark(TaskId(3), start + Duration::from_secs(10), REMOVAL_ANIMATION);
        assert_eq!(marks.take_due(start + REMOVAL_ANIMATION), vec![TaskId(3)]);
    }
}
