use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{TaskDto, TaskPatch};

pub use taskdeck_shared::TaskId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Full-field patch carrying this task's completion flag unchanged.
    pub fn patch_with(&self, title: &str, description: &str) -> TaskPatch {
        TaskPatch {
            title: title.to_string(),
            description: description.to_string(),
            completed: self.completed,
        }
    }
}

impl From<TaskDto> for Task {
    fn from(dto: TaskDto) -> Self {
        Self {
            id: dto.id,
            title: dto.title,
            description: dto.description,
            completed: dto.completed,
            created_at: dto.created_at,
        }
    }
}

impl From<Task> for TaskDto {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            completed: task.completed,
            created_at: task.created_at,
        }
    }
}

/// Values derived from the collection; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn of(tasks: &[Task]) -> Self {
        Self {
            completed: tasks.iter().filter(|t| t.completed).count(),
            total: tasks.len(),
        }
    }

    pub fn pending(&self) -> usize {
        self.total - self.completed
    }

    /// Rounded percentage complete, 0 for an empty collection.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.completed as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn task(id: u64, completed: bool) -> Task {
        Task {
            id: TaskId(id),
            title: format!("task {id}"),
            description: String::new(),
            completed,
            created_at: Utc
                .with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn progress_rounds_and_handles_empty() {
        let tasks: Vec<Task> = (0..10).map(|i| task(i, i < 3)).collect();
        let progress = Progress::of(&tasks);
        assert_eq!(progress.completed, 3);
        assert_eq!(progress.pending(), 7);
        assert_eq!(progress.percent(), 30);

        assert_eq!(Progress::of(&[]).percent(), 0);

        let thirds = [task(1, true), task(2, true), task(3, false)];
        assert_eq!(Progress::of(&thirds).percent(), 67);
    }

    #[test]
    fn patch_keeps_completion_flag() {
        let done = task(7, true);
        let patch = done.patch_with("renamed", "notes");
        assert!(patch.completed);
        assert_eq!(patch.title, "renamed");
    }
}
