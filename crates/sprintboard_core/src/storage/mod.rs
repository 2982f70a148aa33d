pub mod json_store;

pub use json_store::JsonStore;

use crate::error::AppError;
use crate::model::{NewSprint, NewTask, Sprint, SprintPatch, Task, TaskPatch};

/// Restricts `list_tasks` to one sprint when `sprint_id` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub sprint_id: Option<String>,
}

impl TaskFilter {
    pub fn sprint(sprint_id: impl Into<String>) -> Self {
        Self {
            sprint_id: Some(sprint_id.into()),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self.sprint_id.as_deref() {
            Some(sprint_id) => task.sprint_id.as_deref() == Some(sprint_id),
            None => true,
        }
    }
}

/// Half-open `[from, to)` slice of the ordered record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRange {
    pub from: usize,
    pub to: usize,
}

impl TaskRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn all() -> Self {
        Self {
            from: 0,
            to: usize::MAX,
        }
    }
}

/// One slice of tasks plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskListing {
    pub records: Vec<Task>,
    pub total_count: usize,
}

/// Persistence collaborator. Every failure comes back as `AppError::FetchFailed`.
///
/// `list_tasks` orders records by `created_at`, newest first. Records returned
/// from list, create and update carry the denormalized `sprint` reference.
pub trait TaskStore {
    fn list_tasks(&self, filter: &TaskFilter, range: TaskRange) -> Result<TaskListing, AppError>;

    fn list_children(&self, parent_id: &str) -> Result<Vec<Task>, AppError>;

    fn find_task(&self, id: &str) -> Result<Option<Task>, AppError>;

    fn create_task(&mut self, fields: &NewTask) -> Result<Task, AppError>;

    fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task, AppError>;

    fn delete_task(&mut self, id: &str) -> Result<String, AppError>;

    fn list_sprints(&self) -> Result<Vec<Sprint>, AppError>;

    fn create_sprint(&mut self, fields: &NewSprint) -> Result<Sprint, AppError>;

    fn update_sprint(&mut self, id: &str, patch: &SprintPatch) -> Result<Sprint, AppError>;

    /// Fails while any task still references the sprint.
    fn delete_sprint(&mut self, id: &str) -> Result<String, AppError>;
}
