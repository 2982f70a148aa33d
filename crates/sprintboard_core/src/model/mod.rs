mod sprint;
mod task;

pub use sprint::{NewSprint, Sprint, SprintPatch, SprintRef};
pub use task::{NewTask, Task, TaskNode, TaskPatch, TaskStatus};

use crate::error::AppError;

/// Trim an id argument and reject it when blank.
pub fn require_id<'a>(id: &'a str, what: &str) -> Result<&'a str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{what} is required")));
    }
    Ok(trimmed)
}
