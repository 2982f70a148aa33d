//! Hierarchical sprint task list: paged fetching, parent/child tree
//! assembly, in-place reconciliation of edits and cascading sprint deletes.

pub mod accumulator;
pub mod board;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod paging;
pub mod reconcile;
pub mod storage;
pub mod tree;

pub use accumulator::{Applied, FetchTicket, TaskList};
pub use board::{Board, CascadeReport};
pub use error::{AppError, CascadePhase};
pub use model::{
    NewSprint, NewTask, Sprint, SprintPatch, SprintRef, Task, TaskNode, TaskPatch, TaskStatus,
};
pub use storage::{JsonStore, TaskStore};

#[cfg(test)]
mod tests {
    use crate::model::{NewTask, TaskStatus};
    use crate::{AppError, Board, JsonStore};
    use tempfile::TempDir;

    #[test]
    fn new_task_defaults_to_open() {
        let fields = NewTask::new("demo", 2.0);
        assert_eq!(fields.status, TaskStatus::Open);
        assert_eq!(fields.estimated_hour, 2.0);
        assert!(fields.parent_task_id.is_none());
    }

    #[test]
    fn board_rejects_zero_first_page_size() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("store.json"));
        let err = Board::new(store, 0).unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }
}
