//! Caller-facing operations: validate, persist, then patch the held list.

use crate::accumulator::{Applied, TaskList};
use crate::error::{AppError, CascadePhase};
use crate::model::{NewSprint, NewTask, Sprint, SprintPatch, Task, TaskPatch, require_id};
use crate::reconcile::{Mutation, Reconciled};
use crate::storage::{TaskFilter, TaskRange, TaskStore};

/// Result of a completed sprint cascade delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    pub sprint_id: String,
    pub deleted_task_ids: Vec<String>,
}

/// A store together with the task list and sprint list loaded from it.
#[derive(Debug)]
pub struct Board<S: TaskStore> {
    store: S,
    list: TaskList,
    sprints: Vec<Sprint>,
}

impl<S: TaskStore> Board<S> {
    pub fn new(store: S, first_page_size: usize) -> Result<Self, AppError> {
        Ok(Self {
            store,
            list: TaskList::new(first_page_size)?,
            sprints: Vec::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> &TaskList {
        &self.list
    }

    pub fn sprints(&self) -> &[Sprint] {
        &self.sprints
    }

    /// Reload page 0 with the current sprint filter.
    pub fn refresh(&mut self) -> Result<Applied, AppError> {
        let filter = self.list.sprint_filter().map(str::to_string);
        self.list.refresh(&self.store, filter)
    }

    /// Switch the sprint filter. Always a page-0 reload.
    pub fn select_sprint(&mut self, sprint_id: Option<&str>) -> Result<Applied, AppError> {
        let filter = sprint_id
            .map(|id| require_id(id, "sprint id").map(str::to_string))
            .transpose()?;
        self.list.refresh(&self.store, filter)
    }

    pub fn load_more(&mut self) -> Result<Option<Applied>, AppError> {
        self.list.load_more(&self.store)
    }

    pub fn load_children(&mut self, parent_id: &str) -> Result<bool, AppError> {
        self.list.load_children(&self.store, parent_id)
    }

    pub fn get_task(&self, id: &str) -> Result<Task, AppError> {
        let id = require_id(id, "task id")?;
        self.store
            .find_task(id)?
            .ok_or_else(|| AppError::fetch(format!("task not found: {id}")))
    }

    pub fn create_task(&mut self, fields: &NewTask) -> Result<Task, AppError> {
        let fields = fields.validated()?;
        if let Some(parent_id) = fields.parent_task_id.as_deref() {
            self.check_parent(None, parent_id)?;
        }

        let task = self.store.create_task(&fields)?;
        tracing::info!(task = %task.id, "created task");
        self.reconcile(Mutation::Inserted(task.clone()));
        Ok(task)
    }

    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task, AppError> {
        let id = require_id(id, "task id")?;
        let patch = patch.validated()?;
        if let Some(Some(parent_id)) = patch.parent_task_id.as_ref() {
            self.check_parent(Some(id), parent_id)?;
        }

        let task = self.store.update_task(id, &patch)?;
        tracing::info!(task = %task.id, "updated task");
        self.reconcile(Mutation::Updated(task.clone()));
        Ok(task)
    }

    pub fn delete_task(&mut self, id: &str) -> Result<String, AppError> {
        let id = require_id(id, "task id")?;
        let deleted = self.store.delete_task(id)?;
        tracing::info!(task = %deleted, "deleted task");
        self.reconcile(Mutation::Deleted(deleted.clone()));
        Ok(deleted)
    }

    /// One level of nesting only: the parent must be a root, and a task that
    /// already has children cannot become a child.
    fn check_parent(&self, task_id: Option<&str>, parent_id: &str) -> Result<(), AppError> {
        if task_id == Some(parent_id) {
            return Err(AppError::validation("a task cannot be its own parent"));
        }

        let parent = self
            .store
            .find_task(parent_id)?
            .ok_or_else(|| AppError::validation(format!("parent task not found: {parent_id}")))?;
        if parent.parent_task_id.is_some() {
            return Err(AppError::validation(format!(
                "parent task {parent_id} is itself a subtask"
            )));
        }

        if let Some(task_id) = task_id
            && !self.store.list_children(task_id)?.is_empty()
        {
            return Err(AppError::validation(format!(
                "task {task_id} has subtasks and cannot become a subtask"
            )));
        }
        Ok(())
    }

    fn reconcile(&mut self, mutation: Mutation) {
        self.apply_saved(std::iter::once(mutation));
    }

    /// Apply mutations that already reached the store. A reload they require
    /// is best effort: its failure is logged, never reported as the
    /// mutation's failure.
    fn apply_saved(&mut self, mutations: impl IntoIterator<Item = Mutation>) {
        if !self.list.is_loaded() {
            return;
        }
        let mut reload = false;
        for mutation in mutations {
            reload |= self.list.apply(mutation) == Reconciled::ReloadRequired;
        }
        if reload && let Err(err) = self.refresh() {
            tracing::warn!(error = %err, "reload after saved change did not complete");
        }
    }

    pub fn load_sprints(&mut self) -> Result<&[Sprint], AppError> {
        self.sprints = self.store.list_sprints()?;
        Ok(&self.sprints)
    }

    pub fn create_sprint(&mut self, fields: &NewSprint) -> Result<Sprint, AppError> {
        let fields = fields.validated()?;
        let sprint = self.store.create_sprint(&fields)?;
        tracing::info!(sprint = %sprint.id, "created sprint");
        self.sprints.insert(0, sprint.clone());
        Ok(sprint)
    }

    pub fn update_sprint(&mut self, id: &str, patch: &SprintPatch) -> Result<Sprint, AppError> {
        let id = require_id(id, "sprint id")?;
        let patch = patch.validated()?;
        let sprint = self.store.update_sprint(id, &patch)?;

        if let Some(held) = self.sprints.iter_mut().find(|held| held.id == sprint.id) {
            *held = sprint.clone();
        }
        let renamed = self.list.apply_sprint_rename(&sprint.reference());
        tracing::info!(sprint = %sprint.id, renamed, "updated sprint");
        Ok(sprint)
    }

    /// Delete every task of the sprint, then the sprint itself.
    ///
    /// The sprint delete is never issued unless all task deletes succeeded.
    /// A failure in the second phase leaves the tasks deleted and the sprint
    /// in place, reported as `CascadePhase::Sprint`.
    pub fn delete_sprint(&mut self, id: &str) -> Result<CascadeReport, AppError> {
        let sprint_id = require_id(id, "sprint id")?.to_string();

        let listing = self
            .store
            .list_tasks(&TaskFilter::sprint(sprint_id.clone()), TaskRange::all())
            .map_err(|err| AppError::cascade(&sprint_id, CascadePhase::Tasks, Vec::new(), &err))?;

        let mut deleted = Vec::with_capacity(listing.records.len());
        for task in &listing.records {
            if let Err(err) = self.store.delete_task(&task.id) {
                tracing::warn!(
                    sprint = %sprint_id,
                    task = %task.id,
                    deleted = deleted.len(),
                    error = %err,
                    "sprint cascade stopped in task phase"
                );
                self.forget(&deleted);
                return Err(AppError::cascade(&sprint_id, CascadePhase::Tasks, deleted, &err));
            }
            deleted.push(task.id.clone());
        }

        if let Err(err) = self.store.delete_sprint(&sprint_id) {
            tracing::warn!(
                sprint = %sprint_id,
                deleted = deleted.len(),
                error = %err,
                "sprint tasks deleted but sprint delete failed"
            );
            self.forget(&deleted);
            return Err(AppError::cascade(&sprint_id, CascadePhase::Sprint, deleted, &err));
        }

        self.sprints.retain(|sprint| sprint.id != sprint_id);
        tracing::info!(sprint = %sprint_id, tasks = deleted.len(), "deleted sprint");

        if self.list.sprint_filter() == Some(sprint_id.as_str()) {
            if let Err(err) = self.select_sprint(None) {
                tracing::warn!(error = %err, "could not clear filter of deleted sprint");
                self.forget(&deleted);
            }
        } else {
            self.forget(&deleted);
        }

        Ok(CascadeReport {
            sprint_id,
            deleted_task_ids: deleted,
        })
    }

    fn forget(&mut self, ids: &[String]) {
        self.apply_saved(ids.iter().cloned().map(Mutation::Deleted));
    }
}
