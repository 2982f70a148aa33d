//! Single-record patches to a loaded `TaskList`.
//!
//! Only root-level changes are patched in place. Anything that changes the
//! shape of the tree answers `ReloadRequired` and the caller refetches page 0.

use crate::accumulator::TaskList;
use crate::model::{SprintRef, Task, TaskNode};

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Inserted(Task),
    Updated(Task),
    Deleted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Applied,
    /// The record is not part of the current view.
    Ignored,
    ReloadRequired,
}

impl TaskList {
    pub fn apply(&mut self, mutation: Mutation) -> Reconciled {
        let outcome = match mutation {
            Mutation::Inserted(task) => self.apply_insert(task),
            Mutation::Updated(task) => self.apply_update(task),
            Mutation::Deleted(id) => self.apply_delete(&id),
        };
        tracing::debug!(?outcome, "reconciled mutation");
        outcome
    }

    /// Refresh the denormalized sprint reference on every held task of that
    /// sprint. Returns how many tasks changed.
    pub fn apply_sprint_rename(&mut self, sprint: &SprintRef) -> usize {
        fn visit(node: &mut TaskNode, sprint: &SprintRef) -> usize {
            let mut changed = 0;
            if node.task.sprint_id.as_deref() == Some(sprint.id.as_str()) {
                node.task.sprint = Some(sprint.clone());
                changed += 1;
            }
            changed
                + node
                    .children
                    .iter_mut()
                    .map(|child| visit(child, sprint))
                    .sum::<usize>()
        }

        self.roots_mut()
            .iter_mut()
            .map(|root| visit(root, sprint))
            .sum()
    }

    fn in_view(&self, task: &Task) -> bool {
        match self.sprint_filter() {
            Some(sprint_id) => task.sprint_id.as_deref() == Some(sprint_id),
            None => true,
        }
    }

    fn apply_insert(&mut self, task: Task) -> Reconciled {
        if task.parent_task_id.is_some() {
            return Reconciled::ReloadRequired;
        }
        if !self.in_view(&task) || self.find(&task.id).is_some() {
            return Reconciled::Ignored;
        }
        self.roots_mut().insert(0, TaskNode::leaf(task));
        Reconciled::Applied
    }

    fn apply_update(&mut self, task: Task) -> Reconciled {
        let in_view = self.in_view(&task);
        let Some(position) = self.tasks().iter().position(|root| root.id() == task.id) else {
            if self.find(&task.id).is_some() {
                return Reconciled::ReloadRequired;
            }
            return Reconciled::Ignored;
        };

        if task.parent_task_id.is_some() || !in_view {
            return Reconciled::ReloadRequired;
        }

        let root = &mut self.roots_mut()[position];
        root.task = task;
        root.recompute_total();
        Reconciled::Applied
    }

    fn apply_delete(&mut self, id: &str) -> Reconciled {
        let Some(position) = self.tasks().iter().position(|root| root.id() == id) else {
            if self.find(id).is_some() {
                return Reconciled::ReloadRequired;
            }
            return Reconciled::Ignored;
        };

        let removed = self.roots_mut().remove(position);
        if !removed.children.is_empty() {
            tracing::warn!(
                task = id,
                children = removed.children.len(),
                "deleted task had children; they stay hidden until the next reload"
            );
        }
        Reconciled::Applied
    }
}
