//! The canonical in-memory task list and its page-fetch protocol.
//!
//! A page-0 result replaces the forest; any later page is deduplicated
//! against ids already held and appended after the existing roots. Only one
//! fetch is tracked at a time. Starting a refresh supersedes whatever was in
//! flight, and a response for a superseded ticket is dropped unapplied.

use crate::error::AppError;
use crate::fetch::{Page, fetch_page};
use crate::model::{Task, TaskNode, require_id};
use crate::paging::PageWindow;
use crate::storage::TaskStore;
use crate::tree::build_forest;
use std::collections::HashSet;

/// Handle for one issued page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    page: usize,
    sprint_filter: Option<String>,
}

impl FetchTicket {
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn sprint_filter(&self) -> Option<&str> {
        self.sprint_filter.as_deref()
    }
}

/// What completing a fetch did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Replaced { roots: usize },
    Appended { added: usize, dropped: usize },
    Discarded,
}

#[derive(Debug, Clone)]
pub struct TaskList {
    tasks: Vec<TaskNode>,
    has_more: bool,
    current_page: usize,
    sprint_filter: Option<String>,
    first_page_size: usize,
    loaded: bool,
    in_flight: Option<u64>,
    generation: u64,
}

impl TaskList {
    pub fn new(first_page_size: usize) -> Result<Self, AppError> {
        PageWindow::for_page(0, first_page_size)?;
        Ok(Self {
            tasks: Vec::new(),
            has_more: false,
            current_page: 0,
            sprint_filter: None,
            first_page_size,
            loaded: false,
            in_flight: None,
            generation: 0,
        })
    }

    pub fn tasks(&self) -> &[TaskNode] {
        &self.tasks
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn sprint_filter(&self) -> Option<&str> {
        self.sprint_filter.as_deref()
    }

    pub fn first_page_size(&self) -> usize {
        self.first_page_size
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True once a page-0 result has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Every id held in the forest, roots and children alike.
    pub fn known_ids(&self) -> HashSet<&str> {
        let mut ids = HashSet::new();
        for root in &self.tasks {
            root.for_each_id(&mut |id| {
                ids.insert(id);
            });
        }
        ids
    }

    pub fn find(&self, id: &str) -> Option<&TaskNode> {
        self.tasks.iter().find_map(|root| {
            if root.id() == id {
                Some(root)
            } else {
                root.find_child(id)
            }
        })
    }

    pub(crate) fn roots_mut(&mut self) -> &mut Vec<TaskNode> {
        &mut self.tasks
    }

    /// Issue a page-0 fetch for `sprint_filter`. Always granted.
    pub fn begin_refresh(&mut self, sprint_filter: Option<String>) -> FetchTicket {
        if self.in_flight.is_some() {
            tracing::debug!("refresh supersedes the fetch in flight");
        }
        self.issue(0, sprint_filter)
    }

    /// Issue the next page fetch, or `None` while a fetch is in flight or
    /// nothing is left to load.
    pub fn begin_load_more(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() {
            tracing::debug!("load more skipped: fetch already in flight");
            return None;
        }
        if !self.loaded || !self.has_more {
            tracing::debug!(loaded = self.loaded, "load more skipped: nothing more to load");
            return None;
        }
        let filter = self.sprint_filter.clone();
        Some(self.issue(self.current_page + 1, filter))
    }

    fn issue(&mut self, page: usize, sprint_filter: Option<String>) -> FetchTicket {
        self.generation += 1;
        self.in_flight = Some(self.generation);
        FetchTicket {
            generation: self.generation,
            page,
            sprint_filter,
        }
    }

    /// Apply the outcome of the fetch `ticket` was issued for. A failed fetch
    /// leaves tasks and cursors exactly as they were.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        outcome: Result<Page, AppError>,
    ) -> Result<Applied, AppError> {
        if self.in_flight != Some(ticket.generation) {
            match &outcome {
                Ok(page) => tracing::warn!(
                    page = ticket.page,
                    records = page.records.len(),
                    "discarding stale page"
                ),
                Err(err) => tracing::warn!(page = ticket.page, error = %err, "discarding stale fetch failure"),
            }
            return Ok(Applied::Discarded);
        }
        self.in_flight = None;

        let page = outcome?;
        let applied = if ticket.page == 0 {
            self.tasks = build_forest(page.records);
            self.sprint_filter = ticket.sprint_filter;
            self.loaded = true;
            Applied::Replaced {
                roots: self.tasks.len(),
            }
        } else {
            self.append(page.records)
        };
        self.has_more = page.has_more;
        self.current_page = ticket.page;

        tracing::debug!(
            page = self.current_page,
            roots = self.tasks.len(),
            has_more = self.has_more,
            ?applied,
            "applied task page"
        );
        Ok(applied)
    }

    fn append(&mut self, records: Vec<Task>) -> Applied {
        let fetched = records.len();
        let fresh: Vec<Task> = {
            let known = self.known_ids();
            records
                .into_iter()
                .filter(|record| !known.contains(record.id.as_str()))
                .collect()
        };
        let dropped = fetched - fresh.len();
        if dropped > 0 {
            tracing::debug!(dropped, "dropped already known records from page");
        }

        let new_roots = build_forest(fresh);
        let added = new_roots.len();
        self.tasks.extend(new_roots);
        Applied::Appended { added, dropped }
    }

    /// Fetch page 0 for `sprint_filter` and replace the list with it.
    pub fn refresh<S: TaskStore + ?Sized>(
        &mut self,
        store: &S,
        sprint_filter: Option<String>,
    ) -> Result<Applied, AppError> {
        let ticket = self.begin_refresh(sprint_filter);
        let outcome = fetch_page(store, 0, self.first_page_size, ticket.sprint_filter());
        self.complete(ticket, outcome)
    }

    /// Fetch and append the next page. `Ok(None)` when the fetch was not issued.
    pub fn load_more<S: TaskStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<Option<Applied>, AppError> {
        let Some(ticket) = self.begin_load_more() else {
            return Ok(None);
        };
        let outcome = fetch_page(
            store,
            ticket.page(),
            self.first_page_size,
            ticket.sprint_filter(),
        );
        self.complete(ticket, outcome).map(Some)
    }

    /// Replace a root's children with every child the store knows about.
    /// Returns `false` when `parent_id` is not a root of the list.
    pub fn load_children<S: TaskStore + ?Sized>(
        &mut self,
        store: &S,
        parent_id: &str,
    ) -> Result<bool, AppError> {
        let parent_id = require_id(parent_id, "parent id")?;
        let Some(position) = self.tasks.iter().position(|root| root.id() == parent_id) else {
            return Ok(false);
        };

        let children = store.list_children(parent_id)?;
        let child_ids: HashSet<&str> = children.iter().map(|child| child.id.as_str()).collect();

        // Children fetched here may currently sit as roots from a later page.
        let before = self.tasks.len();
        self.tasks
            .retain(|root| root.id() == parent_id || !child_ids.contains(root.id()));
        let absorbed = before - self.tasks.len();
        let position = self
            .tasks
            .iter()
            .position(|root| root.id() == parent_id)
            .unwrap_or(position);

        let parent = &mut self.tasks[position];
        parent.children = children.into_iter().map(TaskNode::leaf).collect();
        parent.recompute_total();

        tracing::debug!(
            parent = parent_id,
            children = parent.children.len(),
            absorbed,
            "loaded children"
        );
        Ok(true)
    }
}
