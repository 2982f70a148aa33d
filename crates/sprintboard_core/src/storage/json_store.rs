use crate::error::AppError;
use crate::model::{NewSprint, NewTask, Sprint, SprintPatch, Task, TaskPatch};
use crate::storage::{TaskFilter, TaskListing, TaskRange, TaskStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "store.json";
const STORE_ENV_VAR: &str = "SPRINTBOARD_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredBoard {
    schema_version: u32,
    #[serde(default)]
    sprints: Vec<Sprint>,
    #[serde(default)]
    tasks: Vec<Task>,
}

/// Everything the store file holds, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    pub sprints: Vec<Sprint>,
    pub tasks: Vec<Task>,
}

/// `SPRINTBOARD_STORE_PATH`, else the per-user default location.
pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::config("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("sprintboard")
            .join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::config("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("sprintboard")
            .join(STORE_FILE_NAME))
    }
}

pub fn load_state(path: &Path) -> Result<BoardState, AppError> {
    if !path.exists() {
        return Ok(BoardState::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::fetch(format!("{}: {}", path.display(), err)))?;
    let stored: StoredBoard = serde_json::from_str(&content)
        .map_err(|err| AppError::fetch(format!("invalid store {}: {}", path.display(), err)))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::fetch("schema_version mismatch"));
    }

    Ok(BoardState {
        sprints: stored.sprints,
        tasks: stored.tasks,
    })
}

pub fn save_state(path: &Path, state: &BoardState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::fetch(err.to_string()))?;
    }

    // The sprint reference is derived on read and never persisted.
    let tasks = state
        .tasks
        .iter()
        .cloned()
        .map(|mut task| {
            task.sprint = None;
            task
        })
        .collect();
    let stored = StoredBoard {
        schema_version: SCHEMA_VERSION,
        sprints: state.sprints.clone(),
        tasks,
    };
    let content =
        serde_json::to_string_pretty(&stored).map_err(|err| AppError::fetch(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::fetch(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .map_err(|err| AppError::fetch(err.to_string()))?;
    }

    Ok(())
}

/// `TaskStore` backed by a single JSON file, re-read on every call.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn enrich(state: &BoardState, mut task: Task) -> Task {
        task.sprint = task.sprint_id.as_deref().and_then(|sprint_id| {
            state
                .sprints
                .iter()
                .find(|sprint| sprint.id == sprint_id)
                .map(Sprint::reference)
        });
        task
    }

    fn enrich_all(state: &BoardState, tasks: Vec<Task>) -> Vec<Task> {
        let names: HashMap<&str, &Sprint> = state
            .sprints
            .iter()
            .map(|sprint| (sprint.id.as_str(), sprint))
            .collect();
        tasks
            .into_iter()
            .map(|mut task| {
                task.sprint = task
                    .sprint_id
                    .as_deref()
                    .and_then(|sprint_id| names.get(sprint_id))
                    .map(|sprint| sprint.reference());
                task
            })
            .collect()
    }
}

/// Filtered tasks, newest first. Equal timestamps list the later insert first.
fn ordered<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Vec<&'a Task> {
    let mut ordered: Vec<&Task> = tasks.iter().rev().filter(|task| filter.matches(task)).collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ordered
}

fn unique_id(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    loop {
        let id = format!("{prefix}-{nanos}");
        if !taken(&id) {
            return id;
        }
        nanos += 1;
    }
}

impl TaskStore for JsonStore {
    fn list_tasks(&self, filter: &TaskFilter, range: TaskRange) -> Result<TaskListing, AppError> {
        let state = load_state(&self.path)?;
        let matching = ordered(&state.tasks, filter);
        let total_count = matching.len();
        let records: Vec<Task> = matching
            .into_iter()
            .skip(range.from)
            .take(range.to.saturating_sub(range.from))
            .cloned()
            .collect();

        Ok(TaskListing {
            records: Self::enrich_all(&state, records),
            total_count,
        })
    }

    fn list_children(&self, parent_id: &str) -> Result<Vec<Task>, AppError> {
        let state = load_state(&self.path)?;
        let children: Vec<Task> = ordered(&state.tasks, &TaskFilter::default())
            .into_iter()
            .filter(|task| task.parent_task_id.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        Ok(Self::enrich_all(&state, children))
    }

    fn find_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let state = load_state(&self.path)?;
        let found = state.tasks.iter().find(|task| task.id == id).cloned();
        Ok(found.map(|task| Self::enrich(&state, task)))
    }

    fn create_task(&mut self, fields: &NewTask) -> Result<Task, AppError> {
        let mut state = load_state(&self.path)?;
        let now = OffsetDateTime::now_utc();
        let id = unique_id("task", |candidate| {
            state.tasks.iter().any(|task| task.id == candidate)
        });

        let task = Task {
            id,
            subject: fields.subject.clone(),
            description: fields.description.clone(),
            status: fields.status,
            estimated_hour: fields.estimated_hour,
            sprint_id: fields.sprint_id.clone(),
            parent_task_id: fields.parent_task_id.clone(),
            assignee_id: fields.assignee_id.clone(),
            created_at: now,
            updated_at: now,
            sprint: None,
        };

        state.tasks.push(task.clone());
        save_state(&self.path, &state)?;

        Ok(Self::enrich(&state, task))
    }

    fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task, AppError> {
        let mut state = load_state(&self.path)?;
        let mut updated_task = None;

        for task in &mut state.tasks {
            if task.id == id {
                patch.apply_to(task);
                task.updated_at = OffsetDateTime::now_utc();
                updated_task = Some(task.clone());
                break;
            }
        }

        let updated =
            updated_task.ok_or_else(|| AppError::fetch(format!("task not found: {id}")))?;
        save_state(&self.path, &state)?;

        Ok(Self::enrich(&state, updated))
    }

    fn delete_task(&mut self, id: &str) -> Result<String, AppError> {
        let mut state = load_state(&self.path)?;
        let index = state
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| AppError::fetch(format!("task not found: {id}")))?;

        let removed = state.tasks.remove(index);
        // Children of a removed task fall back to being roots.
        for task in &mut state.tasks {
            if task.parent_task_id.as_deref() == Some(id) {
                task.parent_task_id = None;
            }
        }
        save_state(&self.path, &state)?;

        Ok(removed.id)
    }

    fn list_sprints(&self) -> Result<Vec<Sprint>, AppError> {
        let state = load_state(&self.path)?;
        let mut sprints: Vec<Sprint> = state.sprints.into_iter().rev().collect();
        sprints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sprints)
    }

    fn create_sprint(&mut self, fields: &NewSprint) -> Result<Sprint, AppError> {
        let mut state = load_state(&self.path)?;
        let id = unique_id("sprint", |candidate| {
            state.sprints.iter().any(|sprint| sprint.id == candidate)
        });

        let sprint = Sprint {
            id,
            name: fields.name.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        state.sprints.push(sprint.clone());
        save_state(&self.path, &state)?;

        Ok(sprint)
    }

    fn update_sprint(&mut self, id: &str, patch: &SprintPatch) -> Result<Sprint, AppError> {
        let mut state = load_state(&self.path)?;
        let sprint = state
            .sprints
            .iter_mut()
            .find(|sprint| sprint.id == id)
            .ok_or_else(|| AppError::fetch(format!("sprint not found: {id}")))?;
        patch.apply_to(sprint);
        let updated = sprint.clone();
        save_state(&self.path, &state)?;

        Ok(updated)
    }

    fn delete_sprint(&mut self, id: &str) -> Result<String, AppError> {
        let mut state = load_state(&self.path)?;
        let index = state
            .sprints
            .iter()
            .position(|sprint| sprint.id == id)
            .ok_or_else(|| AppError::fetch(format!("sprint not found: {id}")))?;

        let referenced = state
            .tasks
            .iter()
            .filter(|task| task.sprint_id.as_deref() == Some(id))
            .count();
        if referenced > 0 {
            return Err(AppError::fetch(format!(
                "sprint {id} is still referenced by {referenced} task(s)"
            )));
        }

        let removed = state.sprints.remove(index);
        save_state(&self.path, &state)?;

        Ok(removed.id)
    }
}
