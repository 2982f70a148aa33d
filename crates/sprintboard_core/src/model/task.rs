use crate::error::AppError;
use crate::model::SprintRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub estimated_hour: f64,
    #[serde(default)]
    pub sprint_id: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Denormalized sprint reference, filled in by the store on read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint: Option<SprintRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "Open")]
    Open,
    #[serde(alias = "Working")]
    Working,
    #[serde(alias = "Completed")]
    Completed,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Working => "working",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "working" | "in-progress" | "in_progress" => Ok(Self::Working),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(AppError::validation(format!(
                "unknown status '{other}' (expected open, working or completed)"
            ))),
        }
    }
}

/// A task placed in the forest: its record, its children and the aggregated estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskNode {
    #[serde(flatten)]
    pub task: Task,
    pub children: Vec<TaskNode>,
    pub total_estimated_hour: f64,
}

impl TaskNode {
    pub fn leaf(task: Task) -> Self {
        let total_estimated_hour = task.estimated_hour;
        Self {
            task,
            children: Vec::new(),
            total_estimated_hour,
        }
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    /// Recompute `total_estimated_hour` for this node and everything below it.
    pub fn recompute_total(&mut self) -> f64 {
        self.total_estimated_hour = if self.children.is_empty() {
            self.task.estimated_hour
        } else {
            self.children
                .iter_mut()
                .map(TaskNode::recompute_total)
                .sum()
        };
        self.total_estimated_hour
    }

    /// Visit this node's id and the ids of all its descendants.
    pub fn for_each_id<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        visit(&self.task.id);
        for child in &self.children {
            child.for_each_id(visit);
        }
    }

    pub fn find_child(&self, id: &str) -> Option<&TaskNode> {
        self.children.iter().find_map(|child| {
            if child.id() == id {
                Some(child)
            } else {
                child.find_child(id)
            }
        })
    }
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewTask {
    pub subject: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub estimated_hour: f64,
    pub sprint_id: Option<String>,
    pub parent_task_id: Option<String>,
    pub assignee_id: Option<String>,
}

impl NewTask {
    pub fn new(subject: impl Into<String>, estimated_hour: f64) -> Self {
        Self {
            subject: subject.into(),
            estimated_hour,
            ..Self::default()
        }
    }

    /// Check shape constraints and return a normalized copy.
    pub fn validated(&self) -> Result<NewTask, AppError> {
        Ok(NewTask {
            subject: validate_subject(&self.subject)?,
            description: normalize_optional(self.description.as_deref()),
            status: self.status,
            estimated_hour: validate_estimate(self.estimated_hour)?,
            sprint_id: normalize_optional(self.sprint_id.as_deref()),
            parent_task_id: normalize_optional(self.parent_task_id.as_deref()),
            assignee_id: normalize_optional(self.assignee_id.as_deref()),
        })
    }
}

/// Partial update of a task. For nullable fields the outer `Option` means
/// "change this field" and the inner one carries the new value or a clear.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskPatch {
    pub subject: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub estimated_hour: Option<f64>,
    pub sprint_id: Option<Option<String>>,
    pub parent_task_id: Option<Option<String>>,
    pub assignee_id: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    pub fn validated(&self) -> Result<TaskPatch, AppError> {
        if self.is_empty() {
            return Err(AppError::validation("no fields to update"));
        }

        Ok(TaskPatch {
            subject: self.subject.as_deref().map(validate_subject).transpose()?,
            description: self
                .description
                .as_ref()
                .map(|value| normalize_optional(value.as_deref())),
            status: self.status,
            estimated_hour: self.estimated_hour.map(validate_estimate).transpose()?,
            sprint_id: self
                .sprint_id
                .as_ref()
                .map(|value| normalize_optional(value.as_deref())),
            parent_task_id: self
                .parent_task_id
                .as_ref()
                .map(|value| normalize_optional(value.as_deref())),
            assignee_id: self
                .assignee_id
                .as_ref()
                .map(|value| normalize_optional(value.as_deref())),
        })
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(subject) = &self.subject {
            task.subject = subject.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(estimated_hour) = self.estimated_hour {
            task.estimated_hour = estimated_hour;
        }
        if let Some(sprint_id) = &self.sprint_id {
            task.sprint_id = sprint_id.clone();
        }
        if let Some(parent_task_id) = &self.parent_task_id {
            task.parent_task_id = parent_task_id.clone();
        }
        if let Some(assignee_id) = &self.assignee_id {
            task.assignee_id = assignee_id.clone();
        }
    }
}

fn validate_subject(subject: &str) -> Result<String, AppError> {
    let trimmed = subject.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("subject is required"));
    }
    Ok(trimmed.to_string())
}

fn validate_estimate(estimated_hour: f64) -> Result<f64, AppError> {
    if !estimated_hour.is_finite() || estimated_hour < 0.0 {
        return Err(AppError::validation(
            "estimated_hour must be a non-negative number",
        ));
    }
    Ok(estimated_hour)
}

fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{NewTask, Task, TaskNode, TaskPatch, TaskStatus};
    use time::macros::datetime;

    fn task(id: &str, hours: f64) -> Task {
        Task {
            id: id.to_string(),
            subject: id.to_string(),
            description: None,
            status: TaskStatus::Open,
            estimated_hour: hours,
            sprint_id: None,
            parent_task_id: None,
            assignee_id: None,
            created_at: datetime!(2025-09-01 00:00 UTC),
            updated_at: datetime!(2025-09-01 00:00 UTC),
            sprint: None,
        }
    }

    #[test]
    fn new_task_rejects_blank_subject() {
        let err = NewTask::new("   ", 2.0).validated().unwrap_err();
        assert_eq!(err.code(), "validation_failed");
    }

    #[test]
    fn new_task_rejects_negative_estimate() {
        let err = NewTask::new("write docs", -1.0).validated().unwrap_err();
        assert_eq!(err.code(), "validation_failed");

        let err = NewTask::new("write docs", f64::NAN).validated().unwrap_err();
        assert_eq!(err.code(), "validation_failed");
    }

    #[test]
    fn new_task_trims_and_drops_blank_optionals() {
        let mut fields = NewTask::new("  write docs ", 0.0);
        fields.description = Some("  ".into());
        fields.sprint_id = Some(" sprint-1 ".into());

        let validated = fields.validated().unwrap();
        assert_eq!(validated.subject, "write docs");
        assert_eq!(validated.description, None);
        assert_eq!(validated.sprint_id.as_deref(), Some("sprint-1"));
    }

    #[test]
    fn empty_patch_is_rejected() {
        let err = TaskPatch::default().validated().unwrap_err();
        assert_eq!(err.message(), "no fields to update");
    }

    #[test]
    fn patch_can_clear_nullable_fields() {
        let mut record = task("task-1", 3.0);
        record.sprint_id = Some("sprint-1".into());
        record.description = Some("notes".into());

        let patch = TaskPatch {
            sprint_id: Some(None),
            description: Some(None),
            status: Some(TaskStatus::Working),
            ..TaskPatch::default()
        };
        patch.validated().unwrap().apply_to(&mut record);

        assert_eq!(record.sprint_id, None);
        assert_eq!(record.description, None);
        assert_eq!(record.status, TaskStatus::Working);
        assert_eq!(record.estimated_hour, 3.0);
    }

    #[test]
    fn status_parses_loose_spellings() {
        assert_eq!("Open".parse::<TaskStatus>().unwrap(), TaskStatus::Open);
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::Working);
        assert_eq!("DONE".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert!("later".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn status_reads_capitalized_values() {
        let parsed: TaskStatus = serde_json::from_str("\"Working\"").unwrap();
        assert_eq!(parsed, TaskStatus::Working);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"working\"");
    }

    #[test]
    fn recompute_total_ignores_parent_estimate_once_it_has_children() {
        let mut parent = TaskNode::leaf(task("parent", 100.0));
        parent.children.push(TaskNode::leaf(task("a", 2.0)));
        parent.children.push(TaskNode::leaf(task("b", 3.5)));

        assert_eq!(parent.recompute_total(), 5.5);
        assert_eq!(parent.children[0].total_estimated_hour, 2.0);
    }

    #[test]
    fn node_serializes_flat_with_children() {
        let mut parent = TaskNode::leaf(task("parent", 1.0));
        parent.children.push(TaskNode::leaf(task("child", 4.0)));
        parent.recompute_total();

        let json = serde_json::to_value(&parent).unwrap();
        assert_eq!(json["id"], "parent");
        assert_eq!(json["total_estimated_hour"], 4.0);
        assert_eq!(json["children"][0]["id"], "child");
        assert!(json.get("sprint").is_none());
    }
}
