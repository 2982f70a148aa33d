use sprintboard_core::accumulator::TaskList;
use sprintboard_core::model::{Sprint, Task, TaskNode};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use time::macros::format_description;

pub fn format_hours(hours: f64) -> String {
    format!("{hours:.1}h")
}

pub fn format_timestamp(value: OffsetDateTime) -> String {
    value
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| value.to_string())
}

fn sprint_label(task: &Task) -> &str {
    match (&task.sprint, &task.sprint_id) {
        (Some(sprint), _) => &sprint.name,
        (None, Some(id)) => id,
        (None, None) => "-",
    }
}

fn node_line(node: &TaskNode, depth: usize) -> String {
    let task = &node.task;
    let indent = "  ".repeat(depth);
    let marker = if depth == 0 { "" } else { "- " };
    let mut line = format!(
        "{indent}{marker}{} | {} | {} | {}",
        task.id,
        task.subject,
        task.status,
        format_hours(task.estimated_hour)
    );
    if !node.children.is_empty() {
        line.push_str(&format!(" | total {}", format_hours(node.total_estimated_hour)));
    }
    if depth == 0 {
        line.push_str(&format!(" | {}", sprint_label(task)));
    }
    line
}

fn push_node(lines: &mut Vec<String>, node: &TaskNode, depth: usize) {
    lines.push(node_line(node, depth));
    for child in &node.children {
        push_node(lines, child, depth + 1);
    }
}

/// Plain-text rendering of the forest followed by a one-line footer.
pub fn tree_lines(list: &TaskList) -> Vec<String> {
    let mut lines = Vec::new();
    for root in list.tasks() {
        push_node(&mut lines, root, 0);
    }
    if lines.is_empty() {
        lines.push("No tasks.".to_string());
    }

    let mut footer = format!(
        "-- page {}, {} root task(s)",
        list.current_page() + 1,
        list.tasks().len()
    );
    if let Some(sprint) = list.sprint_filter() {
        footer.push_str(&format!(", sprint {sprint}"));
    }
    if list.has_more() {
        footer.push_str(", more available");
    }
    lines.push(footer);
    lines
}

pub fn tree_json(list: &TaskList) -> serde_json::Value {
    serde_json::json!({
        "tasks": list.tasks(),
        "current_page": list.current_page(),
        "has_more": list.has_more(),
        "sprint_filter": list.sprint_filter(),
    })
}

pub fn task_lines(task: &Task) -> Vec<String> {
    vec![
        format!("id:          {}", task.id),
        format!("subject:     {}", task.subject),
        format!("status:      {}", task.status),
        format!("estimate:    {}", format_hours(task.estimated_hour)),
        format!("sprint:      {}", sprint_label(task)),
        format!(
            "parent:      {}",
            task.parent_task_id.as_deref().unwrap_or("-")
        ),
        format!("assignee:    {}", task.assignee_id.as_deref().unwrap_or("-")),
        format!("description: {}", task.description.as_deref().unwrap_or("-")),
        format!("created:     {}", format_timestamp(task.created_at)),
        format!("updated:     {}", format_timestamp(task.updated_at)),
    ]
}

pub fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!(task)
}

#[derive(Tabled)]
struct SprintRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Created")]
    created: String,
}

pub fn sprint_table(sprints: &[Sprint]) -> String {
    if sprints.is_empty() {
        return "No sprints.".to_string();
    }
    let rows = sprints.iter().map(|sprint| SprintRow {
        id: sprint.id.clone(),
        name: sprint.name.clone(),
        created: format_timestamp(sprint.created_at),
    });
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    table.to_string()
}

pub fn sprints_json(sprints: &[Sprint]) -> serde_json::Value {
    serde_json::json!(sprints)
}
