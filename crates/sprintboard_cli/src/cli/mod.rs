use clap::{Parser, Subcommand};
use sprintboard_core::config::canonical_key;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tasks as a parent/child tree, newest first
    ///
    /// Example: sprintboard list
    /// Example: sprintboard list --sprint sprint-1 --pages 2
    List {
        /// Only tasks of this sprint
        #[arg(long)]
        sprint: Option<String>,
        /// Number of pages to load (the first page, then load-more rounds)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
        /// Size of the first page; later pages hold 5 tasks
        #[arg(long)]
        first_page_size: Option<usize>,
    },
    /// Load the next page of the current list
    ///
    /// Example: sprintboard more
    More,
    /// Switch the sprint filter and reload
    ///
    /// Example: sprintboard select sprint-1
    /// Example: sprintboard select all
    Select { sprint: String },
    /// Add a new task
    ///
    /// Example: sprintboard add "Write release notes" --hours 2.5 --sprint sprint-1
    Add {
        subject: String,
        #[arg(long, allow_negative_numbers = true)]
        hours: f64,
        #[arg(long = "desc")]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        sprint: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Edit fields of a task
    ///
    /// Example: sprintboard edit task-1 --status working --hours 4
    /// Example: sprintboard edit task-2 --clear-parent
    Edit {
        id: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long = "desc", conflicts_with = "clear_desc")]
        description: Option<String>,
        #[arg(long)]
        clear_desc: bool,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        hours: Option<f64>,
        #[arg(long, conflicts_with = "clear_sprint")]
        sprint: Option<String>,
        #[arg(long)]
        clear_sprint: bool,
        #[arg(long, conflicts_with = "clear_parent")]
        parent: Option<String>,
        #[arg(long)]
        clear_parent: bool,
        #[arg(long, conflicts_with = "clear_assignee")]
        assignee: Option<String>,
        #[arg(long)]
        clear_assignee: bool,
    },
    /// Delete a task
    ///
    /// Example: sprintboard delete task-1
    Delete { id: String },
    /// Show details of a task
    ///
    /// Example: sprintboard show task-1
    Show { id: String },
    /// Load every child of a root task into the list
    ///
    /// Example: sprintboard children task-1
    Children { id: String },
    /// Manage sprints
    ///
    /// Example: sprintboard sprint list
    Sprint {
        #[command(subcommand)]
        sprint: SprintCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SprintCommand {
    /// List sprints, newest first
    ///
    /// Example: sprintboard sprint list
    List,
    /// Create a sprint
    ///
    /// Example: sprintboard sprint add "Sprint 12"
    Add { name: String },
    /// Rename a sprint
    ///
    /// Example: sprintboard sprint rename sprint-1 "Sprint 12b"
    Rename { id: String, name: String },
    /// Delete a sprint and every task in it
    ///
    /// Example: sprintboard sprint delete sprint-1
    Delete { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub key: String,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string. The key comes back canonicalized;
/// whether it names a known setting is decided by the config layer.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let key = canonical_key(key_raw);
    if key.is_empty() {
        return Err("override key cannot be empty".to_string());
    }

    Ok(ParsedConfigOverride {
        key,
        value: value_raw.trim().to_string(),
    })
}
