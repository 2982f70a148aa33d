use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use sprintboard_cli::cli::{Cli, Command, SprintCommand, parse_config_override};
use sprintboard_cli::render;
use sprintboard_core::board::Board;
use sprintboard_core::config::{
    Config, ConfigOverrides, load_config_with_fallback, merge_overrides,
};
use sprintboard_core::error::AppError;
use sprintboard_core::model::{NewSprint, NewTask, SprintPatch, TaskPatch, TaskStatus};
use sprintboard_core::storage::JsonStore;
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// One board kept alive across commands. Rebuilt only when a command asks
/// for a different store or first page size.
struct Session {
    base: Config,
    store_path: PathBuf,
    board: Board<JsonStore>,
}

impl Session {
    fn open(base: Config) -> Result<Self, AppError> {
        let store_path = base.store_location()?;
        let board = Board::new(JsonStore::new(store_path.clone()), base.first_page_size())?;
        tracing::debug!(path = %store_path.display(), "opened store");
        Ok(Self {
            base,
            store_path,
            board,
        })
    }

    fn configure(
        &mut self,
        overrides: &ConfigOverrides,
        first_page_size: Option<usize>,
    ) -> Result<(), AppError> {
        let config = merge_overrides(&self.base, overrides);
        let store_path = config.store_location()?;
        let size = first_page_size.or(overrides.first_page_size);

        let size_changed = size.is_some_and(|size| size != self.board.tasks().first_page_size());
        if store_path != self.store_path || size_changed {
            let size = size.unwrap_or_else(|| config.first_page_size());
            self.board = Board::new(JsonStore::new(store_path.clone()), size)?;
            tracing::debug!(path = %store_path.display(), first_page_size = size, "reopened store");
            self.store_path = store_path;
        }
        Ok(())
    }

    fn ensure_loaded(&mut self) -> Result<(), AppError> {
        if !self.board.tasks().is_loaded() {
            self.board.refresh()?;
        }
        Ok(())
    }

    fn run(&mut self, cli: Cli) -> Result<(), AppError> {
        let overrides = parse_overrides(&cli.config_override)?;
        let page_size = match &cli.command {
            Command::List {
                first_page_size, ..
            } => *first_page_size,
            _ => None,
        };
        self.configure(&overrides, page_size)?;

        let json = cli.json;
        match cli.command {
            Command::List { sprint, pages, .. } => {
                self.board.select_sprint(sprint.as_deref())?;
                for _ in 1..pages {
                    if self.board.load_more()?.is_none() {
                        break;
                    }
                }
                self.print_tree(json);
            }
            Command::More => {
                self.ensure_loaded()?;
                if self.board.load_more()?.is_none() && !json {
                    println!("Nothing more to load.");
                }
                self.print_tree(json);
            }
            Command::Select { sprint } => {
                let filter = if sprint.trim().eq_ignore_ascii_case("all") {
                    None
                } else {
                    Some(sprint.as_str())
                };
                self.board.select_sprint(filter)?;
                self.print_tree(json);
            }
            Command::Add {
                subject,
                hours,
                description,
                status,
                sprint,
                parent,
                assignee,
            } => {
                let mut fields = NewTask::new(subject, hours);
                fields.description = description;
                fields.status = parse_status(status.as_deref())?.unwrap_or_default();
                fields.sprint_id = sprint;
                fields.parent_task_id = parent;
                fields.assignee_id = assignee;

                let task = self.board.create_task(&fields)?;
                if json {
                    println!("{}", render::task_json(&task));
                } else {
                    println!("Added task: {} ({})", task.subject, task.id);
                }
            }
            Command::Edit {
                id,
                subject,
                description,
                clear_desc,
                status,
                hours,
                sprint,
                clear_sprint,
                parent,
                clear_parent,
                assignee,
                clear_assignee,
            } => {
                let patch = TaskPatch {
                    subject,
                    description: nullable(description, clear_desc),
                    status: parse_status(status.as_deref())?,
                    estimated_hour: hours,
                    sprint_id: nullable(sprint, clear_sprint),
                    parent_task_id: nullable(parent, clear_parent),
                    assignee_id: nullable(assignee, clear_assignee),
                };

                let task = self.board.update_task(&id, &patch)?;
                if json {
                    println!("{}", render::task_json(&task));
                } else {
                    println!("Updated task: {} ({})", task.subject, task.id);
                }
            }
            Command::Delete { id } => {
                let deleted = self.board.delete_task(&id)?;
                if json {
                    println!("{}", serde_json::json!({ "id": deleted }));
                } else {
                    println!("Deleted task: {deleted}");
                }
            }
            Command::Show { id } => {
                let task = self.board.get_task(&id)?;
                if json {
                    println!("{}", render::task_json(&task));
                } else {
                    for line in render::task_lines(&task) {
                        println!("{line}");
                    }
                }
            }
            Command::Children { id } => {
                self.ensure_loaded()?;
                if !self.board.load_children(&id)? {
                    return Err(AppError::validation(format!(
                        "task {} is not a root task of the loaded list",
                        id.trim()
                    )));
                }
                self.print_tree(json);
            }
            Command::Sprint { sprint } => self.run_sprint(sprint, json)?,
        }

        Ok(())
    }

    fn run_sprint(&mut self, command: SprintCommand, json: bool) -> Result<(), AppError> {
        match command {
            SprintCommand::List => {
                let sprints = self.board.load_sprints()?;
                if json {
                    println!("{}", render::sprints_json(sprints));
                } else {
                    println!("{}", render::sprint_table(sprints));
                }
            }
            SprintCommand::Add { name } => {
                let sprint = self.board.create_sprint(&NewSprint::new(name))?;
                if json {
                    println!("{}", serde_json::json!(sprint));
                } else {
                    println!("Added sprint: {} ({})", sprint.name, sprint.id);
                }
            }
            SprintCommand::Rename { id, name } => {
                let patch = SprintPatch { name: Some(name) };
                let sprint = self.board.update_sprint(&id, &patch)?;
                if json {
                    println!("{}", serde_json::json!(sprint));
                } else {
                    println!("Renamed sprint: {} ({})", sprint.name, sprint.id);
                }
            }
            SprintCommand::Delete { id } => {
                let report = self.board.delete_sprint(&id)?;
                if json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "sprint_id": report.sprint_id,
                            "deleted_task_ids": report.deleted_task_ids,
                        })
                    );
                } else {
                    println!(
                        "Deleted sprint: {} ({} task(s) removed)",
                        report.sprint_id,
                        report.deleted_task_ids.len()
                    );
                }
            }
        }
        Ok(())
    }

    fn print_tree(&self, json: bool) {
        if json {
            println!("{}", render::tree_json(self.board.tasks()));
        } else {
            for line in render::tree_lines(self.board.tasks()) {
                println!("{line}");
            }
        }
    }
}

fn nullable(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear { Some(None) } else { value.map(Some) }
}

fn parse_status(raw: Option<&str>) -> Result<Option<TaskStatus>, AppError> {
    raw.map(str::parse::<TaskStatus>).transpose()
}

fn parse_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::config)?;
        overrides.set(&parsed.key, &parsed.value)?;
    }
    Ok(overrides)
}

fn init_logging(configured: Option<&str>) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => configured
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::validation(message)
}

fn is_informational(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
    )
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::validation("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_interactive(config: Config) -> Result<(), AppError> {
    let mut session = Session::open(config)?;
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::fetch(format!("could not read command: {err}")))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("sprintboard".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) if is_informational(&err) => {
                println!("{err}");
                continue;
            }
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = session.run(cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn report_config_error(error: Option<AppError>) {
    if let Some(err) = error {
        tracing::warn!(error = %err, "configuration ignored, using defaults");
    }
}

fn main() {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        let load = load_config_with_fallback();
        init_logging(load.config.log_filter.as_deref());
        report_config_error(load.error);

        if let Err(err) = run_interactive(load.config) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if is_informational(&err) => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let load = load_config_with_fallback();
    let log_filter = parse_overrides(&cli.config_override)
        .ok()
        .and_then(|overrides| overrides.log_filter)
        .or_else(|| load.config.log_filter.clone());
    init_logging(log_filter.as_deref());
    report_config_error(load.error);

    let result = Session::open(load.config).and_then(|mut session| session.run(cli));
    if let Err(err) = result {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{nullable, split_command_line};

    #[test]
    fn split_command_line_keeps_quoted_words() {
        let args = split_command_line(r#"add "Write release notes" --hours 2"#).unwrap();
        assert_eq!(args, vec!["add", "Write release notes", "--hours", "2"]);
    }

    #[test]
    fn split_command_line_rejects_open_quote() {
        let err = split_command_line(r#"add "oops"#).unwrap_err();
        assert_eq!(err.code(), "validation_failed");
    }

    #[test]
    fn nullable_prefers_clear() {
        assert_eq!(nullable(Some("x".into()), true), Some(None));
        assert_eq!(nullable(Some("x".into()), false), Some(Some("x".to_string())));
        assert_eq!(nullable(None, false), None);
    }
}
