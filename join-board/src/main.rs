//! `join-board`: command-line kanban board for the `Join` task manager.
//!
//! Opens the JSON task file, applies one command through the board
//! controller, and prints the notifications and the resulting board.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/join-board/config.toml`).
//!
//! ```bash
//! # Print the board
//! cargo run --bin join-board
//!
//! # Create a task, then drag it to "In Progress"
//! cargo run --bin join-board -- add "Write docs" -d "API docs" -k "Technical Task"
//! cargo run --bin join-board -- move <id> progressList 0
//! ```

use std::collections::HashSet;
use std::error::Error;
use std::path::Path;

use chrono::{Local, NaiveDate, Timelike};
use clap::Parser;
use join_proto::column::ColumnId;
use join_proto::task::{Priority, Subtask, Task, TaskId, TaskStatus};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use join_board::columns::Column;
use join_board::config::{BoardConfig, CliArgs, Command};
use join_board::controller::BoardController;
use join_board::dragdrop::{DragDropEngine, DropEvent, DropOutcome};
use join_board::highlight::HighlightRequest;
use join_board::notify::{ChannelNotifier, Notification};
use join_board::permission::PermissionService;
use join_board::store::file::JsonFileStore;
use join_board::summary::{BoardSummary, greeting};

type Board = BoardController<JsonFileStore, ChannelNotifier, PermissionService>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = CliArgs::parse();

    let config = match BoardConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            BoardConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!(store = %config.store_path.display(), "join-board starting");

    let store = JsonFileStore::open(&config.store_path).await?;
    let (notifier, mut toasts) = ChannelNotifier::new(config.channel_capacity);
    let (permissions, _permission_handle) = PermissionService::new(config.capabilities());
    let engine = DragDropEngine::new(store.clone(), notifier)
        .with_policy(config.drop_policy())
        .with_durations(config.durations);
    let mut board = BoardController::new(engine, permissions);
    board.apply_snapshot(store.snapshot());

    let command = cli.command.unwrap_or(Command::Show {
        search: None,
        highlight_task: None,
        highlight_status: None,
        highlight_urgent: false,
    });
    let result = execute(&mut board, command).await;

    print_toasts(&mut toasts);
    tracing::info!("join-board exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs are written to a file so stdout stays reserved for board output.
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("join-board.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn execute(board: &mut Board, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Show {
            search,
            highlight_task,
            highlight_status,
            highlight_urgent,
        } => {
            if let Some(term) = search {
                board.apply_filter(&term);
            }
            let request = HighlightRequest::from_params(
                highlight_task.as_deref(),
                highlight_status.as_deref(),
                highlight_urgent,
            );
            let highlighted: HashSet<TaskId> = request
                .map(|r| board.highlight(&r).into_iter().collect())
                .unwrap_or_default();
            print_board(board, &highlighted);
        }
        Command::Move {
            id,
            to,
            index,
            search,
        } => {
            if let Some(term) = search {
                board.apply_filter(&term);
            }
            let event = drop_event(board, &TaskId::from(id), &to, index)?;
            match board.on_drop(event).await {
                DropOutcome::Rejected(reason) => println!("Move rejected: {reason}"),
                DropOutcome::Unchanged(_) => println!("Nothing to move."),
                DropOutcome::Completed { report, .. } => {
                    for (task_id, e) in &report.failed {
                        println!("Update of {task_id} failed: {e}");
                    }
                }
            }
            print_board(board, &HashSet::new());
        }
        Command::Add {
            title,
            description,
            category,
            status,
            priority,
            due,
            assigned_to,
            subtasks,
        } => {
            let status: TaskStatus = status.parse()?;
            let due_date = due
                .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
                .transpose()?;
            let task = Task {
                description,
                category,
                due_date,
                priority: priority.parse::<Priority>()?,
                assigned_to: assigned_to.into_iter().collect(),
                subtasks: subtasks.into_iter().map(Subtask::new).collect(),
                ..Task::new(title, status)
            };
            let id = board.create_task(task).await?;
            println!("Created task {id}");
        }
        Command::Delete { id } => {
            let id = TaskId::from(id);
            board.delete_task(&id).await?;
            println!("Deleted task {id}");
        }
        Command::Toggle { id, index } => {
            let done = board.toggle_subtask(&TaskId::from(id), index).await?;
            println!("Subtask {index} is now {}", if done { "done" } else { "open" });
        }
        Command::Summary => print_summary(&board.summary()),
    }
    Ok(())
}

/// Builds the drop event a drag of `id` onto `to` at `index` would emit.
///
/// `to` may be a list id or a status name. Indices refer to the visible
/// (possibly filtered) columns.
fn drop_event(
    board: &Board,
    id: &TaskId,
    to: &str,
    index: usize,
) -> Result<DropEvent, Box<dyn Error>> {
    let (source, previous_index, task) = board
        .visible_columns()
        .iter()
        .find_map(|c| c.position_of(id).map(|i| (c.id, i, c.tasks[i].clone())))
        .ok_or_else(|| format!("task {id} is not on the visible board"))?;

    let target = ColumnId::from_list_id(to)
        .or_else(|| to.parse::<TaskStatus>().ok().map(ColumnId::for_status))
        .map_or_else(|| to.to_string(), |c| c.as_str().to_string());

    Ok(DropEvent::new(task, source.as_str(), target, previous_index, index))
}

fn print_board(board: &Board, highlighted: &HashSet<TaskId>) {
    if !board.search_term().trim().is_empty() {
        println!("Search: {:?}", board.search_term());
    }
    if board.no_tasks_found() {
        println!("No tasks found.");
        return;
    }
    for column in board.visible_columns() {
        print_column(column, highlighted);
    }
    let unrecognized = board.unrecognized();
    if !unrecognized.is_empty() {
        println!("Unrecognized status ({})", unrecognized.len());
        for task in unrecognized {
            println!("  - {} [{}] status={}", task.title, id_str(task), task.status);
        }
    }
}

fn print_column(column: &Column, highlighted: &HashSet<TaskId>) {
    println!("{} ({})", column.title(), column.tasks.len());
    for (i, task) in column.tasks.iter().enumerate() {
        let marker = task
            .id
            .as_ref()
            .filter(|id| highlighted.contains(*id))
            .map_or(' ', |_| '*');
        let progress = task.subtask_progress().map_or_else(String::new, |p| {
            format!(" {}/{} subtasks ({p}%)", task.completed_subtasks(), task.subtasks.len())
        });
        println!(
            "{marker} {i}. {} [{}] {}{progress}",
            task.title,
            id_str(task),
            task.priority
        );
    }
}

fn print_summary(summary: &BoardSummary) {
    println!("{}!", greeting(Local::now().hour()));
    println!("To Do:           {}", summary.todo);
    println!("In Progress:     {}", summary.in_progress);
    println!("Await Feedback:  {}", summary.feedback);
    println!("Done:            {}", summary.done);
    println!("Urgent:          {}", summary.urgent);
    println!("Tasks in board:  {}", summary.total);
    if summary.unrecognized > 0 {
        println!("Unrecognized:    {}", summary.unrecognized);
    }
    if let Some(deadline) = summary.upcoming_deadline {
        println!("Upcoming deadline: {}", deadline.format("%B %-d, %Y"));
    }
}

fn print_toasts(toasts: &mut mpsc::Receiver<Notification>) {
    while let Ok(toast) = toasts.try_recv() {
        println!(">> {}", toast.message);
    }
}

fn id_str(task: &Task) -> &str {
    task.id.as_ref().map_or("unsaved", TaskId::as_str)
}
