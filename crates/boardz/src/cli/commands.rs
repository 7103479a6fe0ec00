//! # CLI Layer
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Installs the tracing subscriber
//! - Owns the async runtime
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: shell arguments into typed commands via clap
//! 2. **Provider Setup**: configuration plus flags into the active provider
//! 3. **Dispatch**: one handler per command, each returning its output
//! 4. **Error Handling**: errors bubble up to `main`, which exits with 1

use super::refs::{self, format_path};
use super::render::{self, BoardLine, ColumnLine, TaskNode};
use super::setup::{
    parse_cli, BoardAction, Cli, ColumnAction, Commands, StorageArgs, TaskAction,
};
use anyhow::{bail, Context, Result};
use boardzapp::config::BoardzConfig;
use boardzapp::model::{BoardPatch, ColumnPatch, SettingsPatch, Task, TaskDraft, TaskPatch};
use boardzapp::provider::DataProvider;
use boardzapp::registry::{self, ProviderConfig};
use boardzapp::store::document::Document;
use chrono::{DateTime, NaiveDate, Utc};
use std::fs;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "BOARDZ_LOG";

pub fn run() -> Result<()> {
    let cli = parse_cli();
    init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let output = runtime.block_on(dispatch(cli))?;
    print!("{}", output);
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loaded configuration with command-line overrides on top.
fn provider_config(storage: &StorageArgs) -> Result<ProviderConfig> {
    let mut config = match &storage.config {
        Some(path) => BoardzConfig::load(Some(path.as_path())),
        None => BoardzConfig::load_default(),
    }?;
    if let Some(backend) = &storage.backend {
        config.backend = backend.clone();
    }
    if let Some(url) = &storage.api_url {
        config.api_url = Some(url.clone());
    }
    if let Some(token) = &storage.api_token {
        config.api_token = Some(token.clone());
    }
    if let Some(dir) = &storage.data_dir {
        config.data_dir = Some(dir.clone());
    }
    Ok(config.provider_config()?)
}

async fn dispatch(cli: Cli) -> Result<String> {
    let config = provider_config(&cli.storage)?;
    let provider = registry::initialize_provider(&config)
        .await
        .with_context(|| format!("could not open the {} backend", config.kind))?;
    let p = provider.as_ref();
    debug!(backend = %config.kind, "dispatching command");

    match cli.command.unwrap_or(Commands::Boards) {
        Commands::Boards => list_boards(p).await,
        Commands::Board { action } => board(p, action).await,
        Commands::Columns { board } => list_columns(p, board.as_deref()).await,
        Commands::Column { action } => column(p, action).await,
        Commands::Tasks { column } => list_tasks(p, &column).await,
        Commands::Task { action } => task(p, action).await,
        Commands::Settings {
            select,
            unselect,
            calendar,
        } => settings(p, select.as_deref(), unselect, calendar).await,
        Commands::Export { path } => {
            let doc = p.export_document().await?;
            let json = serde_json::to_string_pretty(&doc)?;
            fs::write(&path, json)
                .with_context(|| format!("could not write {}", path.display()))?;
            Ok(render::success(format!(
                "Exported {} boards to {}",
                doc.boards.len(),
                path.display()
            )))
        }
        Commands::Import { path } => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("could not read {}", path.display()))?;
            let doc: Document = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a board document", path.display()))?;
            let boards = doc.boards.len();
            p.import_document(doc).await?;
            Ok(render::success(format!("Imported {} boards", boards)))
        }
        Commands::ResetRepeating => {
            let reset = p.reset_repeating_tasks(Utc::now()).await?;
            let mut out = render::success(format!("Reopened {} repeating tasks", reset.len()));
            for task in &reset {
                out.push_str(&format!("  {}\n", task.title));
            }
            Ok(out)
        }
        Commands::Due { from, to } => {
            let (start, end) = (parse_when(&from)?, parse_when(&to)?);
            if end <= start {
                bail!("`{}` must be after `{}`", to, from);
            }
            let tasks = p.get_tasks_due_between(start, end).await?;
            Ok(render::due(&tasks, Utc::now()))
        }
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_when(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .with_context(|| format!("`{}` is not a date (use YYYY-MM-DD or RFC 3339)", input))
}

fn words(parts: &[String]) -> String {
    parts.join(" ")
}

// --- Boards ---

async fn list_boards(p: &dyn DataProvider) -> Result<String> {
    let settings = p.get_settings().await?;
    let mut lines = Vec::new();
    for board in p.get_boards().await? {
        let progress = p.board_progress(&board.id).await?;
        lines.push(BoardLine {
            selected: settings.selected_board_id.as_deref() == Some(board.id.as_str()),
            board,
            progress,
        });
    }
    Ok(render::boards(&lines))
}

async fn board(p: &dyn DataProvider, action: BoardAction) -> Result<String> {
    match action {
        BoardAction::Add { name } => {
            let board = p.create_board(&words(&name)).await?;
            Ok(render::success(format!(
                "Created board {}. {}",
                board.order + 1,
                board.name
            )))
        }
        BoardAction::Rename { board, name } => {
            let id = refs::board_id(p, &board).await?;
            let board = p.update_board(&id, BoardPatch::rename(words(&name))).await?;
            Ok(render::success(format!("Renamed board to {}", board.name)))
        }
        BoardAction::Rm { board } => {
            let id = refs::board_id(p, &board).await?;
            let name = p.get_board(&id).await?.name;
            p.delete_board(&id).await?;
            Ok(render::success(format!("Deleted board {}", name)))
        }
        BoardAction::Select { board } => {
            let id = refs::board_id(p, &board).await?;
            p.update_settings(SettingsPatch::select_board(Some(id.clone())))
                .await?;
            let board = p.get_board(&id).await?;
            Ok(render::success(format!("Selected {}", board.name)))
        }
        BoardAction::Order { boards } => {
            let mut ids = Vec::new();
            for board in &boards {
                ids.push(refs::board_id(p, board).await?);
            }
            p.reorder_boards(&ids).await?;
            list_boards(p).await
        }
    }
}

// --- Columns ---

/// The board named by `input`, else the selected board, else the first one.
async fn board_or_default(p: &dyn DataProvider, input: Option<&str>) -> Result<Option<String>> {
    if let Some(input) = input {
        return Ok(Some(refs::board_id(p, input).await?));
    }
    if let Some(id) = p.get_settings().await?.selected_board_id {
        return Ok(Some(id));
    }
    Ok(p.get_boards().await?.into_iter().next().map(|b| b.id))
}

async fn list_columns(p: &dyn DataProvider, board: Option<&str>) -> Result<String> {
    let Some(board_id) = board_or_default(p, board).await? else {
        return Ok(render::boards(&[]));
    };
    let board = p.get_board(&board_id).await?;
    let path = refs::board_path(p, &board.id).await?;
    let mut lines = Vec::new();
    for column in p.get_columns(&board.id).await? {
        let tasks = p.get_tasks(&column.id).await?.len();
        lines.push(ColumnLine { column, tasks });
    }
    Ok(render::columns(&board, &path, &lines))
}

async fn column(p: &dyn DataProvider, action: ColumnAction) -> Result<String> {
    match action {
        ColumnAction::Add { board, name } => {
            let board_id = refs::board_id(p, &board).await?;
            let column = p.create_column(&words(&name), &board_id).await?;
            let path = refs::column_path(p, &column).await?;
            Ok(render::success(format!(
                "Added column {} {}",
                format_path(&path),
                column.name
            )))
        }
        ColumnAction::Rename { column, name } => {
            let id = refs::column(p, &column).await?.id;
            let column = p.update_column(&id, ColumnPatch::rename(words(&name))).await?;
            Ok(render::success(format!("Renamed column to {}", column.name)))
        }
        ColumnAction::Rm { column } => {
            let column = refs::column(p, &column).await?;
            let tasks = p.get_tasks(&column.id).await?.len();
            p.delete_column(&column.id).await?;
            let mut out = render::success(format!("Deleted column {}", column.name));
            if tasks > 0 {
                out.push_str(&render::warning(format!(
                    "{} tasks were removed with it",
                    tasks
                )));
            }
            Ok(out)
        }
        ColumnAction::Order { board, columns } => {
            let board_id = refs::board_id(p, &board).await?;
            let mut ids = Vec::new();
            for column in &columns {
                ids.push(refs::column(p, column).await?.id);
            }
            p.reorder_columns(&board_id, &ids).await?;
            list_columns(p, Some(board.as_str())).await
        }
    }
}

// --- Tasks ---

fn load_tree<'a>(
    p: &'a dyn DataProvider,
    tasks: Vec<Task>,
) -> Pin<Box<dyn Future<Output = Result<Vec<TaskNode>>> + Send + 'a>> {
    Box::pin(async move {
        let mut nodes = Vec::with_capacity(tasks.len());
        for task in tasks {
            let subtasks = p.get_subtasks(&task.id).await?;
            let children = load_tree(p, subtasks).await?;
            nodes.push(TaskNode { task, children });
        }
        Ok(nodes)
    })
}

async fn list_tasks(p: &dyn DataProvider, column: &str) -> Result<String> {
    let column = refs::column(p, column).await?;
    let path = refs::column_path(p, &column).await?;
    let tree = load_tree(p, p.get_tasks(&column.id).await?).await?;
    Ok(render::tasks(&column, &path, &tree, Utc::now()))
}

async fn show_task(p: &dyn DataProvider, task: Task) -> Result<String> {
    let path = refs::task_path(p, &task).await?;
    let progress = p.task_progress(&task.id).await?;
    let children = load_tree(p, p.get_subtasks(&task.id).await?).await?;
    let node = TaskNode { task, children };
    Ok(render::task_detail(&path, &node, &progress, Utc::now()))
}

async fn task(p: &dyn DataProvider, action: TaskAction) -> Result<String> {
    match action {
        TaskAction::Add {
            column,
            under,
            description,
            deadline,
            repeat,
            info,
            title,
        } => {
            let title = words(&title);
            let mut draft = match (column, under) {
                (_, Some(parent)) => TaskDraft::under(refs::task(p, &parent).await?.id, title),
                (Some(column), None) => {
                    TaskDraft::in_column(refs::column(p, &column).await?.id, title)
                }
                (None, None) => bail!("pass --column or --under"),
            };
            if let Some(description) = description {
                draft = draft.with_description(description);
            }
            if let Some(deadline) = deadline {
                draft = draft.with_deadline(parse_when(&deadline)?);
            }
            if let Some(at) = repeat {
                draft = draft.repeating_at(at);
            }
            if info {
                draft = draft.as_info();
            }
            let task = p.create_task(draft).await?;
            let path = refs::task_path(p, &task).await?;
            Ok(render::success(format!(
                "Added {} {}",
                format_path(&path),
                task.title
            )))
        }
        TaskAction::Show { task } => show_task(p, refs::task(p, &task).await?).await,
        TaskAction::Done { task } => {
            let id = refs::task(p, &task).await?.id;
            let task = p.update_task(&id, TaskPatch::done(true)).await?;
            Ok(render::success(format!("Done: {}", task.title)))
        }
        TaskAction::Undo { task } => {
            let id = refs::task(p, &task).await?.id;
            let task = p.update_task(&id, TaskPatch::done(false)).await?;
            Ok(render::success(format!("Reopened: {}", task.title)))
        }
        TaskAction::Edit {
            task,
            title,
            description,
            deadline,
            no_deadline,
            repeat,
            no_repeat,
            color,
            collapsed,
        } => {
            let id = refs::task(p, &task).await?.id;
            let mut patch = TaskPatch {
                title,
                description,
                color: color.map(Some),
                collapsed,
                ..Default::default()
            };
            if let Some(deadline) = deadline {
                patch.deadline = Some(Some(parse_when(&deadline)?));
            } else if no_deadline {
                patch.deadline = Some(None);
            }
            if let Some(at) = repeat {
                patch.repeating = Some(true);
                patch.reset_time = Some(Some(at));
            } else if no_repeat {
                patch.repeating = Some(false);
                patch.reset_time = Some(None);
            }
            if patch == TaskPatch::default() {
                bail!("nothing to change");
            }
            let task = p.update_task(&id, patch).await?;
            show_task(p, task).await
        }
        TaskAction::Mv {
            task,
            to,
            under,
            at,
        } => {
            let task = refs::task(p, &task).await?;
            let (column_id, parent_id) = match (to, under) {
                (_, Some(parent)) => (None, Some(refs::task(p, &parent).await?.id)),
                (Some(column), None) => (Some(refs::column(p, &column).await?.id), None),
                // Reorder within the current group.
                (None, None) => (task.column_id.clone(), task.parent_id.clone()),
            };
            let order = at.map(|n| n.saturating_sub(1)).unwrap_or(usize::MAX);
            let moved = p
                .move_task(&task.id, column_id.as_deref(), order, parent_id.as_deref())
                .await?;
            let path = refs::task_path(p, &moved).await?;
            Ok(render::success(format!(
                "Moved {} to {}",
                moved.title,
                format_path(&path)
            )))
        }
        TaskAction::Rm { task } => {
            let task = refs::task(p, &task).await?;
            let below = p.task_progress(&task.id).await?;
            p.delete_task(&task.id).await?;
            let mut out = render::success(format!("Deleted {}", task.title));
            if below.total > 0 {
                out.push_str(&render::warning(format!(
                    "{} subtasks were removed with it",
                    below.total
                )));
            }
            Ok(out)
        }
    }
}

// --- Settings ---

async fn settings(
    p: &dyn DataProvider,
    select: Option<&str>,
    unselect: bool,
    calendar: Option<bool>,
) -> Result<String> {
    let mut patch = SettingsPatch {
        is_calendar_view: calendar,
        ..Default::default()
    };
    if let Some(board) = select {
        patch.selected_board_id = Some(Some(refs::board_id(p, board).await?));
    } else if unselect {
        patch.selected_board_id = Some(None);
    }

    let settings = if patch == SettingsPatch::default() {
        p.get_settings().await?
    } else {
        p.update_settings(patch).await?
    };
    let selected = match &settings.selected_board_id {
        Some(id) => p.get_board(id).await.ok(),
        None => None,
    };
    Ok(render::settings(&settings, selected.as_ref()))
}
