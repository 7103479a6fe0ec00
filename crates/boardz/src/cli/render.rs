//! # Rendering
//!
//! Every function here turns owned records into a string; the command layer
//! prints it. Nothing here talks to a provider, so rendering is tested with
//! hand-built records.

use super::refs::format_path;
use super::styles::STYLES;
use boardzapp::model::{Board, Column, Settings, Task};
use boardzapp::stats::Progress;
use chrono::{DateTime, Utc};
use std::fmt::Write;

pub const DONE_MARKER: &str = "[x]";
pub const OPEN_MARKER: &str = "[ ]";
pub const INFO_MARKER: &str = " i ";
pub const SELECTED_MARKER: &str = "*";
const INDENT: &str = "    ";

/// A task with its loaded subtasks.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub task: Task,
    pub children: Vec<TaskNode>,
}

pub struct BoardLine {
    pub board: Board,
    pub selected: bool,
    pub progress: Progress,
}

pub struct ColumnLine {
    pub column: Column,
    pub tasks: usize,
}

fn progress_label(progress: &Progress) -> String {
    if progress.total == 0 {
        return String::new();
    }
    let text = format!("{} ({}%)", progress, progress.percent());
    if progress.is_complete() {
        STYLES.success.apply_to(text).to_string()
    } else {
        STYLES.muted.apply_to(text).to_string()
    }
}

fn marker(task: &Task) -> &'static str {
    if task.is_info {
        INFO_MARKER
    } else if task.done {
        DONE_MARKER
    } else {
        OPEN_MARKER
    }
}

fn styled_title(task: &Task) -> String {
    if task.is_info {
        STYLES.info.apply_to(&task.title).to_string()
    } else if task.done {
        STYLES.done.apply_to(&task.title).to_string()
    } else {
        STYLES.regular.apply_to(&task.title).to_string()
    }
}

fn deadline_label(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let text = format!("due {}", deadline.format("%Y-%m-%d %H:%M"));
    if deadline < now {
        STYLES.overdue.apply_to(text).to_string()
    } else {
        STYLES.deadline.apply_to(text).to_string()
    }
}

pub fn boards(lines: &[BoardLine]) -> String {
    if lines.is_empty() {
        return format!(
            "{}\n",
            STYLES
                .muted
                .apply_to("No boards yet. Create one with `boardz board add <name>`.")
        );
    }
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mark = if line.selected { SELECTED_MARKER } else { " " };
        let _ = writeln!(
            out,
            "{} {} {}  {}",
            STYLES.selected.apply_to(mark),
            STYLES.index.apply_to(format!("{:>2}.", i + 1)),
            STYLES.title.apply_to(&line.board.name),
            progress_label(&line.progress)
        );
    }
    out
}

pub fn columns(board: &Board, board_path: &[usize], lines: &[ColumnLine]) -> String {
    let mut out = format!("{}\n", STYLES.title.apply_to(&board.name));
    if lines.is_empty() {
        let _ = writeln!(out, "  {}", STYLES.muted.apply_to("(no columns)"));
        return out;
    }
    for (i, line) in lines.iter().enumerate() {
        let mut path = board_path.to_vec();
        path.push(i + 1);
        let count = match line.tasks {
            1 => "1 task".to_string(),
            n => format!("{} tasks", n),
        };
        let _ = writeln!(
            out,
            "  {} {}  {}",
            STYLES.index.apply_to(format!("{:<6}", format_path(&path))),
            line.column.name,
            STYLES.muted.apply_to(count)
        );
    }
    out
}

fn write_tree(out: &mut String, nodes: &[TaskNode], path: &[usize], depth: usize, now: DateTime<Utc>) {
    for (i, node) in nodes.iter().enumerate() {
        let mut node_path = path.to_vec();
        node_path.push(i + 1);
        let task = &node.task;

        let mut line = format!(
            "{}{} {} {}",
            INDENT.repeat(depth),
            STYLES.index.apply_to(format_path(&node_path)),
            marker(task),
            styled_title(task)
        );
        if let Some(deadline) = task.deadline {
            let _ = write!(line, "  {}", deadline_label(deadline, now));
        }
        if task.repeating {
            let at = task.reset_time.as_deref().unwrap_or("00:00");
            let _ = write!(line, "  {}", STYLES.muted.apply_to(format!("repeats {}", at)));
        }
        if task.collapsed && !node.children.is_empty() {
            let _ = write!(
                line,
                "  {}",
                STYLES.faint.apply_to(format!("(+{} hidden)", node.children.len()))
            );
        }
        let _ = writeln!(out, "{}", line);

        if !task.collapsed {
            write_tree(out, &node.children, &node_path, depth + 1, now);
        }
    }
}

pub fn tasks(column: &Column, column_path: &[usize], nodes: &[TaskNode], now: DateTime<Utc>) -> String {
    let mut out = format!(
        "{} {}\n",
        STYLES.index.apply_to(format_path(column_path)),
        STYLES.title.apply_to(&column.name)
    );
    if nodes.is_empty() {
        let _ = writeln!(out, "  {}", STYLES.muted.apply_to("(empty)"));
        return out;
    }
    write_tree(&mut out, nodes, column_path, 1, now);
    out
}

pub fn task_detail(
    path: &[usize],
    node: &TaskNode,
    progress: &Progress,
    now: DateTime<Utc>,
) -> String {
    let task = &node.task;
    let mut out = format!(
        "{} {} {}\n",
        STYLES.index.apply_to(format_path(path)),
        marker(task),
        STYLES.title.apply_to(&task.title)
    );
    let mut field = |label: &str, value: String| {
        let _ = writeln!(out, "  {:<12}{}", STYLES.muted.apply_to(label), value);
    };
    field("id", task.id.clone());
    if !task.description.is_empty() {
        field("description", task.description.clone());
    }
    if let Some(deadline) = task.deadline {
        field("deadline", deadline_label(deadline, now));
    }
    if let Some(done_date) = task.done_date {
        field("done", done_date.format("%Y-%m-%d %H:%M").to_string());
    }
    if task.repeating {
        field(
            "repeats",
            format!("daily at {}", task.reset_time.as_deref().unwrap_or("00:00")),
        );
    }
    if let Some(color) = &task.color {
        field("color", color.clone());
    }
    if progress.total > 0 {
        field("progress", progress_label(progress));
    }
    write_tree(&mut out, &node.children, path, 1, now);
    out
}

pub fn settings(settings: &Settings, selected: Option<&Board>) -> String {
    let board = match (selected, &settings.selected_board_id) {
        (Some(board), _) => board.name.clone(),
        (None, Some(id)) => format!("{} (missing)", id),
        (None, None) => STYLES.muted.apply_to("none").to_string(),
    };
    let view = if settings.is_calendar_view {
        "calendar"
    } else {
        "board"
    };
    format!(
        "{:<16}{}\n{:<16}{}\n",
        "selected board", board, "view", view
    )
}

pub fn due(tasks: &[Task], now: DateTime<Utc>) -> String {
    if tasks.is_empty() {
        return format!("{}\n", STYLES.muted.apply_to("Nothing due."));
    }
    let mut out = String::new();
    for task in tasks {
        if let Some(deadline) = task.deadline {
            let _ = writeln!(
                out,
                "{}  {} {}",
                deadline_label(deadline, now),
                marker(task),
                styled_title(task)
            );
        }
    }
    out
}

pub fn success(message: impl AsRef<str>) -> String {
    format!("{}\n", STYLES.success.apply_to(message.as_ref()))
}

pub fn warning(message: impl AsRef<str>) -> String {
    format!("{}\n", STYLES.warning.apply_to(message.as_ref()))
}
