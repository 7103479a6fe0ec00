//! # Positional References
//!
//! Ids are uuids, which nobody wants to type. The CLI therefore accepts the
//! position a record is shown at, 1-based and dotted by depth:
//!
//! | Input | Meaning |
//! |-------|---------|
//! | `2` | second board |
//! | `2.1` | first column of board 2 |
//! | `2.1.3` | third task of that column |
//! | `2.1.3.1` | first subtask of that task (any depth) |
//!
//! Positions follow the stored order, so `board order` or `task mv` changes
//! what a path points at. Anything that is not a dotted number is used as a
//! raw id.

use anyhow::{anyhow, bail, Result};
use boardzapp::model::{Column, Task};
use boardzapp::provider::DataProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ref {
    Path(Vec<usize>),
    Id(String),
}

impl Ref {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let path: Option<Vec<usize>> = input
            .split('.')
            .map(|part| part.parse::<usize>().ok().filter(|n| *n > 0))
            .collect();
        match path {
            Some(path) if !input.is_empty() => Ref::Path(path),
            _ => Ref::Id(input.to_string()),
        }
    }
}

/// Formats a position path the way users type it.
pub fn format_path(path: &[usize]) -> String {
    path.iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

fn pick<T: Clone>(items: &[T], position: usize, what: &str, input: &str) -> Result<T> {
    position
        .checked_sub(1)
        .and_then(|i| items.get(i))
        .cloned()
        .ok_or_else(|| anyhow!("no {} at position {} in `{}`", what, position, input))
}

pub async fn board_id(p: &dyn DataProvider, input: &str) -> Result<String> {
    match Ref::parse(input) {
        Ref::Path(path) if path.len() == 1 => {
            let boards = p.get_boards().await?;
            Ok(pick(&boards, path[0], "board", input)?.id)
        }
        Ref::Path(_) => bail!("`{}` is not a board reference", input),
        Ref::Id(id) => Ok(p.get_board(&id).await?.id),
    }
}

pub async fn column(p: &dyn DataProvider, input: &str) -> Result<Column> {
    match Ref::parse(input) {
        Ref::Path(path) if path.len() == 2 => column_at(p, &path, input).await,
        Ref::Path(_) => bail!("`{}` is not a column reference", input),
        Ref::Id(id) => Ok(p.get_column(&id).await?),
    }
}

async fn column_at(p: &dyn DataProvider, path: &[usize], input: &str) -> Result<Column> {
    let boards = p.get_boards().await?;
    let board = pick(&boards, path[0], "board", input)?;
    let columns = p.get_columns(&board.id).await?;
    pick(&columns, path[1], "column", input)
}

pub async fn task(p: &dyn DataProvider, input: &str) -> Result<Task> {
    match Ref::parse(input) {
        Ref::Path(path) if path.len() >= 3 => {
            let column = column_at(p, &path[..2], input).await?;
            let mut task = pick(&p.get_tasks(&column.id).await?, path[2], "task", input)?;
            for position in &path[3..] {
                let subtasks = p.get_subtasks(&task.id).await?;
                task = pick(&subtasks, *position, "subtask", input)?;
            }
            Ok(task)
        }
        Ref::Path(_) => bail!("`{}` is not a task reference", input),
        Ref::Id(id) => Ok(p.get_task(&id).await?),
    }
}

fn position_of<T>(items: &[T], id: &str, id_of: impl Fn(&T) -> &str) -> Option<usize> {
    items.iter().position(|item| id_of(item) == id).map(|i| i + 1)
}

pub async fn board_path(p: &dyn DataProvider, board_id: &str) -> Result<Vec<usize>> {
    let boards = p.get_boards().await?;
    let position = position_of(&boards, board_id, |b| b.id.as_str())
        .ok_or_else(|| anyhow!("board {} is gone", board_id))?;
    Ok(vec![position])
}

pub async fn column_path(p: &dyn DataProvider, column: &Column) -> Result<Vec<usize>> {
    let mut path = board_path(p, &column.board_id).await?;
    let columns = p.get_columns(&column.board_id).await?;
    let position = position_of(&columns, &column.id, |c| c.id.as_str())
        .ok_or_else(|| anyhow!("column {} is gone", column.id))?;
    path.push(position);
    Ok(path)
}

/// Walks up from `task` to its column and returns the full position path.
pub async fn task_path(p: &dyn DataProvider, task: &Task) -> Result<Vec<usize>> {
    let mut reversed = Vec::new();
    let mut current = task.clone();
    loop {
        let siblings = match (&current.parent_id, &current.column_id) {
            (Some(parent), _) => p.get_subtasks(parent).await?,
            (None, Some(column)) => p.get_tasks(column).await?,
            (None, None) => bail!("task {} has no owner", current.id),
        };
        let position = position_of(&siblings, &current.id, |t| t.id.as_str())
            .ok_or_else(|| anyhow!("task {} is gone", current.id))?;
        reversed.push(position);

        match (current.parent_id.clone(), current.column_id.clone()) {
            (Some(parent), _) => current = p.get_task(&parent).await?,
            (None, Some(column_id)) => {
                let column = p.get_column(&column_id).await?;
                let mut path = column_path(p, &column).await?;
                path.extend(reversed.into_iter().rev());
                return Ok(path);
            }
            (None, None) => bail!("task {} has no owner", current.id),
        }
    }
}
