//! # Persisted Document Shape
//!
//! The flat document backend stores everything as one JSON document:
//!
//! ```text
//! {
//!   "selectedBoardId": "…" | null,
//!   "isCalendarView": false,
//!   "boards": [
//!     { "id", "name", "order", "columns": [
//!         { "id", "name", "boardId", "order", "tasks": [
//!             { "id", "title", …, "columnId", "order", "subtasks": [ … ] }
//!         ] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! This is the only nested representation in the crate. [`flatten`] turns a
//! document into the normalized [`Dataset`]; [`unflatten`] does the reverse.
//!
//! ## Loading Rules
//!
//! - A missing `order` defaults to the record's array index.
//! - Foreign keys are derived from nesting: a column's `boardId` is its board, a
//!   task directly under a column gets `columnId`, a task under `subtasks` gets
//!   `parentId`. Stored foreign keys that disagree with nesting are ignored.
//! - Unknown fields are ignored.
//!
//! ## Saving Rules
//!
//! Siblings are written sorted by order. Records whose owner is missing from the
//! data set cannot be nested and are dropped with a warning.

use crate::model::{Board, Column, Dataset, Settings, Task};
use crate::ordering::sort_by_order;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub selected_board_id: Option<String>,
    #[serde(default)]
    pub is_calendar_view: bool,
    #[serde(default)]
    pub boards: Vec<DocBoard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocBoard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub columns: Vec<DocColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocColumn {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub board_id: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub tasks: Vec<DocTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repeating: bool,
    #[serde(default)]
    pub reset_time: Option<String>,
    #[serde(default)]
    pub column_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_info: bool,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub done_color: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<DocTask>,
}

fn index_order(order: Option<u32>, index: usize) -> u32 {
    order.unwrap_or_else(|| crate::ordering::next_order(index))
}

/// Nested document → normalized data set.
pub fn flatten(doc: &Document) -> Dataset {
    let mut data = Dataset {
        settings: Settings {
            selected_board_id: doc.selected_board_id.clone(),
            is_calendar_view: doc.is_calendar_view,
        },
        ..Default::default()
    };

    for (board_index, doc_board) in doc.boards.iter().enumerate() {
        data.boards.push(Board {
            id: doc_board.id.clone(),
            name: doc_board.name.clone(),
            order: index_order(doc_board.order, board_index),
        });

        for (column_index, doc_column) in doc_board.columns.iter().enumerate() {
            data.columns.push(Column {
                id: doc_column.id.clone(),
                name: doc_column.name.clone(),
                board_id: doc_board.id.clone(),
                order: index_order(doc_column.order, column_index),
            });

            for (task_index, doc_task) in doc_column.tasks.iter().enumerate() {
                let owner = Owner::Column(&doc_column.id);
                flatten_task(doc_task, owner, task_index, &mut data.tasks);
            }
        }
    }

    sort_by_order(&mut data.boards);
    data
}

enum Owner<'a> {
    Column(&'a str),
    Parent(&'a str),
}

fn flatten_task(doc_task: &DocTask, owner: Owner<'_>, index: usize, out: &mut Vec<Task>) {
    let (column_id, parent_id) = match owner {
        Owner::Column(id) => (Some(id.to_string()), None),
        Owner::Parent(id) => (None, Some(id.to_string())),
    };
    out.push(Task {
        id: doc_task.id.clone(),
        title: doc_task.title.clone(),
        description: doc_task.description.clone(),
        done: doc_task.done,
        done_date: doc_task.done_date,
        deadline: doc_task.deadline,
        repeating: doc_task.repeating,
        reset_time: doc_task.reset_time.clone(),
        column_id,
        parent_id,
        is_info: doc_task.is_info,
        collapsed: doc_task.collapsed,
        color: doc_task.color.clone(),
        done_color: doc_task.done_color.clone(),
        order: index_order(doc_task.order, index),
    });

    for (sub_index, sub) in doc_task.subtasks.iter().enumerate() {
        flatten_task(sub, Owner::Parent(&doc_task.id), sub_index, out);
    }
}

/// Normalized data set → nested document.
pub fn unflatten(data: &Dataset) -> Document {
    let mut columns_by_board: HashMap<&str, Vec<&Column>> = HashMap::new();
    for column in &data.columns {
        columns_by_board
            .entry(column.board_id.as_str())
            .or_default()
            .push(column);
    }

    let mut tasks_by_column: HashMap<&str, Vec<&Task>> = HashMap::new();
    let mut tasks_by_parent: HashMap<&str, Vec<&Task>> = HashMap::new();
    for task in &data.tasks {
        match (task.parent_id.as_deref(), task.column_id.as_deref()) {
            (Some(parent), _) => tasks_by_parent.entry(parent).or_default().push(task),
            (None, Some(column)) => tasks_by_column.entry(column).or_default().push(task),
            (None, None) => warn!(task = %task.id, "dropping orphaned task from document"),
        }
    }

    let mut boards: Vec<&Board> = data.boards.iter().collect();
    boards.sort_by_key(|b| b.order);

    let mut written_columns = 0;
    let mut written_tasks = 0;
    let doc_boards = boards
        .into_iter()
        .map(|board| {
            let mut columns = columns_by_board.remove(board.id.as_str()).unwrap_or_default();
            columns.sort_by_key(|c| c.order);
            written_columns += columns.len();
            DocBoard {
                id: board.id.clone(),
                name: board.name.clone(),
                order: Some(board.order),
                columns: columns
                    .into_iter()
                    .map(|column| DocColumn {
                        id: column.id.clone(),
                        name: column.name.clone(),
                        board_id: Some(column.board_id.clone()),
                        order: Some(column.order),
                        tasks: nest_tasks(
                            tasks_by_column.remove(column.id.as_str()).unwrap_or_default(),
                            &mut tasks_by_parent,
                            &mut written_tasks,
                        ),
                    })
                    .collect(),
            }
        })
        .collect();

    if written_columns < data.columns.len() || written_tasks < data.tasks.len() {
        warn!(
            columns = data.columns.len() - written_columns,
            tasks = data.tasks.len() - written_tasks,
            "dropping records whose owner no longer exists"
        );
    }

    Document {
        selected_board_id: data.settings.selected_board_id.clone(),
        is_calendar_view: data.settings.is_calendar_view,
        boards: doc_boards,
    }
}

fn nest_tasks(
    mut tasks: Vec<&Task>,
    by_parent: &mut HashMap<&str, Vec<&Task>>,
    written: &mut usize,
) -> Vec<DocTask> {
    tasks.sort_by_key(|t| t.order);
    *written += tasks.len();
    tasks
        .into_iter()
        .map(|task| {
            let children = by_parent.remove(task.id.as_str()).unwrap_or_default();
            DocTask {
                id: task.id.clone(),
                title: task.title.clone(),
                description: task.description.clone(),
                done: task.done,
                done_date: task.done_date,
                deadline: task.deadline,
                repeating: task.repeating,
                reset_time: task.reset_time.clone(),
                column_id: task.column_id.clone(),
                parent_id: task.parent_id.clone(),
                is_info: task.is_info,
                collapsed: task.collapsed,
                color: task.color.clone(),
                done_color: task.done_color.clone(),
                order: Some(task.order),
                subtasks: nest_tasks(children, by_parent, written),
            }
        })
        .collect()
}
