//! # Domain Model: Boards, Columns, Tasks and Settings
//!
//! Boardz organizes work in a strict hierarchy:
//!
//! ```text
//! Board            ordered within the whole board set
//! └── Column       ordered within its board
//!     └── Task     ordered within its column (top-level task)
//!         └── Task ordered within its parent task (subtask, any depth)
//! ```
//!
//! ## Normalized Records
//!
//! Every entity is a flat record that points at its owner through a foreign key
//! (`board_id`, `column_id`, `parent_id`). Nobody holds a list of children: a
//! column does not know its tasks, a task does not know its subtasks. The
//! [`Dataset`] type is the canonical in-memory shape of a whole data set, and the
//! only nested representation lives in [`crate::store::document`], at the flat
//! document backend's I/O boundary.
//!
//! ## Task Membership
//!
//! A task belongs to exactly one sibling-group, described by [`TaskGroup`]:
//! - top-level: `column_id = Some(..)`, `parent_id = None`
//! - subtask: `column_id = None`, `parent_id = Some(..)`
//!
//! A task with neither set is orphaned, which the store treats as corrupt data.
//!
//! ## Wire Format
//!
//! All records serialize with camelCase keys (`boardId`, `doneDate`, `isInfo`)
//! and RFC 3339 timestamps. A missing or null `order` deserializes to
//! [`crate::ordering::UNORDERED`], which sorts last.
//!
//! ## Drafts and Patches
//!
//! Creation and partial updates go through [`TaskDraft`], [`BoardPatch`],
//! [`ColumnPatch`], [`TaskPatch`] and [`SettingsPatch`]. The patch types carry
//! the legacy owned-collection fields (`columns`, `tasks`, `subtasks`) only so a
//! caller sending the nested shape is rejected instead of silently losing data.

use crate::ordering::{self, Ordered};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Board,
    Column,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Board => "board",
            EntityKind::Column => "column",
            EntityKind::Task => "task",
        };
        f.write_str(name)
    }
}

/// Generates a fresh entity id. Callers never choose ids.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    #[serde(
        default = "ordering::unordered",
        deserialize_with = "ordering::deserialize_order"
    )]
    pub order: u32,
}

impl Board {
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub name: String,
    pub board_id: String,
    #[serde(
        default = "ordering::unordered",
        deserialize_with = "ordering::deserialize_order"
    )]
    pub order: u32,
}

impl Column {
    pub fn new(name: impl Into<String>, board_id: impl Into<String>, order: u32) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            board_id: board_id.into(),
            order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
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
    /// Daily reset time as `HH:MM`, for repeating tasks.
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
    #[serde(
        default = "ordering::unordered",
        deserialize_with = "ordering::deserialize_order"
    )]
    pub order: u32,
}

impl Task {
    /// A blank task placed in `group` at `order`.
    pub fn new(title: impl Into<String>, group: TaskGroup, order: u32) -> Self {
        let mut task = Self {
            id: new_id(),
            title: title.into(),
            description: String::new(),
            done: false,
            done_date: None,
            deadline: None,
            repeating: false,
            reset_time: None,
            column_id: None,
            parent_id: None,
            is_info: false,
            collapsed: false,
            color: None,
            done_color: None,
            order,
        };
        task.set_group(group);
        task
    }

    /// The sibling-group this task is ordered in, or `None` for an orphan.
    pub fn group(&self) -> Option<TaskGroup> {
        match (&self.parent_id, &self.column_id) {
            (Some(parent), _) => Some(TaskGroup::Parent(parent.clone())),
            (None, Some(column)) => Some(TaskGroup::Column(column.clone())),
            (None, None) => None,
        }
    }

    /// Re-homes the task, keeping exactly one of `column_id`/`parent_id` set.
    pub fn set_group(&mut self, group: TaskGroup) {
        match group {
            TaskGroup::Column(column_id) => {
                self.column_id = Some(column_id);
                self.parent_id = None;
            }
            TaskGroup::Parent(parent_id) => {
                self.column_id = None;
                self.parent_id = Some(parent_id);
            }
        }
    }

    pub fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// The ordering scope of a task: a column (top-level) or a parent task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskGroup {
    Column(String),
    Parent(String),
}

impl TaskGroup {
    pub fn owner_id(&self) -> &str {
        match self {
            TaskGroup::Column(id) | TaskGroup::Parent(id) => id,
        }
    }

    pub fn owner_kind(&self) -> EntityKind {
        match self {
            TaskGroup::Column(_) => EntityKind::Column,
            TaskGroup::Parent(_) => EntityKind::Task,
        }
    }

    /// Whether `task` is a member of this group.
    pub fn contains(&self, task: &Task) -> bool {
        match self {
            TaskGroup::Column(id) => {
                task.parent_id.is_none() && task.column_id.as_deref() == Some(id.as_str())
            }
            TaskGroup::Parent(id) => task.parent_id.as_deref() == Some(id.as_str()),
        }
    }
}

impl fmt::Display for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskGroup::Column(id) => write!(f, "column {}", id),
            TaskGroup::Parent(id) => write!(f, "subtasks of {}", id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub selected_board_id: Option<String>,
    #[serde(default)]
    pub is_calendar_view: bool,
}

/// The canonical normalized data set: four flat record collections.
///
/// This is also the body exchanged with the remote API (`GET`/`POST /api/data`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub boards: Vec<Board>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Ordered for Board {
    fn id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> u32 {
        self.order
    }
    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

impl Ordered for Column {
    fn id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> u32 {
        self.order
    }
    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

impl Ordered for Task {
    fn id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> u32 {
        self.order
    }
    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

// Distinguishes "field absent" (None) from "field explicitly null" (Some(None)).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPatch {
    pub name: Option<String>,
    /// Always rejected: columns are managed through column operations.
    pub columns: Option<Vec<serde_json::Value>>,
}

impl BoardPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPatch {
    pub name: Option<String>,
    /// Always rejected: tasks are managed through task operations.
    pub tasks: Option<Vec<serde_json::Value>>,
}

impl ColumnPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Input for task creation. Exactly one of `column_id`/`parent_id` must be set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub column_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repeating: bool,
    #[serde(default)]
    pub reset_time: Option<String>,
    #[serde(default)]
    pub is_info: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub done_color: Option<String>,
    /// Always rejected: subtasks attach themselves through `parent_id`.
    #[serde(default)]
    pub subtasks: Option<Vec<serde_json::Value>>,
}

impl TaskDraft {
    pub fn in_column(column_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            column_id: Some(column_id.into()),
            ..Default::default()
        }
    }

    pub fn under(parent_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            parent_id: Some(parent_id.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn repeating_at(mut self, reset_time: impl Into<String>) -> Self {
        self.repeating = true;
        self.reset_time = Some(reset_time.into());
        self
    }

    pub fn as_info(mut self) -> Self {
        self.is_info = true;
        self
    }
}

/// Partial task update. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub done: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub done_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub repeating: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub reset_time: Option<Option<String>>,
    pub is_info: Option<bool>,
    pub collapsed: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub done_color: Option<Option<String>>,
    /// Always rejected: subtasks attach themselves through `parent_id`.
    pub subtasks: Option<Vec<serde_json::Value>>,
}

impl TaskPatch {
    pub fn done(done: bool) -> Self {
        Self {
            done: Some(done),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub selected_board_id: Option<Option<String>>,
    pub is_calendar_view: Option<bool>,
}

impl SettingsPatch {
    pub fn select_board(id: Option<String>) -> Self {
        Self {
            selected_board_id: Some(id),
            ..Default::default()
        }
    }
}
