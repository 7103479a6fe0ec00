//! # Data Provider Interface
//!
//! [`DataProvider`] is the one surface collaborators (the CLI, a UI, a sync job)
//! talk to. Every backend is reached through it, so callers never know whether
//! records live in a local document, a SQLite file or on a server.
//!
//! ## Contract
//!
//! - All operations are async and return owned copies: mutating a returned
//!   entity never persists anything.
//! - List reads come back sorted by `order`.
//! - Every write is committed atomically; either all of its record changes land
//!   or none do.
//! - Deletes cascade: a board takes its columns and tasks, a column its tasks,
//!   a task its subtasks at any depth. Deleting something absent returns `false`.
//! - Membership changes only through [`DataProvider::move_task`].
//!
//! ## Errors
//!
//! | Error | When |
//! |-------|------|
//! | `Validation` | empty name, bad `HH:MM`, nested collections in a patch, cyclic move |
//! | `NotFound` | a referenced board/column/task does not exist |
//! | storage class | the document, database or server failed |

use crate::error::Result;
use crate::model::{
    Board, BoardPatch, Column, ColumnPatch, Settings, SettingsPatch, Task, TaskDraft, TaskPatch,
};
use crate::stats::Progress;
use crate::store::document::Document;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Prepare the backing store. Safe to call more than once.
    async fn initialize(&self) -> Result<()>;

    // --- Boards ---

    async fn get_boards(&self) -> Result<Vec<Board>>;

    async fn get_board(&self, id: &str) -> Result<Board>;

    /// Appends a board after the existing ones.
    async fn create_board(&self, name: &str) -> Result<Board>;

    async fn update_board(&self, id: &str, patch: BoardPatch) -> Result<Board>;

    /// Removes the board with its columns and tasks. Moves the selection to the
    /// first remaining board when the deleted one was selected.
    async fn delete_board(&self, id: &str) -> Result<bool>;

    /// Re-sequences all boards to `0..n-1`, keeping their relative order.
    async fn update_board_order(&self) -> Result<Vec<Board>>;

    async fn reorder_boards(&self, ids: &[String]) -> Result<Vec<Board>>;

    // --- Columns ---

    async fn get_columns(&self, board_id: &str) -> Result<Vec<Column>>;

    async fn get_column(&self, id: &str) -> Result<Column>;

    async fn create_column(&self, name: &str, board_id: &str) -> Result<Column>;

    async fn update_column(&self, id: &str, patch: ColumnPatch) -> Result<Column>;

    async fn delete_column(&self, id: &str) -> Result<bool>;

    async fn update_column_order(&self, board_id: &str) -> Result<Vec<Column>>;

    async fn reorder_columns(&self, board_id: &str, ids: &[String]) -> Result<Vec<Column>>;

    // --- Tasks ---

    /// Top-level tasks of a column.
    async fn get_tasks(&self, column_id: &str) -> Result<Vec<Task>>;

    async fn get_subtasks(&self, parent_id: &str) -> Result<Vec<Task>>;

    async fn get_task(&self, id: &str) -> Result<Task>;

    async fn create_task(&self, draft: TaskDraft) -> Result<Task>;

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task>;

    async fn delete_task(&self, id: &str) -> Result<bool>;

    /// Moves a task to position `new_order` of a column (top-level) or of a
    /// parent task's subtasks. `new_parent_id` wins when both are given.
    async fn move_task(
        &self,
        task_id: &str,
        new_column_id: Option<&str>,
        new_order: usize,
        new_parent_id: Option<&str>,
    ) -> Result<Task>;

    async fn update_task_order(&self, column_id: &str) -> Result<Vec<Task>>;

    async fn update_subtask_order(&self, parent_id: &str) -> Result<Vec<Task>>;

    async fn reorder_tasks(&self, column_id: &str, ids: &[String]) -> Result<Vec<Task>>;

    async fn reorder_subtasks(&self, parent_id: &str, ids: &[String]) -> Result<Vec<Task>>;

    // --- Settings ---

    async fn get_settings(&self) -> Result<Settings>;

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings>;

    // --- Whole data set ---

    /// The nested document shape, for backups and migration between backends.
    async fn export_document(&self) -> Result<Document>;

    /// Replaces everything with the content of `doc`.
    async fn import_document(&self, doc: Document) -> Result<()>;

    // --- Derived queries ---

    /// Completion of a task's subtasks, at every depth.
    async fn task_progress(&self, task_id: &str) -> Result<Progress>;

    /// Completion of every task on a board.
    async fn board_progress(&self, board_id: &str) -> Result<Progress>;

    /// Un-checks repeating tasks whose reset time has passed. Returns the tasks
    /// that were reset.
    async fn reset_repeating_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>>;

    /// Non-info tasks with a deadline in `[start, end)`, earliest first.
    async fn get_tasks_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>>;
}
