use crate::error::Result;
use crate::model::{Board, Column, Dataset, Settings, Task, TaskGroup};
use async_trait::async_trait;
use std::sync::Arc;

/// Abstract interface for raw record I/O over the normalized shape.
///
/// This trait handles the "how" of storage (document slot, SQLite, HTTP),
/// while [`super::board_store::BoardStore`] handles the "what" (validation,
/// ordering, cascades). Backends never sort or renumber: they return records
/// in storage/iteration order and persist exactly what they are given.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Open connections, create schema, load caches. Must be idempotent.
    async fn initialize(&self) -> Result<()>;

    // --- Boards ---

    async fn load_boards(&self) -> Result<Vec<Board>>;

    async fn load_board(&self, id: &str) -> Result<Option<Board>>;

    // --- Columns ---

    async fn load_columns(&self, board_id: &str) -> Result<Vec<Column>>;

    async fn load_column(&self, id: &str) -> Result<Option<Column>>;

    // --- Tasks ---

    /// Members of one sibling-group. For a column this is top-level tasks only.
    async fn load_tasks(&self, group: &TaskGroup) -> Result<Vec<Task>>;

    async fn load_task(&self, id: &str) -> Result<Option<Task>>;

    /// Every task below the given roots, at any depth. The roots themselves
    /// are not included.
    async fn load_descendants(&self, root_ids: &[String]) -> Result<Vec<Task>>;

    // --- Settings & bulk ---

    async fn load_settings(&self) -> Result<Settings>;

    async fn load_all(&self) -> Result<Dataset>;

    /// Apply a change set atomically: either every change lands or none does.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;

    /// Replace the whole data set.
    async fn replace_all(&self, data: Dataset) -> Result<()>;

    /// Serve reads and commits from one loaded copy of the data set until the
    /// matching [`StorageBackend::release_snapshot`]. Pins nest.
    ///
    /// Only backends where every load is a full round trip need this; the
    /// default does nothing.
    async fn pin_snapshot(&self) -> Result<()> {
        Ok(())
    }

    /// Ends one [`StorageBackend::pin_snapshot`]. Runs from `Drop`, so it
    /// cannot fail or wait.
    fn release_snapshot(&self) {}
}

/// Shares one backend between a store and direct record access.
#[async_trait]
impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    async fn initialize(&self) -> Result<()> {
        (**self).initialize().await
    }

    async fn load_boards(&self) -> Result<Vec<Board>> {
        (**self).load_boards().await
    }

    async fn load_board(&self, id: &str) -> Result<Option<Board>> {
        (**self).load_board(id).await
    }

    async fn load_columns(&self, board_id: &str) -> Result<Vec<Column>> {
        (**self).load_columns(board_id).await
    }

    async fn load_column(&self, id: &str) -> Result<Option<Column>> {
        (**self).load_column(id).await
    }

    async fn load_tasks(&self, group: &TaskGroup) -> Result<Vec<Task>> {
        (**self).load_tasks(group).await
    }

    async fn load_task(&self, id: &str) -> Result<Option<Task>> {
        (**self).load_task(id).await
    }

    async fn load_descendants(&self, root_ids: &[String]) -> Result<Vec<Task>> {
        (**self).load_descendants(root_ids).await
    }

    async fn load_settings(&self) -> Result<Settings> {
        (**self).load_settings().await
    }

    async fn load_all(&self) -> Result<Dataset> {
        (**self).load_all().await
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        (**self).commit(changes).await
    }

    async fn replace_all(&self, data: Dataset) -> Result<()> {
        (**self).replace_all(data).await
    }

    async fn pin_snapshot(&self) -> Result<()> {
        (**self).pin_snapshot().await
    }

    fn release_snapshot(&self) {
        (**self).release_snapshot()
    }
}

/// A batch of record writes produced by one provider operation.
///
/// Removals are applied before upserts. Upserting the same id twice keeps the
/// last version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub boards: Vec<Board>,
    pub columns: Vec<Column>,
    pub tasks: Vec<Task>,
    pub removed_boards: Vec<String>,
    pub removed_columns: Vec<String>,
    pub removed_tasks: Vec<String>,
    pub settings: Option<Settings>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
            && self.columns.is_empty()
            && self.tasks.is_empty()
            && self.removed_boards.is_empty()
            && self.removed_columns.is_empty()
            && self.removed_tasks.is_empty()
            && self.settings.is_none()
    }

    pub fn put_board(&mut self, board: Board) {
        upsert(&mut self.boards, board, |b| &b.id);
    }

    pub fn put_boards(&mut self, boards: impl IntoIterator<Item = Board>) {
        for board in boards {
            self.put_board(board);
        }
    }

    pub fn put_column(&mut self, column: Column) {
        upsert(&mut self.columns, column, |c| &c.id);
    }

    pub fn put_columns(&mut self, columns: impl IntoIterator<Item = Column>) {
        for column in columns {
            self.put_column(column);
        }
    }

    pub fn put_task(&mut self, task: Task) {
        upsert(&mut self.tasks, task, |t| &t.id);
    }

    pub fn put_tasks(&mut self, tasks: impl IntoIterator<Item = Task>) {
        for task in tasks {
            self.put_task(task);
        }
    }

    pub fn remove_board(&mut self, id: impl Into<String>) {
        self.removed_boards.push(id.into());
    }

    pub fn remove_column(&mut self, id: impl Into<String>) {
        self.removed_columns.push(id.into());
    }

    pub fn remove_task(&mut self, id: impl Into<String>) {
        self.removed_tasks.push(id.into());
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = Some(settings);
    }

    /// Total number of record writes, for logging.
    pub fn len(&self) -> usize {
        self.boards.len()
            + self.columns.len()
            + self.tasks.len()
            + self.removed_boards.len()
            + self.removed_columns.len()
            + self.removed_tasks.len()
            + usize::from(self.settings.is_some())
    }
}

fn upsert<T>(records: &mut Vec<T>, record: T, id: impl Fn(&T) -> &String) {
    match records.iter().position(|r| id(r) == id(&record)) {
        Some(index) => records[index] = record,
        None => records.push(record),
    }
}
