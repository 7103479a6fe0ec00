use super::backend::{ChangeSet, StorageBackend};
use super::document::{flatten, unflatten, Document};
use crate::error::{BoardzError, Result};
use crate::model::{
    Board, BoardPatch, Column, ColumnPatch, EntityKind, Settings, SettingsPatch, Task, TaskDraft,
    TaskGroup, TaskPatch,
};
use crate::ordering::{self, next_order, Ordered};
use crate::provider::DataProvider;
use crate::schedule::needs_reset;
use crate::stats::Progress;
use crate::validation;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The provider semantics (validation, ordering, cascades) over any
/// [`StorageBackend`].
pub struct BoardStore<B: StorageBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
    /// Serializes read-modify-write spans on this instance.
    write_lock: Mutex<()>,
}

/// Keeps the backend's snapshot pinned for one operation.
struct Pinned<'a, B: StorageBackend>(&'a B);

impl<B: StorageBackend> Drop for Pinned<'_, B> {
    fn drop(&mut self) {
        self.0.release_snapshot();
    }
}

impl<B: StorageBackend> BoardStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Pins the backend snapshot until the returned guard drops, so the loads
    /// and the commit of one operation share a single fetch.
    async fn pin(&self) -> Result<Pinned<'_, B>> {
        self.backend.pin_snapshot().await?;
        Ok(Pinned(&self.backend))
    }

    async fn require_board(&self, id: &str) -> Result<Board> {
        self.backend
            .load_board(id)
            .await?
            .ok_or_else(|| BoardzError::not_found(EntityKind::Board, id))
    }

    async fn require_column(&self, id: &str) -> Result<Column> {
        self.backend
            .load_column(id)
            .await?
            .ok_or_else(|| BoardzError::not_found(EntityKind::Column, id))
    }

    async fn require_task(&self, id: &str) -> Result<Task> {
        self.backend
            .load_task(id)
            .await?
            .ok_or_else(|| BoardzError::not_found(EntityKind::Task, id))
    }

    /// Fails with `NotFound` when the column or parent task behind `group`
    /// does not exist.
    async fn require_owner(&self, group: &TaskGroup) -> Result<()> {
        match group {
            TaskGroup::Column(id) => self.require_column(id).await.map(|_| ()),
            TaskGroup::Parent(id) => self.require_task(id).await.map(|_| ()),
        }
    }

    async fn sorted_boards(&self) -> Result<Vec<Board>> {
        Ok(sorted(self.backend.load_boards().await?))
    }

    async fn sorted_columns(&self, board_id: &str) -> Result<Vec<Column>> {
        Ok(sorted(self.backend.load_columns(board_id).await?))
    }

    async fn sorted_tasks(&self, group: &TaskGroup) -> Result<Vec<Task>> {
        Ok(sorted(self.backend.load_tasks(group).await?))
    }

    /// Ids of `roots` plus everything below them.
    async fn subtree_ids(&self, roots: Vec<Task>) -> Result<Vec<String>> {
        let mut ids: Vec<String> = roots.into_iter().map(|t| t.id).collect();
        let below = self.backend.load_descendants(&ids).await?;
        ids.extend(below.into_iter().map(|t| t.id));
        Ok(ids)
    }

    async fn commit(&self, operation: &str, changes: ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let writes = changes.len();
        match self.backend.commit(changes).await {
            Ok(()) => {
                debug!(operation, writes, "committed");
                Ok(())
            }
            Err(e) => {
                warn!(operation, error = %e, "commit failed");
                Err(e)
            }
        }
    }

    async fn densify_tasks(&self, group: TaskGroup) -> Result<Vec<Task>> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let mut tasks = self.sorted_tasks(&group).await?;
        let mut changes = ChangeSet::new();
        changes.put_tasks(ordering::densify(&mut tasks));
        self.commit("densify tasks", changes).await?;
        Ok(tasks)
    }

    async fn reorder_task_group(&self, group: TaskGroup, ids: &[String]) -> Result<Vec<Task>> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        self.require_owner(&group).await?;
        let mut tasks = self.sorted_tasks(&group).await?;
        let mut changes = ChangeSet::new();
        changes.put_tasks(ordering::reorder_by_ids(&mut tasks, ids));
        self.commit("reorder tasks", changes).await?;
        Ok(tasks)
    }
}

fn sorted<T: Ordered>(mut items: Vec<T>) -> Vec<T> {
    ordering::sort_by_order(&mut items);
    items
}

/// Exactly one of column/parent names the sibling-group of a new task.
fn draft_group(draft: &TaskDraft) -> Result<TaskGroup> {
    let column = draft.column_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let parent = draft.parent_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match (column, parent) {
        (Some(column), None) => Ok(TaskGroup::Column(column.to_string())),
        (None, Some(parent)) => Ok(TaskGroup::Parent(parent.to_string())),
        (Some(_), Some(_)) => Err(BoardzError::validation(
            "a task belongs to a column or to a parent task, not both",
        )),
        (None, None) => Err(BoardzError::validation(
            "a task needs a column or a parent task",
        )),
    }
}

fn apply_task_patch(task: &mut Task, patch: TaskPatch, now: DateTime<Utc>) -> Result<()> {
    if let Some(title) = patch.title {
        task.title = validation::required_name("title", &title)?;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(Some(reset_time)) = &patch.reset_time {
        validation::reset_time(Some(reset_time.as_str()))?;
    }

    let supplied_done_date = matches!(patch.done_date, Some(Some(_)));
    if let Some(done_date) = patch.done_date {
        task.done_date = done_date;
    }
    match patch.done {
        Some(true) => {
            if (!task.done || task.done_date.is_none()) && !supplied_done_date {
                task.done_date = Some(now);
            }
            task.done = true;
        }
        Some(false) => {
            task.done = false;
            task.done_date = None;
        }
        None => {}
    }

    if let Some(deadline) = patch.deadline {
        task.deadline = deadline;
    }
    if let Some(repeating) = patch.repeating {
        task.repeating = repeating;
    }
    if let Some(reset_time) = patch.reset_time {
        task.reset_time = reset_time.map(|t| t.trim().to_string());
    }
    if let Some(is_info) = patch.is_info {
        task.is_info = is_info;
    }
    if let Some(collapsed) = patch.collapsed {
        task.collapsed = collapsed;
    }
    if let Some(color) = patch.color {
        task.color = color;
    }
    if let Some(done_color) = patch.done_color {
        task.done_color = done_color;
    }
    Ok(())
}

#[async_trait]
impl<B: StorageBackend> DataProvider for BoardStore<B> {
    async fn initialize(&self) -> Result<()> {
        self.backend.initialize().await
    }

    // --- Boards ---

    async fn get_boards(&self) -> Result<Vec<Board>> {
        self.sorted_boards().await
    }

    async fn get_board(&self, id: &str) -> Result<Board> {
        self.require_board(id).await
    }

    async fn create_board(&self, name: &str) -> Result<Board> {
        let name = validation::required_name("board name", name)?;
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let count = self.backend.load_boards().await?.len();
        let board = Board::new(name, next_order(count));

        let mut changes = ChangeSet::new();
        changes.put_board(board.clone());
        self.commit("create board", changes).await?;
        Ok(board)
    }

    async fn update_board(&self, id: &str, patch: BoardPatch) -> Result<Board> {
        validation::no_nested("columns", &patch.columns)?;
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let mut board = self.require_board(id).await?;
        if let Some(name) = patch.name {
            board.name = validation::required_name("board name", &name)?;
        }

        let mut changes = ChangeSet::new();
        changes.put_board(board.clone());
        self.commit("update board", changes).await?;
        Ok(board)
    }

    async fn delete_board(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        if self.backend.load_board(id).await?.is_none() {
            return Ok(false);
        }

        let mut changes = ChangeSet::new();
        let columns = self.backend.load_columns(id).await?;
        let mut top_level = Vec::new();
        for column in &columns {
            top_level.extend(
                self.backend
                    .load_tasks(&TaskGroup::Column(column.id.clone()))
                    .await?,
            );
            changes.remove_column(column.id.clone());
        }
        for task_id in self.subtree_ids(top_level).await? {
            changes.remove_task(task_id);
        }
        changes.remove_board(id);

        let mut boards = self.sorted_boards().await?;
        let (_, renumbered) = ordering::remove(&mut boards, id);
        changes.put_boards(renumbered);

        let mut settings = self.backend.load_settings().await?;
        if settings.selected_board_id.as_deref() == Some(id) {
            settings.selected_board_id = boards.first().map(|b| b.id.clone());
            changes.set_settings(settings);
        }

        debug!(board = id, columns = columns.len(), "deleting board");
        self.commit("delete board", changes).await?;
        Ok(true)
    }

    async fn update_board_order(&self) -> Result<Vec<Board>> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let mut boards = self.sorted_boards().await?;
        let mut changes = ChangeSet::new();
        changes.put_boards(ordering::densify(&mut boards));
        self.commit("densify boards", changes).await?;
        Ok(boards)
    }

    async fn reorder_boards(&self, ids: &[String]) -> Result<Vec<Board>> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let mut boards = self.sorted_boards().await?;
        let mut changes = ChangeSet::new();
        changes.put_boards(ordering::reorder_by_ids(&mut boards, ids));
        self.commit("reorder boards", changes).await?;
        Ok(boards)
    }

    // --- Columns ---

    async fn get_columns(&self, board_id: &str) -> Result<Vec<Column>> {
        self.sorted_columns(board_id).await
    }

    async fn get_column(&self, id: &str) -> Result<Column> {
        self.require_column(id).await
    }

    async fn create_column(&self, name: &str, board_id: &str) -> Result<Column> {
        let name = validation::required_name("column name", name)?;
        let board_id = validation::required_id("boardId", Some(board_id))?;
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        self.require_board(board_id).await?;
        let count = self.backend.load_columns(board_id).await?.len();
        let column = Column::new(name, board_id, next_order(count));

        let mut changes = ChangeSet::new();
        changes.put_column(column.clone());
        self.commit("create column", changes).await?;
        Ok(column)
    }

    async fn update_column(&self, id: &str, patch: ColumnPatch) -> Result<Column> {
        validation::no_nested("tasks", &patch.tasks)?;
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let mut column = self.require_column(id).await?;
        if let Some(name) = patch.name {
            column.name = validation::required_name("column name", &name)?;
        }

        let mut changes = ChangeSet::new();
        changes.put_column(column.clone());
        self.commit("update column", changes).await?;
        Ok(column)
    }

    async fn delete_column(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let Some(column) = self.backend.load_column(id).await? else {
            return Ok(false);
        };

        let mut changes = ChangeSet::new();
        let top_level = self
            .backend
            .load_tasks(&TaskGroup::Column(id.to_string()))
            .await?;
        for task_id in self.subtree_ids(top_level).await? {
            changes.remove_task(task_id);
        }
        changes.remove_column(id);

        let mut siblings = self.sorted_columns(&column.board_id).await?;
        let (_, renumbered) = ordering::remove(&mut siblings, id);
        changes.put_columns(renumbered);

        self.commit("delete column", changes).await?;
        Ok(true)
    }

    async fn update_column_order(&self, board_id: &str) -> Result<Vec<Column>> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let mut columns = self.sorted_columns(board_id).await?;
        let mut changes = ChangeSet::new();
        changes.put_columns(ordering::densify(&mut columns));
        self.commit("densify columns", changes).await?;
        Ok(columns)
    }

    async fn reorder_columns(&self, board_id: &str, ids: &[String]) -> Result<Vec<Column>> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        self.require_board(board_id).await?;
        let mut columns = self.sorted_columns(board_id).await?;
        let mut changes = ChangeSet::new();
        changes.put_columns(ordering::reorder_by_ids(&mut columns, ids));
        self.commit("reorder columns", changes).await?;
        Ok(columns)
    }

    // --- Tasks ---

    async fn get_tasks(&self, column_id: &str) -> Result<Vec<Task>> {
        self.sorted_tasks(&TaskGroup::Column(column_id.to_string()))
            .await
    }

    async fn get_subtasks(&self, parent_id: &str) -> Result<Vec<Task>> {
        self.sorted_tasks(&TaskGroup::Parent(parent_id.to_string()))
            .await
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        self.require_task(id).await
    }

    async fn create_task(&self, draft: TaskDraft) -> Result<Task> {
        validation::no_nested("subtasks", &draft.subtasks)?;
        let title = validation::required_name("title", &draft.title)?;
        validation::reset_time(draft.reset_time.as_deref())?;
        let group = draft_group(&draft)?;

        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        self.require_owner(&group).await?;
        let count = self.backend.load_tasks(&group).await?.len();

        let mut task = Task::new(title, group, next_order(count));
        task.description = draft.description.unwrap_or_default();
        task.deadline = draft.deadline;
        task.repeating = draft.repeating;
        task.reset_time = draft.reset_time.map(|t| t.trim().to_string());
        task.is_info = draft.is_info;
        task.color = draft.color;
        task.done_color = draft.done_color;

        let mut changes = ChangeSet::new();
        changes.put_task(task.clone());
        self.commit("create task", changes).await?;
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        validation::no_nested("subtasks", &patch.subtasks)?;
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let mut task = self.require_task(id).await?;
        apply_task_patch(&mut task, patch, Utc::now())?;

        let mut changes = ChangeSet::new();
        changes.put_task(task.clone());
        self.commit("update task", changes).await?;
        Ok(task)
    }

    async fn delete_task(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let Some(task) = self.backend.load_task(id).await? else {
            return Ok(false);
        };

        let mut changes = ChangeSet::new();
        for task_id in self.subtree_ids(vec![task.clone()]).await? {
            changes.remove_task(task_id);
        }
        if let Some(group) = task.group() {
            let mut siblings = self.sorted_tasks(&group).await?;
            let (_, renumbered) = ordering::remove(&mut siblings, id);
            changes.put_tasks(renumbered);
        }

        self.commit("delete task", changes).await?;
        Ok(true)
    }

    async fn move_task(
        &self,
        task_id: &str,
        new_column_id: Option<&str>,
        new_order: usize,
        new_parent_id: Option<&str>,
    ) -> Result<Task> {
        let destination = match (
            new_parent_id.map(str::trim).filter(|s| !s.is_empty()),
            new_column_id.map(str::trim).filter(|s| !s.is_empty()),
        ) {
            (Some(parent), _) => TaskGroup::Parent(parent.to_string()),
            (None, Some(column)) => TaskGroup::Column(column.to_string()),
            (None, None) => {
                return Err(BoardzError::validation(
                    "a move needs a destination column or parent task",
                ))
            }
        };

        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let task = self.require_task(task_id).await?;

        if let TaskGroup::Parent(parent_id) = &destination {
            if parent_id == task_id {
                return Err(BoardzError::validation(format!(
                    "cannot move task '{}' under itself",
                    task.title
                )));
            }
            let below = self.backend.load_descendants(&[task.id.clone()]).await?;
            if below.iter().any(|t| &t.id == parent_id) {
                return Err(BoardzError::validation(format!(
                    "cannot move task '{}' under its own descendant",
                    task.title
                )));
            }
        }
        self.require_owner(&destination).await?;

        let mut changes = ChangeSet::new();
        let origin = task.group();
        let mut moved = task.clone();

        if origin.as_ref() != Some(&destination) {
            if let Some(origin) = &origin {
                let mut siblings = self.sorted_tasks(origin).await?;
                let (_, renumbered) = ordering::remove(&mut siblings, task_id);
                changes.put_tasks(renumbered);
            }
            moved.set_group(destination.clone());
        }

        let mut siblings = self.sorted_tasks(&destination).await?;
        // A move within one group: the index counts the remaining siblings.
        let (_, renumbered) = ordering::remove(&mut siblings, task_id);
        changes.put_tasks(renumbered);
        changes.put_tasks(ordering::insert_at(&mut siblings, moved, new_order));

        let moved = siblings
            .into_iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| BoardzError::not_found(EntityKind::Task, task_id))?;
        changes.put_task(moved.clone());

        debug!(task = task_id, to = %destination, order = moved.order, "moving task");
        self.commit("move task", changes).await?;
        Ok(moved)
    }

    async fn update_task_order(&self, column_id: &str) -> Result<Vec<Task>> {
        self.densify_tasks(TaskGroup::Column(column_id.to_string()))
            .await
    }

    async fn update_subtask_order(&self, parent_id: &str) -> Result<Vec<Task>> {
        self.densify_tasks(TaskGroup::Parent(parent_id.to_string()))
            .await
    }

    async fn reorder_tasks(&self, column_id: &str, ids: &[String]) -> Result<Vec<Task>> {
        self.reorder_task_group(TaskGroup::Column(column_id.to_string()), ids)
            .await
    }

    async fn reorder_subtasks(&self, parent_id: &str, ids: &[String]) -> Result<Vec<Task>> {
        self.reorder_task_group(TaskGroup::Parent(parent_id.to_string()), ids)
            .await
    }

    // --- Settings ---

    async fn get_settings(&self) -> Result<Settings> {
        self.backend.load_settings().await
    }

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let mut settings = self.backend.load_settings().await?;
        if let Some(selected) = patch.selected_board_id {
            if let Some(board_id) = &selected {
                self.require_board(board_id).await?;
            }
            settings.selected_board_id = selected;
        }
        if let Some(is_calendar_view) = patch.is_calendar_view {
            settings.is_calendar_view = is_calendar_view;
        }

        let mut changes = ChangeSet::new();
        changes.set_settings(settings.clone());
        self.commit("update settings", changes).await?;
        Ok(settings)
    }

    // --- Whole data set ---

    async fn export_document(&self) -> Result<Document> {
        let data = self.backend.load_all().await?;
        Ok(unflatten(&data))
    }

    async fn import_document(&self, doc: Document) -> Result<()> {
        let mut data = flatten(&doc);
        data.normalize_orders();
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        debug!(
            boards = data.boards.len(),
            columns = data.columns.len(),
            tasks = data.tasks.len(),
            "importing document"
        );
        self.backend.replace_all(data).await
    }

    // --- Derived queries ---

    async fn task_progress(&self, task_id: &str) -> Result<Progress> {
        let _pinned = self.pin().await?;
        self.require_task(task_id).await?;
        let below = self
            .backend
            .load_descendants(&[task_id.to_string()])
            .await?;
        Ok(Progress::of(&below))
    }

    async fn board_progress(&self, board_id: &str) -> Result<Progress> {
        let _pinned = self.pin().await?;
        self.require_board(board_id).await?;
        let mut tasks = Vec::new();
        for column in self.backend.load_columns(board_id).await? {
            tasks.extend(self.backend.load_tasks(&TaskGroup::Column(column.id)).await?);
        }
        let roots: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        tasks.extend(self.backend.load_descendants(&roots).await?);
        Ok(Progress::of(&tasks))
    }

    async fn reset_repeating_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let _guard = self.write_lock.lock().await;
        let _pinned = self.pin().await?;
        let data = self.backend.load_all().await?;
        let reset: Vec<Task> = data
            .tasks
            .into_iter()
            .filter(|t| needs_reset(t, now))
            .map(|mut t| {
                t.done = false;
                t.done_date = None;
                t
            })
            .collect();

        let mut changes = ChangeSet::new();
        changes.put_tasks(reset.clone());
        self.commit("reset repeating tasks", changes).await?;
        Ok(reset)
    }

    async fn get_tasks_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>> {
        let data = self.backend.load_all().await?;
        let mut due: Vec<Task> = data
            .tasks
            .into_iter()
            .filter(|t| !t.is_info)
            .filter(|t| t.deadline.is_some_and(|d| start <= d && d < end))
            .collect();
        due.sort_by_key(|t| t.deadline);
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::{is_dense, UNORDERED};
    use crate::test_utils::{memory_store, seed_board, seed_tasks, titles};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_create_board_appends_and_trims() {
        let store = memory_store();
        let first = store.create_board("  Work ").await.unwrap();
        let second = store.create_board("Home").await.unwrap();
        assert_eq!(first.name, "Work");
        assert_eq!((first.order, second.order), (0, 1));
    }

    #[tokio::test]
    async fn test_create_board_rejects_blank_name() {
        let store = memory_store();
        let err = store.create_board("   ").await.unwrap_err();
        assert!(matches!(err, BoardzError::Validation(_)));
        assert!(store.get_boards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_board_rejects_nested_columns() {
        let store = memory_store();
        let board = store.create_board("Work").await.unwrap();
        let patch = BoardPatch {
            name: Some("Renamed".into()),
            columns: Some(vec![serde_json::json!({"name": "Todo"})]),
        };
        let err = store.update_board(&board.id, patch).await.unwrap_err();
        assert!(matches!(err, BoardzError::Validation(_)));
        assert_eq!(store.get_board(&board.id).await.unwrap().name, "Work");
    }

    #[tokio::test]
    async fn test_get_board_not_found() {
        let store = memory_store();
        let err = store.get_board("missing").await.unwrap_err();
        assert!(matches!(
            err,
            BoardzError::NotFound {
                kind: EntityKind::Board,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_create_column_unknown_board() {
        let store = memory_store();
        let err = store.create_column("Todo", "nope").await.unwrap_err();
        assert!(matches!(err, BoardzError::NotFound { .. }));
        let err = store.create_column("Todo", " ").await.unwrap_err();
        assert!(matches!(err, BoardzError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_task_needs_exactly_one_owner() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let tasks = seed_tasks(&store, &columns[0].id, &["A"]).await;

        let neither = TaskDraft {
            title: "X".into(),
            ..Default::default()
        };
        assert!(matches!(
            store.create_task(neither).await,
            Err(BoardzError::Validation(_))
        ));

        let both = TaskDraft {
            title: "X".into(),
            column_id: Some(columns[0].id.clone()),
            parent_id: Some(tasks[0].id.clone()),
            ..Default::default()
        };
        assert!(matches!(
            store.create_task(both).await,
            Err(BoardzError::Validation(_))
        ));

        let orphan = TaskDraft::under("ghost", "X");
        assert!(matches!(
            store.create_task(orphan).await,
            Err(BoardzError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_task_rejects_nested_subtasks_and_bad_reset_time() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;

        let mut draft = TaskDraft::in_column(&columns[0].id, "X");
        draft.subtasks = Some(vec![]);
        assert!(store.create_task(draft).await.is_err());

        let draft = TaskDraft::in_column(&columns[0].id, "X").repeating_at("25:00");
        assert!(store.create_task(draft).await.is_err());
        assert!(store.get_tasks(&columns[0].id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subtask_goes_to_parent_group() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let tasks = seed_tasks(&store, &columns[0].id, &["Parent"]).await;

        let first = store
            .create_task(TaskDraft::under(&tasks[0].id, "One"))
            .await
            .unwrap();
        let second = store
            .create_task(TaskDraft::under(&tasks[0].id, "Two"))
            .await
            .unwrap();
        assert_eq!(first.column_id, None);
        assert_eq!((first.order, second.order), (0, 1));
        assert_eq!(store.get_tasks(&columns[0].id).await.unwrap().len(), 1);
        assert_eq!(
            titles(&store.get_subtasks(&tasks[0].id).await.unwrap()),
            vec!["One", "Two"]
        );
    }

    #[tokio::test]
    async fn test_done_stamps_and_clears_done_date() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let task = seed_tasks(&store, &columns[0].id, &["A"]).await.remove(0);

        let before = Utc::now();
        let done = store.update_task(&task.id, TaskPatch::done(true)).await.unwrap();
        assert!(done.done);
        assert!(done.done_date.is_some_and(|d| d >= before));

        let undone = store.update_task(&task.id, TaskPatch::done(false)).await.unwrap();
        assert!(!undone.done);
        assert_eq!(undone.done_date, None);
    }

    #[tokio::test]
    async fn test_done_keeps_supplied_date() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let task = seed_tasks(&store, &columns[0].id, &["A"]).await.remove(0);
        let when = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();

        let patch = TaskPatch {
            done: Some(true),
            done_date: Some(Some(when)),
            ..Default::default()
        };
        let done = store.update_task(&task.id, patch).await.unwrap();
        assert_eq!(done.done_date, Some(when));
    }

    #[tokio::test]
    async fn test_update_task_keeps_membership() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let task = seed_tasks(&store, &columns[0].id, &["A", "B"]).await.remove(1);

        let patch = TaskPatch {
            title: Some("Renamed".into()),
            color: Some(Some("#ff0000".into())),
            ..Default::default()
        };
        let updated = store.update_task(&task.id, patch).await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.color.as_deref(), Some("#ff0000"));
        assert_eq!(updated.column_id, task.column_id);
        assert_eq!(updated.order, 1);
    }

    #[tokio::test]
    async fn test_delete_task_cascades_and_renumbers() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let tasks = seed_tasks(&store, &columns[0].id, &["A", "B", "C"]).await;
        let sub = store
            .create_task(TaskDraft::under(&tasks[0].id, "A.1"))
            .await
            .unwrap();
        let subsub = store
            .create_task(TaskDraft::under(&sub.id, "A.1.1"))
            .await
            .unwrap();

        assert!(store.delete_task(&tasks[0].id).await.unwrap());
        assert!(!store.delete_task(&tasks[0].id).await.unwrap());

        let remaining = store.get_tasks(&columns[0].id).await.unwrap();
        assert_eq!(titles(&remaining), vec!["B", "C"]);
        assert!(is_dense(&remaining));
        assert!(store.get_task(&sub.id).await.is_err());
        assert!(store.get_task(&subsub.id).await.is_err());
    }

    #[tokio::test]
    async fn test_move_within_column() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let tasks = seed_tasks(&store, &columns[0].id, &["A", "B", "C", "D", "E"]).await;

        let moved = store
            .move_task(&tasks[0].id, Some(columns[0].id.as_str()), 3, None)
            .await
            .unwrap();
        assert_eq!(moved.order, 3);

        let after = store.get_tasks(&columns[0].id).await.unwrap();
        assert_eq!(titles(&after), vec!["B", "C", "D", "A", "E"]);
        assert!(is_dense(&after));
    }

    #[tokio::test]
    async fn test_move_across_columns_clamps_index() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo", "Done"]).await;
        let todo = seed_tasks(&store, &columns[0].id, &["A", "B"]).await;
        seed_tasks(&store, &columns[1].id, &["X"]).await;

        let moved = store
            .move_task(&todo[0].id, Some(columns[1].id.as_str()), 99, None)
            .await
            .unwrap();
        assert_eq!(moved.column_id.as_deref(), Some(columns[1].id.as_str()));
        assert_eq!(moved.order, 1);

        let origin = store.get_tasks(&columns[0].id).await.unwrap();
        assert_eq!(titles(&origin), vec!["B"]);
        assert_eq!(origin[0].order, 0);
        assert_eq!(
            titles(&store.get_tasks(&columns[1].id).await.unwrap()),
            vec!["X", "A"]
        );
    }

    #[tokio::test]
    async fn test_move_under_descendant_is_rejected() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let top = seed_tasks(&store, &columns[0].id, &["Top"]).await.remove(0);
        let child = store
            .create_task(TaskDraft::under(&top.id, "Child"))
            .await
            .unwrap();

        let err = store
            .move_task(&top.id, None, 0, Some(child.id.as_str()))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardzError::Validation(_)));
        let err = store
            .move_task(&top.id, None, 0, Some(top.id.as_str()))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardzError::Validation(_)));
        let err = store.move_task(&top.id, None, 0, None).await.unwrap_err();
        assert!(matches!(err, BoardzError::Validation(_)));
    }

    #[tokio::test]
    async fn test_subtask_promoted_to_column() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let top = seed_tasks(&store, &columns[0].id, &["Top"]).await.remove(0);
        let child = store
            .create_task(TaskDraft::under(&top.id, "Child"))
            .await
            .unwrap();

        let moved = store
            .move_task(&child.id, Some(columns[0].id.as_str()), 0, None)
            .await
            .unwrap();
        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.column_id.as_deref(), Some(columns[0].id.as_str()));
        assert_eq!(
            titles(&store.get_tasks(&columns[0].id).await.unwrap()),
            vec!["Child", "Top"]
        );
        assert!(store.get_subtasks(&top.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_densify_unordered_tasks() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let tasks = seed_tasks(&store, &columns[0].id, &["A", "B"]).await;

        let mut changes = ChangeSet::new();
        let mut a = tasks[0].clone();
        a.order = UNORDERED;
        changes.put_task(a);
        store.backend().commit(changes).await.unwrap();

        let tasks = store.update_task_order(&columns[0].id).await.unwrap();
        assert_eq!(titles(&tasks), vec!["B", "A"]);
        assert!(is_dense(&tasks));
    }

    #[tokio::test]
    async fn test_reorder_boards_filters_unknown_ids() {
        let store = memory_store();
        let a = store.create_board("A").await.unwrap();
        let b = store.create_board("B").await.unwrap();
        let c = store.create_board("C").await.unwrap();

        let boards = store
            .reorder_boards(&[c.id.clone(), "ghost".into(), a.id.clone()])
            .await
            .unwrap();
        let ids: Vec<&str> = boards.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec![c.id.as_str(), a.id.as_str(), b.id.as_str()]);
        assert!(is_dense(&boards));
    }

    #[tokio::test]
    async fn test_update_settings_rejects_unknown_board() {
        let store = memory_store();
        let err = store
            .update_settings(SettingsPatch::select_board(Some("ghost".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardzError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_progress_excludes_info_tasks() {
        let store = memory_store();
        let (board, columns) = seed_board(&store, "B", &["Todo"]).await;
        let top = seed_tasks(&store, &columns[0].id, &["Top"]).await.remove(0);
        let one = store
            .create_task(TaskDraft::under(&top.id, "One"))
            .await
            .unwrap();
        store
            .create_task(TaskDraft::under(&top.id, "Two"))
            .await
            .unwrap();
        store
            .create_task(TaskDraft::under(&top.id, "Note").as_info())
            .await
            .unwrap();
        store.update_task(&one.id, TaskPatch::done(true)).await.unwrap();

        assert_eq!(
            store.task_progress(&top.id).await.unwrap(),
            Progress { done: 1, total: 2 }
        );
        assert_eq!(
            store.board_progress(&board.id).await.unwrap(),
            Progress { done: 1, total: 3 }
        );
    }

    #[tokio::test]
    async fn test_reset_repeating_tasks() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let daily = store
            .create_task(TaskDraft::in_column(&columns[0].id, "Daily").repeating_at("06:00"))
            .await
            .unwrap();
        let once = seed_tasks(&store, &columns[0].id, &["Once"]).await.remove(0);
        let done_at = Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap();
        for id in [&daily.id, &once.id] {
            let patch = TaskPatch {
                done: Some(true),
                done_date: Some(Some(done_at)),
                ..Default::default()
            };
            store.update_task(id, patch).await.unwrap();
        }

        let early = Utc.with_ymd_and_hms(2024, 3, 11, 5, 0, 0).unwrap();
        assert!(store.reset_repeating_tasks(early).await.unwrap().is_empty());

        let later = Utc.with_ymd_and_hms(2024, 3, 11, 6, 30, 0).unwrap();
        let reset = store.reset_repeating_tasks(later).await.unwrap();
        assert_eq!(titles(&reset), vec!["Daily"]);
        assert!(!store.get_task(&daily.id).await.unwrap().done);
        assert!(store.get_task(&once.id).await.unwrap().done);
    }

    #[tokio::test]
    async fn test_tasks_due_between() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        let day = |d: u32| Utc.with_ymd_and_hms(2024, 6, d, 12, 0, 0).unwrap();
        for (title, d) in [("Late", 20), ("Soon", 5), ("Edge", 10)] {
            store
                .create_task(TaskDraft::in_column(&columns[0].id, title).with_deadline(day(d)))
                .await
                .unwrap();
        }
        store
            .create_task(TaskDraft::in_column(&columns[0].id, "Note").with_deadline(day(6)).as_info())
            .await
            .unwrap();

        let due = store.get_tasks_due_between(day(1), day(10)).await.unwrap();
        assert_eq!(titles(&due), vec!["Soon"]);
    }

    #[tokio::test]
    async fn test_export_import_normalizes_orders() {
        let store = memory_store();
        let (_, columns) = seed_board(&store, "B", &["Todo"]).await;
        seed_tasks(&store, &columns[0].id, &["A", "B"]).await;

        let mut doc = store.export_document().await.unwrap();
        doc.boards[0].columns[0].tasks[0].order = Some(40);
        doc.boards[0].columns[0].tasks[1].order = Some(7);

        let other = memory_store();
        other.import_document(doc).await.unwrap();
        let tasks = other.get_tasks(&columns[0].id).await.unwrap();
        assert_eq!(titles(&tasks), vec!["B", "A"]);
        assert!(is_dense(&tasks));
    }
}
