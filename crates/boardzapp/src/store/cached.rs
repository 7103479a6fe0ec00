//! Read-through cache in front of any [`DataProvider`].
//!
//! Entity reads (boards, columns, tasks, settings) are memoized per call
//! signature. Every write, successful or not, drops the whole cache: a write
//! can renumber or cascade across groups, so nothing cached before it is
//! trusted afterwards. Derived queries and exports always go to the inner
//! provider.
//!
//! Each invalidation bumps a generation counter. A read only stores its
//! result when no invalidation happened while it was in flight, so a slow
//! read that started before a write cannot put pre-write data back.

use crate::error::Result;
use crate::model::{
    Board, BoardPatch, Column, ColumnPatch, Settings, SettingsPatch, Task, TaskDraft, TaskPatch,
};
use crate::provider::DataProvider;
use crate::stats::Progress;
use crate::store::document::Document;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::trace;

#[derive(Debug, Clone)]
enum Cached {
    Boards(Vec<Board>),
    Board(Board),
    Columns(Vec<Column>),
    Column(Column),
    Tasks(Vec<Task>),
    Task(Task),
    Settings(Settings),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

pub struct CachedProvider<P: DataProvider> {
    inner: P,
    entries: RwLock<HashMap<String, Cached>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

// Generates a memoized read: look up `key`, else call the inner provider and
// store the result under the given variant unless a write invalidated the
// cache in the meantime.
macro_rules! cached_read {
    ($self:ident, $key:expr, $variant:ident, $call:expr) => {{
        let key = $key;
        if let Some(Cached::$variant(value)) = $self.entries.read().await.get(&key) {
            $self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "cache hit");
            return Ok(value.clone());
        }
        $self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(key = %key, "cache miss");
        let generation = $self.generation.load(Ordering::Acquire);
        let value = $call.await?;
        let mut entries = $self.entries.write().await;
        if $self.generation.load(Ordering::Acquire) == generation {
            entries.insert(key, Cached::$variant(value.clone()));
        } else {
            trace!(key = %key, "read raced a write, not cached");
        }
        Ok(value)
    }};
}

impl<P: DataProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub async fn invalidate(&self) {
        let mut entries = self.entries.write().await;
        // Bumped under the entries lock, the same lock `cached_read!` checks under.
        self.generation.fetch_add(1, Ordering::AcqRel);
        if !entries.is_empty() {
            trace!(entries = entries.len(), "cache invalidated");
            entries.clear();
        }
    }

    async fn write<T>(&self, result: Result<T>) -> Result<T> {
        self.invalidate().await;
        result
    }
}

#[async_trait]
impl<P: DataProvider> DataProvider for CachedProvider<P> {
    async fn initialize(&self) -> Result<()> {
        self.invalidate().await;
        self.inner.initialize().await
    }

    async fn get_boards(&self) -> Result<Vec<Board>> {
        cached_read!(self, "boards".to_string(), Boards, self.inner.get_boards())
    }

    async fn get_board(&self, id: &str) -> Result<Board> {
        cached_read!(self, format!("board:{}", id), Board, self.inner.get_board(id))
    }

    async fn create_board(&self, name: &str) -> Result<Board> {
        self.write(self.inner.create_board(name).await).await
    }

    async fn update_board(&self, id: &str, patch: BoardPatch) -> Result<Board> {
        self.write(self.inner.update_board(id, patch).await).await
    }

    async fn delete_board(&self, id: &str) -> Result<bool> {
        self.write(self.inner.delete_board(id).await).await
    }

    async fn update_board_order(&self) -> Result<Vec<Board>> {
        self.write(self.inner.update_board_order().await).await
    }

    async fn reorder_boards(&self, ids: &[String]) -> Result<Vec<Board>> {
        self.write(self.inner.reorder_boards(ids).await).await
    }

    async fn get_columns(&self, board_id: &str) -> Result<Vec<Column>> {
        cached_read!(
            self,
            format!("columns:{}", board_id),
            Columns,
            self.inner.get_columns(board_id)
        )
    }

    async fn get_column(&self, id: &str) -> Result<Column> {
        cached_read!(self, format!("column:{}", id), Column, self.inner.get_column(id))
    }

    async fn create_column(&self, name: &str, board_id: &str) -> Result<Column> {
        self.write(self.inner.create_column(name, board_id).await)
            .await
    }

    async fn update_column(&self, id: &str, patch: ColumnPatch) -> Result<Column> {
        self.write(self.inner.update_column(id, patch).await).await
    }

    async fn delete_column(&self, id: &str) -> Result<bool> {
        self.write(self.inner.delete_column(id).await).await
    }

    async fn update_column_order(&self, board_id: &str) -> Result<Vec<Column>> {
        self.write(self.inner.update_column_order(board_id).await)
            .await
    }

    async fn reorder_columns(&self, board_id: &str, ids: &[String]) -> Result<Vec<Column>> {
        self.write(self.inner.reorder_columns(board_id, ids).await)
            .await
    }

    async fn get_tasks(&self, column_id: &str) -> Result<Vec<Task>> {
        cached_read!(
            self,
            format!("tasks:{}", column_id),
            Tasks,
            self.inner.get_tasks(column_id)
        )
    }

    async fn get_subtasks(&self, parent_id: &str) -> Result<Vec<Task>> {
        cached_read!(
            self,
            format!("subtasks:{}", parent_id),
            Tasks,
            self.inner.get_subtasks(parent_id)
        )
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        cached_read!(self, format!("task:{}", id), Task, self.inner.get_task(id))
    }

    async fn create_task(&self, draft: TaskDraft) -> Result<Task> {
        self.write(self.inner.create_task(draft).await).await
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        self.write(self.inner.update_task(id, patch).await).await
    }

    async fn delete_task(&self, id: &str) -> Result<bool> {
        self.write(self.inner.delete_task(id).await).await
    }

    async fn move_task(
        &self,
        task_id: &str,
        new_column_id: Option<&str>,
        new_order: usize,
        new_parent_id: Option<&str>,
    ) -> Result<Task> {
        let result = self
            .inner
            .move_task(task_id, new_column_id, new_order, new_parent_id)
            .await;
        self.write(result).await
    }

    async fn update_task_order(&self, column_id: &str) -> Result<Vec<Task>> {
        self.write(self.inner.update_task_order(column_id).await)
            .await
    }

    async fn update_subtask_order(&self, parent_id: &str) -> Result<Vec<Task>> {
        self.write(self.inner.update_subtask_order(parent_id).await)
            .await
    }

    async fn reorder_tasks(&self, column_id: &str, ids: &[String]) -> Result<Vec<Task>> {
        self.write(self.inner.reorder_tasks(column_id, ids).await)
            .await
    }

    async fn reorder_subtasks(&self, parent_id: &str, ids: &[String]) -> Result<Vec<Task>> {
        self.write(self.inner.reorder_subtasks(parent_id, ids).await)
            .await
    }

    async fn get_settings(&self) -> Result<Settings> {
        cached_read!(self, "settings".to_string(), Settings, self.inner.get_settings())
    }

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        self.write(self.inner.update_settings(patch).await).await
    }

    async fn export_document(&self) -> Result<Document> {
        self.inner.export_document().await
    }

    async fn import_document(&self, doc: Document) -> Result<()> {
        self.write(self.inner.import_document(doc).await).await
    }

    async fn task_progress(&self, task_id: &str) -> Result<Progress> {
        self.inner.task_progress(task_id).await
    }

    async fn board_progress(&self, board_id: &str) -> Result<Progress> {
        self.inner.board_progress(board_id).await
    }

    async fn reset_repeating_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        self.write(self.inner.reset_repeating_tasks(now).await).await
    }

    async fn get_tasks_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>> {
        self.inner.get_tasks_due_between(start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dataset, TaskGroup};
    use crate::store::backend::{ChangeSet, StorageBackend};
    use crate::store::board_store::BoardStore;
    use crate::store::document_backend::DocumentBackend;
    use crate::store::slot::MemorySlot;
    use crate::test_utils::memory_store;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    /// Document backend whose first `load_boards` takes its snapshot, then
    /// stalls before returning it.
    struct StallingBackend {
        inner: DocumentBackend<MemorySlot>,
        stall_next: AtomicBool,
    }

    impl StallingBackend {
        fn new() -> Self {
            Self {
                inner: DocumentBackend::new(MemorySlot::new()),
                stall_next: AtomicBool::new(true),
            }
        }
    }

    #[async_trait]
    impl StorageBackend for StallingBackend {
        async fn initialize(&self) -> Result<()> {
            self.inner.initialize().await
        }

        async fn load_boards(&self) -> Result<Vec<Board>> {
            let boards = self.inner.load_boards().await?;
            if self.stall_next.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Ok(boards)
        }

        async fn load_board(&self, id: &str) -> Result<Option<Board>> {
            self.inner.load_board(id).await
        }

        async fn load_columns(&self, board_id: &str) -> Result<Vec<Column>> {
            self.inner.load_columns(board_id).await
        }

        async fn load_column(&self, id: &str) -> Result<Option<Column>> {
            self.inner.load_column(id).await
        }

        async fn load_tasks(&self, group: &TaskGroup) -> Result<Vec<Task>> {
            self.inner.load_tasks(group).await
        }

        async fn load_task(&self, id: &str) -> Result<Option<Task>> {
            self.inner.load_task(id).await
        }

        async fn load_descendants(&self, root_ids: &[String]) -> Result<Vec<Task>> {
            self.inner.load_descendants(root_ids).await
        }

        async fn load_settings(&self) -> Result<Settings> {
            self.inner.load_settings().await
        }

        async fn load_all(&self) -> Result<Dataset> {
            self.inner.load_all().await
        }

        async fn commit(&self, changes: ChangeSet) -> Result<()> {
            self.inner.commit(changes).await
        }

        async fn replace_all(&self, data: Dataset) -> Result<()> {
            self.inner.replace_all(data).await
        }
    }

    #[tokio::test]
    async fn test_slow_read_started_before_write_is_not_cached() {
        let provider = Arc::new(CachedProvider::new(BoardStore::with_backend(
            StallingBackend::new(),
        )));

        let reader = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.get_boards().await })
        };
        // Let the reader take its snapshot before writing.
        tokio::time::sleep(Duration::from_millis(50)).await;
        provider.create_board("Written").await.unwrap();

        let stale = reader.await.unwrap().unwrap();
        assert!(stale.is_empty());
        let boards = provider.get_boards().await.unwrap();
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].name, "Written");
    }

    #[tokio::test]
    async fn test_repeated_reads_hit_cache() {
        let provider = CachedProvider::new(memory_store());
        provider.create_board("Work").await.unwrap();

        provider.get_boards().await.unwrap();
        provider.get_boards().await.unwrap();
        assert_eq!(provider.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn test_write_invalidates_everything() {
        let provider = CachedProvider::new(memory_store());
        let board = provider.create_board("Work").await.unwrap();
        assert_eq!(provider.get_boards().await.unwrap().len(), 1);
        assert_eq!(provider.get_board(&board.id).await.unwrap().name, "Work");

        provider
            .update_board(&board.id, BoardPatch::rename("Play"))
            .await
            .unwrap();
        provider.create_board("Home").await.unwrap();

        assert_eq!(provider.get_boards().await.unwrap().len(), 2);
        assert_eq!(provider.get_board(&board.id).await.unwrap().name, "Play");
    }

    #[tokio::test]
    async fn test_failed_reads_are_not_cached() {
        let provider = CachedProvider::new(memory_store());
        assert!(provider.get_board("ghost").await.is_err());
        assert!(provider.get_board("ghost").await.is_err());
        assert_eq!(provider.stats().hits, 0);
    }

    #[tokio::test]
    async fn test_failed_write_still_invalidates() {
        let provider = CachedProvider::new(memory_store());
        provider.get_settings().await.unwrap();
        assert!(provider.create_board("  ").await.is_err());
        provider.get_settings().await.unwrap();
        assert_eq!(provider.stats(), CacheStats { hits: 0, misses: 2 });
    }
}
