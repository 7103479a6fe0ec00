use super::backend::{ChangeSet, StorageBackend};
use super::document::{flatten, unflatten, Document};
use super::slot::KeyValueSlot;
use crate::error::Result;
use crate::model::{Board, Column, Dataset, Settings, Task, TaskGroup};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

/// Slot key the document is stored under.
pub const DOCUMENT_KEY: &str = "boardz-data";

/// Flat document backend: the whole data set in one JSON document.
///
/// The document is loaded once into memory as a normalized [`Dataset`] and
/// flushed wholesale to the slot on every commit. Nesting only exists on the
/// slot side of [`flatten`]/[`unflatten`].
pub struct DocumentBackend<S: KeyValueSlot> {
    slot: S,
    key: String,
    data: RwLock<Option<Dataset>>,
}

impl<S: KeyValueSlot> DocumentBackend<S> {
    pub fn new(slot: S) -> Self {
        Self::with_key(slot, DOCUMENT_KEY)
    }

    pub fn with_key(slot: S, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
            data: RwLock::new(None),
        }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    fn read_slot(&self) -> Result<Dataset> {
        match self.slot.read(&self.key)? {
            Some(raw) if !raw.trim().is_empty() => {
                let doc: Document = serde_json::from_str(&raw)?;
                Ok(flatten(&doc))
            }
            _ => Ok(Dataset::default()),
        }
    }

    fn write_slot(&self, data: &Dataset) -> Result<()> {
        let raw = serde_json::to_string(&unflatten(data))?;
        self.slot.write(&self.key, &raw)
    }

    async fn read<R>(&self, f: impl FnOnce(&Dataset) -> R) -> Result<R> {
        {
            let guard = self.data.read().await;
            if let Some(data) = guard.as_ref() {
                return Ok(f(data));
            }
        }
        let mut guard = self.data.write().await;
        if guard.is_none() {
            *guard = Some(self.read_slot()?);
        }
        let data = guard.get_or_insert_with(Dataset::default);
        Ok(f(data))
    }

    /// The persisted document, rebuilt from memory.
    pub async fn get_data(&self) -> Result<Document> {
        self.read(unflatten).await
    }

    /// Persists `doc` as the whole data set.
    pub async fn save_data(&self, doc: &Document) -> Result<()> {
        self.replace_all(flatten(doc)).await
    }
}

#[async_trait]
impl<S: KeyValueSlot> StorageBackend for DocumentBackend<S> {
    async fn initialize(&self) -> Result<()> {
        let mut guard = self.data.write().await;
        if guard.is_none() {
            let data = self.read_slot()?;
            debug!(
                boards = data.boards.len(),
                columns = data.columns.len(),
                tasks = data.tasks.len(),
                "loaded board document"
            );
            *guard = Some(data);
        }
        Ok(())
    }

    async fn load_boards(&self) -> Result<Vec<Board>> {
        self.read(|data| data.boards.clone()).await
    }

    async fn load_board(&self, id: &str) -> Result<Option<Board>> {
        self.read(|data| data.board(id).cloned()).await
    }

    async fn load_columns(&self, board_id: &str) -> Result<Vec<Column>> {
        self.read(|data| data.columns_of(board_id)).await
    }

    async fn load_column(&self, id: &str) -> Result<Option<Column>> {
        self.read(|data| data.column(id).cloned()).await
    }

    async fn load_tasks(&self, group: &TaskGroup) -> Result<Vec<Task>> {
        self.read(|data| data.tasks_in(group)).await
    }

    async fn load_task(&self, id: &str) -> Result<Option<Task>> {
        self.read(|data| data.task(id).cloned()).await
    }

    async fn load_descendants(&self, root_ids: &[String]) -> Result<Vec<Task>> {
        self.read(|data| data.descendants_of(root_ids)).await
    }

    async fn load_settings(&self) -> Result<Settings> {
        self.read(|data| data.settings.clone()).await
    }

    async fn load_all(&self) -> Result<Dataset> {
        self.read(Dataset::clone).await
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut guard = self.data.write().await;
        let mut next = match guard.as_ref() {
            Some(data) => data.clone(),
            None => self.read_slot()?,
        };
        next.apply(&changes);

        // Memory only moves forward once the slot accepted the write.
        self.write_slot(&next)?;
        debug!(writes = changes.len(), "flushed board document");
        *guard = Some(next);
        Ok(())
    }

    async fn replace_all(&self, data: Dataset) -> Result<()> {
        let mut guard = self.data.write().await;
        self.write_slot(&data)?;
        *guard = Some(data);
        Ok(())
    }
}
