use crate::model::{Board, Column, Task, TaskDraft};
use crate::ordering::Ordered;
use crate::provider::DataProvider;
use crate::store::board_store::BoardStore;
use crate::store::document_backend::DocumentBackend;
use crate::store::indexed_backend::IndexedBackend;
use crate::store::slot::MemorySlot;

pub type MemoryStore = BoardStore<DocumentBackend<MemorySlot>>;

/// A flat-document store over an in-memory slot.
pub fn memory_store() -> MemoryStore {
    BoardStore::with_backend(DocumentBackend::new(MemorySlot::new()))
}

/// An indexed store over a private in-memory SQLite database.
pub fn indexed_store() -> BoardStore<IndexedBackend> {
    BoardStore::with_backend(IndexedBackend::in_memory())
}

/// Creates a board with one column per name.
pub async fn seed_board<P: DataProvider + ?Sized>(
    provider: &P,
    name: &str,
    columns: &[&str],
) -> (Board, Vec<Column>) {
    let board = provider
        .create_board(name)
        .await
        .expect("failed to seed board");
    let mut created = Vec::new();
    for column in columns {
        created.push(
            provider
                .create_column(column, &board.id)
                .await
                .expect("failed to seed column"),
        );
    }
    (board, created)
}

/// Appends one top-level task per title to a column.
pub async fn seed_tasks<P: DataProvider + ?Sized>(
    provider: &P,
    column_id: &str,
    titles: &[&str],
) -> Vec<Task> {
    let mut created = Vec::new();
    for title in titles {
        created.push(
            provider
                .create_task(TaskDraft::in_column(column_id, *title))
                .await
                .expect("failed to seed task"),
        );
    }
    created
}

pub fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.title.as_str()).collect()
}

pub fn orders<T: Ordered>(items: &[T]) -> Vec<u32> {
    items.iter().map(Ordered::order).collect()
}
