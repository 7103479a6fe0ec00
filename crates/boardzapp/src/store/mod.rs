//! # Storage Layer
//!
//! Storage is split in two layers:
//!
//! 1. **[`backend::StorageBackend`]**: raw record I/O over the normalized shape.
//!    Backends load records and apply [`backend::ChangeSet`]s atomically. They
//!    never validate, sort or renumber.
//! 2. **[`board_store::BoardStore`]**: the single implementation of
//!    [`crate::provider::DataProvider`]. Validation, ordering and cascades live
//!    here once, so every backend behaves the same.
//!
//! ```text
//! DataProvider ──► [CachedProvider] ──► BoardStore<B> ──► B: StorageBackend
//!                                                        ├── DocumentBackend<S: KeyValueSlot>
//!                                                        ├── IndexedBackend   (SQLite)
//!                                                        └── RemoteBackend    (HTTP)
//! ```
//!
//! ## Atomic Writes
//!
//! Each provider write builds one `ChangeSet` (the entity plus every sibling
//! whose order moved, plus cascaded removals) and commits it in one step:
//!
//! | Backend | Commit |
//! |---------|--------|
//! | document | apply in memory, flush the whole document, swap in on success |
//! | indexed | one SQLite transaction |
//! | remote | fetch, apply, one `POST` of the whole document |
//!
//! A process killed mid-operation therefore never leaves a half-renumbered
//! group behind.
//!
//! ## Implementations
//!
//! - [`document_backend::DocumentBackend`]: nested JSON document in a
//!   [`slot::KeyValueSlot`] ([`slot::FileSlot`] in production,
//!   [`slot::MemorySlot`] for tests). See [`document`] for the on-disk shape.
//! - [`indexed_backend::IndexedBackend`]: SQLite file with indexed foreign keys.
//! - [`remote_backend::RemoteBackend`]: board server over HTTP.
//! - [`cached::CachedProvider`]: optional read-through cache over any provider.
//!
//! ## Storage Layout
//!
//! ```text
//! <data dir>/
//! ├── boardz-data.json    # local backend document
//! └── boardz.db           # indexed backend database
//! ```

pub mod backend;
pub mod board_store;
pub mod cached;
pub mod dataset;
pub mod document;
pub mod document_backend;
pub mod indexed_backend;
pub mod remote_backend;
pub mod slot;
