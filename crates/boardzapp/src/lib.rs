//! # Boardz Architecture
//!
//! Boardz is the data layer of a kanban board: boards hold ordered columns,
//! columns hold ordered tasks, and tasks hold ordered subtasks at any depth.
//! The same data can live in a local JSON document, a SQLite database or on a
//! board server, and every one of them behaves identically behind one trait.
//!
//! ## Layers
//!
//! ```text
//! collaborator (CLI, UI)
//!        │
//!        ▼
//! registry::ProviderRegistry ── picks and owns the active provider
//!        │
//!        ▼
//! provider::DataProvider     ── async operations, owned results
//!        │
//!        ▼
//! store::board_store         ── validation, ordering, cascades
//!        │
//!        ▼
//! store::backend             ── document │ sqlite │ http
//! ```
//!
//! ## Core Invariants
//!
//! - **Normalized records**: every entity points at its owner (`boardId`,
//!   `columnId`, `parentId`); nobody stores child lists. See [`model`].
//! - **Dense ordering**: each sibling-group is ordered `0..n-1`. See [`ordering`].
//! - **Atomic writes**: one operation is one backend commit. See [`store`].
//! - **Cascading deletes**: removing an owner removes everything below it.
//!
//! ## Modules
//!
//! - [`model`]: entities, drafts and patches
//! - [`ordering`]: dense-order algorithms shared by all backends
//! - [`provider`]: the [`provider::DataProvider`] trait
//! - [`store`]: backends, the board store and the cache layer
//! - [`registry`]: provider construction and the active-provider registry
//! - [`config`]: layered configuration
//! - [`schedule`]: daily reset of repeating tasks
//! - [`stats`]: completion progress
//! - [`validation`]: input checks
//! - [`error`]: the crate error type

pub mod config;
pub mod error;
pub mod model;
pub mod ordering;
pub mod provider;
pub mod registry;
pub mod schedule;
pub mod stats;
pub mod store;
pub mod validation;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use error::{BoardzError, Result};
pub use provider::DataProvider;
pub use registry::{BackendKind, ProviderConfig, ProviderRegistry};
