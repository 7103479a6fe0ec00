//! HTTP storage against a board server.
//!
//! The server holds one normalized document:
//!
//! | Request | Body |
//! |---------|------|
//! | `GET {api_url}/api/data` | response: `{ settings, boards, columns, tasks }` |
//! | `POST {api_url}/api/data` | request: the same shape, replacing everything |
//!
//! Outside a pinned snapshot every read fetches the document, and every commit
//! fetches, applies the change set and posts the whole document back. While
//! the store holds a pin (one provider operation), loads are answered from the
//! document fetched by the pin and commits post it back without refetching, so
//! a cascading delete costs one `GET` and one `POST`. Nothing outlives the pin:
//! wrap the provider in [`crate::store::cached::CachedProvider`] for caching.

use super::backend::{ChangeSet, StorageBackend};
use crate::error::{BoardzError, Result};
use crate::model::{Board, Column, Dataset, Settings, Task, TaskGroup};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

pub const DATA_PATH: &str = "/api/data";

pub struct RemoteBackend {
    client: Client,
    api_url: String,
    api_token: String,
    snapshot: Mutex<Snapshot>,
}

#[derive(Default)]
struct Snapshot {
    holders: usize,
    data: Option<Dataset>,
}

impl RemoteBackend {
    pub fn new(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_url, api_token)
    }

    pub fn with_client(
        client: Client,
        api_url: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            api_url,
            api_token: api_token.into(),
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn data_url(&self) -> String {
        format!("{}{}", self.api_url, DATA_PATH)
    }

    /// Current server document.
    pub async fn fetch(&self) -> Result<Dataset> {
        let res = self
            .client
            .get(self.data_url())
            .header("Authorization", format!("Bearer {}", self.api_token))
            .send()
            .await?;
        let res = check_status(res).await?;
        Ok(res.json::<Dataset>().await?)
    }

    /// Replaces the server document with `data`.
    pub async fn push(&self, data: &Dataset) -> Result<()> {
        let res = self
            .client
            .post(self.data_url())
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(data)
            .send()
            .await?;
        check_status(res).await?;
        Ok(())
    }

    fn lock_snapshot(&self) -> Result<MutexGuard<'_, Snapshot>> {
        self.snapshot
            .lock()
            .map_err(|_| BoardzError::Store("remote snapshot lock poisoned".to_string()))
    }

    /// The pinned document, or a fresh fetch when nothing is pinned.
    async fn current(&self) -> Result<Dataset> {
        let pinned = self.lock_snapshot()?.data.clone();
        match pinned {
            Some(data) => Ok(data),
            None => self.fetch().await,
        }
    }

    /// Keeps a pinned snapshot in step with what was just pushed.
    fn pushed(&self, data: Dataset) -> Result<()> {
        let mut snapshot = self.lock_snapshot()?;
        if snapshot.holders > 0 {
            snapshot.data = Some(data);
        }
        Ok(())
    }
}

async fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let message = res.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "board server rejected request");
    Err(BoardzError::Http {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            message
        },
    })
}

#[async_trait]
impl StorageBackend for RemoteBackend {
    async fn initialize(&self) -> Result<()> {
        let data = self.fetch().await?;
        debug!(url = %self.api_url, boards = data.boards.len(), "connected to board server");
        Ok(())
    }

    async fn load_boards(&self) -> Result<Vec<Board>> {
        Ok(self.current().await?.boards)
    }

    async fn load_board(&self, id: &str) -> Result<Option<Board>> {
        Ok(self.current().await?.board(id).cloned())
    }

    async fn load_columns(&self, board_id: &str) -> Result<Vec<Column>> {
        Ok(self.current().await?.columns_of(board_id))
    }

    async fn load_column(&self, id: &str) -> Result<Option<Column>> {
        Ok(self.current().await?.column(id).cloned())
    }

    async fn load_tasks(&self, group: &TaskGroup) -> Result<Vec<Task>> {
        Ok(self.current().await?.tasks_in(group))
    }

    async fn load_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.current().await?.task(id).cloned())
    }

    async fn load_descendants(&self, root_ids: &[String]) -> Result<Vec<Task>> {
        Ok(self.current().await?.descendants_of(root_ids))
    }

    async fn load_settings(&self) -> Result<Settings> {
        Ok(self.current().await?.settings)
    }

    async fn load_all(&self) -> Result<Dataset> {
        self.current().await
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut data = self.current().await?;
        data.apply(&changes);
        self.push(&data).await?;
        debug!(writes = changes.len(), "pushed board document");
        self.pushed(data)
    }

    async fn replace_all(&self, data: Dataset) -> Result<()> {
        self.push(&data).await?;
        self.pushed(data)
    }

    async fn pin_snapshot(&self) -> Result<()> {
        let loaded = self.lock_snapshot()?.holders > 0;
        let fetched = if loaded {
            None
        } else {
            Some(self.fetch().await?)
        };
        let mut snapshot = self.lock_snapshot()?;
        if snapshot.data.is_none() {
            snapshot.data = fetched;
        }
        snapshot.holders += 1;
        trace!(holders = snapshot.holders, "pinned board document");
        Ok(())
    }

    fn release_snapshot(&self) {
        if let Ok(mut snapshot) = self.snapshot.lock() {
            snapshot.holders = snapshot.holders.saturating_sub(1);
            if snapshot.holders == 0 {
                snapshot.data = None;
            }
        }
    }
}
