//! SQLite-backed storage.
//!
//! Four tables mirror the normalized records:
//!
//! ```text
//! boards   (id, name, position)
//! columns  (id, name, board_id, position)            idx: (board_id, position)
//! tasks    (id, ..., column_id, parent_id, position) idx: (column_id, position)
//!                                                      idx: (parent_id, position)
//! settings (id = 0, selected_board_id, is_calendar_view)
//! ```
//!
//! `position` holds the record's `order` (a reserved word in SQL); NULL means
//! unordered. Timestamps go through rusqlite's chrono support. Every commit is
//! one transaction, so a cascade either lands completely or not at all.

use super::backend::{ChangeSet, StorageBackend};
use crate::error::{BoardzError, Result};
use crate::model::{Board, Column, Dataset, Settings, Task, TaskGroup};
use crate::ordering::UNORDERED;
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Database file name inside a data directory.
pub const DATABASE_FILE: &str = "boardz.db";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS boards (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        position INTEGER
    );
    CREATE TABLE IF NOT EXISTS columns (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        board_id TEXT NOT NULL,
        position INTEGER
    );
    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        done INTEGER NOT NULL DEFAULT 0,
        done_date TEXT,
        deadline TEXT,
        repeating INTEGER NOT NULL DEFAULT 0,
        reset_time TEXT,
        column_id TEXT,
        parent_id TEXT,
        is_info INTEGER NOT NULL DEFAULT 0,
        collapsed INTEGER NOT NULL DEFAULT 0,
        color TEXT,
        done_color TEXT,
        position INTEGER
    );
    CREATE TABLE IF NOT EXISTS settings (
        id INTEGER PRIMARY KEY CHECK (id = 0),
        selected_board_id TEXT,
        is_calendar_view INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_boards_position ON boards(position);
    CREATE INDEX IF NOT EXISTS idx_columns_board ON columns(board_id, position);
    CREATE INDEX IF NOT EXISTS idx_tasks_column ON tasks(column_id, position);
    CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_id, position);
";

const TASK_COLUMNS: &str = "id, title, description, done, done_date, deadline, repeating, \
     reset_time, column_id, parent_id, is_info, collapsed, color, done_color, position";

pub struct IndexedBackend {
    /// `None` keeps the database in memory.
    path: Option<PathBuf>,
    conn: Mutex<Option<Connection>>,
}

impl IndexedBackend {
    /// A database file at `path`. Nothing is opened until first use.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            conn: Mutex::new(None),
        }
    }

    /// A private in-memory database, for tests.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            conn: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn connect(&self) -> Result<Connection> {
        let conn = match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                Connection::open(path)?
            }
            None => Connection::open_in_memory()?,
        };
        conn.execute_batch(SCHEMA)?;
        debug!(path = ?self.path, "opened indexed store");
        Ok(conn)
    }

    /// Runs `f` against the connection, opening it on first use.
    async fn with_conn<R>(&self, f: impl FnOnce(&mut Connection) -> Result<R>) -> Result<R> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        match guard.as_mut() {
            Some(conn) => f(conn),
            None => Err(BoardzError::Store("indexed store is not open".to_string())),
        }
    }
}

fn order_from_sql(value: Option<i64>) -> u32 {
    value
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(UNORDERED)
}

fn order_to_sql(order: u32) -> Option<i64> {
    (order != UNORDERED).then_some(i64::from(order))
}

fn row_to_board(row: &Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get("id")?,
        name: row.get("name")?,
        order: order_from_sql(row.get("position")?),
    })
}

fn row_to_column(row: &Row<'_>) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get("id")?,
        name: row.get("name")?,
        board_id: row.get("board_id")?,
        order: order_from_sql(row.get("position")?),
    })
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        done: row.get("done")?,
        done_date: row.get("done_date")?,
        deadline: row.get("deadline")?,
        repeating: row.get("repeating")?,
        reset_time: row.get("reset_time")?,
        column_id: row.get("column_id")?,
        parent_id: row.get("parent_id")?,
        is_info: row.get("is_info")?,
        collapsed: row.get("collapsed")?,
        color: row.get("color")?,
        done_color: row.get("done_color")?,
        order: order_from_sql(row.get("position")?),
    })
}

fn select_boards(conn: &Connection) -> Result<Vec<Board>> {
    let mut stmt = conn.prepare("SELECT id, name, position FROM boards ORDER BY rowid")?;
    let boards = stmt
        .query_map([], row_to_board)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(boards)
}

fn select_columns(conn: &Connection, board_id: Option<&str>) -> Result<Vec<Column>> {
    let (filter, args): (&str, Vec<&str>) = match board_id {
        Some(board_id) => ("WHERE board_id = ?1", vec![board_id]),
        None => ("", Vec::new()),
    };
    let sql = format!(
        "SELECT id, name, board_id, position FROM columns {} ORDER BY rowid",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let columns = stmt
        .query_map(params_from_iter(args.iter()), row_to_column)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

fn select_tasks(conn: &Connection, filter: &str, args: &[&str]) -> Result<Vec<Task>> {
    let sql = format!("SELECT {} FROM tasks {} ORDER BY rowid", TASK_COLUMNS, filter);
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params_from_iter(args.iter()), row_to_task)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

fn select_settings(conn: &Connection) -> Result<Settings> {
    let settings = conn
        .query_row(
            "SELECT selected_board_id, is_calendar_view FROM settings WHERE id = 0",
            [],
            |row| {
                Ok(Settings {
                    selected_board_id: row.get(0)?,
                    is_calendar_view: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(settings.unwrap_or_default())
}

fn upsert_board(tx: &Transaction<'_>, board: &Board) -> Result<()> {
    tx.execute(
        "INSERT INTO boards (id, name, position) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, position = excluded.position",
        params![board.id, board.name, order_to_sql(board.order)],
    )?;
    Ok(())
}

fn upsert_column(tx: &Transaction<'_>, column: &Column) -> Result<()> {
    tx.execute(
        "INSERT INTO columns (id, name, board_id, position) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, board_id = excluded.board_id,
             position = excluded.position",
        params![
            column.id,
            column.name,
            column.board_id,
            order_to_sql(column.order)
        ],
    )?;
    Ok(())
}

fn upsert_task(tx: &Transaction<'_>, task: &Task) -> Result<()> {
    tx.execute(
        "INSERT INTO tasks (id, title, description, done, done_date, deadline, repeating,
             reset_time, column_id, parent_id, is_info, collapsed, color, done_color, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
         ON CONFLICT(id) DO UPDATE SET
             title = excluded.title,
             description = excluded.description,
             done = excluded.done,
             done_date = excluded.done_date,
             deadline = excluded.deadline,
             repeating = excluded.repeating,
             reset_time = excluded.reset_time,
             column_id = excluded.column_id,
             parent_id = excluded.parent_id,
             is_info = excluded.is_info,
             collapsed = excluded.collapsed,
             color = excluded.color,
             done_color = excluded.done_color,
             position = excluded.position",
        params![
            task.id,
            task.title,
            task.description,
            task.done,
            task.done_date,
            task.deadline,
            task.repeating,
            task.reset_time,
            task.column_id,
            task.parent_id,
            task.is_info,
            task.collapsed,
            task.color,
            task.done_color,
            order_to_sql(task.order),
        ],
    )?;
    Ok(())
}

fn write_settings(tx: &Transaction<'_>, settings: &Settings) -> Result<()> {
    tx.execute(
        "INSERT INTO settings (id, selected_board_id, is_calendar_view) VALUES (0, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET selected_board_id = excluded.selected_board_id,
             is_calendar_view = excluded.is_calendar_view",
        params![settings.selected_board_id, settings.is_calendar_view],
    )?;
    Ok(())
}

fn apply_changes(tx: &Transaction<'_>, changes: &ChangeSet) -> Result<()> {
    for id in &changes.removed_boards {
        tx.execute("DELETE FROM boards WHERE id = ?1", params![id])?;
    }
    for id in &changes.removed_columns {
        tx.execute("DELETE FROM columns WHERE id = ?1", params![id])?;
    }
    for id in &changes.removed_tasks {
        tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
    }
    for board in &changes.boards {
        upsert_board(tx, board)?;
    }
    for column in &changes.columns {
        upsert_column(tx, column)?;
    }
    for task in &changes.tasks {
        upsert_task(tx, task)?;
    }
    if let Some(settings) = &changes.settings {
        write_settings(tx, settings)?;
    }
    Ok(())
}

#[async_trait]
impl StorageBackend for IndexedBackend {
    async fn initialize(&self) -> Result<()> {
        self.with_conn(|_| Ok(())).await
    }

    async fn load_boards(&self) -> Result<Vec<Board>> {
        self.with_conn(|conn| select_boards(conn)).await
    }

    async fn load_board(&self, id: &str) -> Result<Option<Board>> {
        self.with_conn(|conn| {
            let board = conn
                .query_row(
                    "SELECT id, name, position FROM boards WHERE id = ?1",
                    params![id],
                    row_to_board,
                )
                .optional()?;
            Ok(board)
        })
        .await
    }

    async fn load_columns(&self, board_id: &str) -> Result<Vec<Column>> {
        self.with_conn(|conn| select_columns(conn, Some(board_id)))
            .await
    }

    async fn load_column(&self, id: &str) -> Result<Option<Column>> {
        self.with_conn(|conn| {
            let column = conn
                .query_row(
                    "SELECT id, name, board_id, position FROM columns WHERE id = ?1",
                    params![id],
                    row_to_column,
                )
                .optional()?;
            Ok(column)
        })
        .await
    }

    async fn load_tasks(&self, group: &TaskGroup) -> Result<Vec<Task>> {
        self.with_conn(|conn| match group {
            TaskGroup::Column(id) => select_tasks(
                conn,
                "WHERE column_id = ?1 AND parent_id IS NULL",
                &[id.as_str()],
            ),
            TaskGroup::Parent(id) => select_tasks(conn, "WHERE parent_id = ?1", &[id.as_str()]),
        })
        .await
    }

    async fn load_task(&self, id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            let mut tasks = select_tasks(conn, "WHERE id = ?1", &[id])?;
            Ok(tasks.pop())
        })
        .await
    }

    async fn load_descendants(&self, root_ids: &[String]) -> Result<Vec<Task>> {
        if root_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let placeholders = vec!["?"; root_ids.len()].join(", ");
            // UNION (not UNION ALL) stops on parent cycles in corrupt data.
            let filter = format!(
                "WHERE id IN (
                     WITH RECURSIVE below(id) AS (
                         SELECT id FROM tasks WHERE parent_id IN ({})
                         UNION
                         SELECT t.id FROM tasks t JOIN below b ON t.parent_id = b.id
                     )
                     SELECT id FROM below
                 )",
                placeholders
            );
            let args: Vec<&str> = root_ids.iter().map(String::as_str).collect();
            let mut tasks = select_tasks(conn, &filter, &args)?;
            tasks.retain(|t| !root_ids.contains(&t.id));
            Ok(tasks)
        })
        .await
    }

    async fn load_settings(&self) -> Result<Settings> {
        self.with_conn(|conn| select_settings(conn)).await
    }

    async fn load_all(&self) -> Result<Dataset> {
        self.with_conn(|conn| {
            Ok(Dataset {
                settings: select_settings(conn)?,
                boards: select_boards(conn)?,
                columns: select_columns(conn, None)?,
                tasks: select_tasks(conn, "", &[])?,
            })
        })
        .await
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Err(e) = apply_changes(&tx, &changes) {
                warn!(error = %e, "rolling back indexed store commit");
                return Err(e);
            }
            tx.commit()?;
            debug!(writes = changes.len(), "committed to indexed store");
            Ok(())
        })
        .await
    }

    async fn replace_all(&self, data: Dataset) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch(
                "DELETE FROM tasks; DELETE FROM columns; DELETE FROM boards; DELETE FROM settings;",
            )?;
            let mut changes = ChangeSet::new();
            changes.put_boards(data.boards);
            changes.put_columns(data.columns);
            changes.put_tasks(data.tasks);
            changes.set_settings(data.settings);
            apply_changes(&tx, &changes)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
