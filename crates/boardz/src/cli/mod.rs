//! # CLI Behavior
//!
//! This is **one possible UI client** for boardz, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes and
//! output formatting.
//!
//! ## Naked Execution
//!
//! Running `boardz` with no arguments lists the boards.
//!
//! ## Referring to Things
//!
//! Records are addressed by position, 1-based, in the order the board shows
//! them: `2` is the second board, `2.1` its first column, `2.1.3` the third task
//! of that column and `2.1.3.1` that task's first subtask. Anything that is not
//! a dotted number is taken as a raw id. See `refs`.
//!
//! ## Storage Selection
//!
//! The backend comes from configuration (`BOARDZ_*` variables, `boardz.toml`),
//! with `--backend`, `--api-url`, `--api-token` and `--data-dir` on top. Data is
//! never copied between backends implicitly: use `export` and `import`.
//!
//! ## Module Structure
//!
//! - `commands`: provider wiring and per-command handlers
//! - `refs`: positional references
//! - `render`: output formatting
//! - `setup`: argument parsing via clap
//! - `styles`: terminal styling

mod commands;
mod refs;
mod render;
pub mod setup;
mod styles;

pub use commands::run;
