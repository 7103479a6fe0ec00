//! # Boardz CLI Architecture
//!
//! The binary is intentionally thin: the CLI lives in `src/cli/`, while this
//! file only invokes `cli::run()` and handles process termination.
//!
//! ## Workspace Structure
//!
//! - `crates/boardzapp/`: the board data layer (entities, ordering, storage
//!   backends, provider registry)
//! - `crates/boardz/`: this CLI, one possible client of that layer
//!
//! ## Layering
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/boardz/src/cli/)                      │
//! │  - clap argument parsing (setup.rs)                      │
//! │  - user refs like `1.2.3` → ids (refs.rs)                │
//! │  - dispatch + provider wiring (commands.rs)              │
//! │  - terminal rendering (render.rs, styles.rs)             │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  boardzapp::registry → DataProvider                      │
//! │  - one active provider built from configuration          │
//! │  - async operations returning owned records              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing below the CLI layer writes to stdout or exits the process.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
