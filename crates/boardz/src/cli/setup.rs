use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "boardz",
    bin_name = "boardz",
    version,
    disable_help_subcommand = true,
    after_help = "Refer to records by position: 2 (board), 2.1 (column), 2.1.3 (task), 2.1.3.1 (subtask)."
)]
#[command(about = "Kanban boards for the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub storage: StorageArgs,
}

/// Overrides applied on top of the loaded configuration.
#[derive(Args, Debug, Default, Clone)]
pub struct StorageArgs {
    /// Storage backend: local, indexed or server
    #[arg(long, global = true, help_heading = "Storage")]
    pub backend: Option<String>,

    /// Board server base URL
    #[arg(long, global = true, help_heading = "Storage")]
    pub api_url: Option<String>,

    /// Board server bearer token
    #[arg(long, global = true, help_heading = "Storage")]
    pub api_token: Option<String>,

    /// Directory for local data files
    #[arg(long, global = true, help_heading = "Storage")]
    pub data_dir: Option<PathBuf>,

    /// Config file to load instead of the default one
    #[arg(long, global = true, help_heading = "Storage")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List boards
    #[command(alias = "ls", display_order = 1)]
    Boards,

    /// Manage boards
    #[command(display_order = 2)]
    Board {
        #[command(subcommand)]
        action: BoardAction,
    },

    /// List the columns of a board (default: the selected board)
    #[command(display_order = 3)]
    Columns { board: Option<String> },

    /// Manage columns
    #[command(display_order = 4)]
    Column {
        #[command(subcommand)]
        action: ColumnAction,
    },

    /// Show the tasks of a column, with their subtasks
    #[command(display_order = 5)]
    Tasks { column: String },

    /// Manage tasks
    #[command(display_order = 6)]
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Show or change settings
    #[command(display_order = 20)]
    Settings {
        /// Select a board
        #[arg(long, conflicts_with = "unselect")]
        select: Option<String>,

        /// Clear the board selection
        #[arg(long)]
        unselect: bool,

        /// Turn calendar view on or off
        #[arg(long)]
        calendar: Option<bool>,
    },

    /// Write every board to a JSON document
    #[command(display_order = 30)]
    Export { path: PathBuf },

    /// Replace all data with a JSON document
    #[command(display_order = 31)]
    Import { path: PathBuf },

    /// Reopen repeating tasks whose reset time has passed
    #[command(display_order = 32)]
    ResetRepeating,

    /// Tasks with a deadline in [FROM, TO)
    #[command(display_order = 33)]
    Due {
        /// Start date (YYYY-MM-DD or RFC 3339)
        from: String,
        /// End date, exclusive (YYYY-MM-DD or RFC 3339)
        to: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum BoardAction {
    /// Create a board
    Add {
        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Rename a board
    Rename {
        board: String,
        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Delete a board with everything on it
    Rm { board: String },
    /// Make a board the selected one
    Select { board: String },
    /// Put boards in the given order; unlisted boards follow
    Order {
        #[arg(required = true, num_args = 1..)]
        boards: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ColumnAction {
    /// Append a column to a board
    Add {
        board: String,
        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Rename a column
    Rename {
        column: String,
        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Delete a column with its tasks
    Rm { column: String },
    /// Put a board's columns in the given order
    Order {
        board: String,
        #[arg(required = true, num_args = 1..)]
        columns: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// Create a task in a column, or a subtask with --under
    Add {
        /// Column to add to
        #[arg(long, short = 'c', conflicts_with = "under", required_unless_present = "under")]
        column: Option<String>,

        /// Parent task
        #[arg(long, short = 'u')]
        under: Option<String>,

        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Deadline (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        deadline: Option<String>,

        /// Repeat daily, reopening at HH:MM
        #[arg(long, value_name = "HH:MM")]
        repeat: Option<String>,

        /// Informational entry, not counted in progress
        #[arg(long)]
        info: bool,

        #[arg(required = true, trailing_var_arg = true)]
        title: Vec<String>,
    },
    /// Show a task and its subtasks
    Show { task: String },
    /// Mark a task done
    Done { task: String },
    /// Mark a task not done
    Undo { task: String },
    /// Change task fields
    Edit {
        task: String,

        #[arg(long, short = 't')]
        title: Option<String>,

        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Deadline (YYYY-MM-DD or RFC 3339)
        #[arg(long, conflicts_with = "no_deadline")]
        deadline: Option<String>,

        #[arg(long)]
        no_deadline: bool,

        /// Repeat daily, reopening at HH:MM
        #[arg(long, value_name = "HH:MM", conflicts_with = "no_repeat")]
        repeat: Option<String>,

        #[arg(long)]
        no_repeat: bool,

        #[arg(long)]
        color: Option<String>,

        /// Collapse or expand the subtask list
        #[arg(long)]
        collapsed: Option<bool>,
    },
    /// Move a task to another column, under another task, or within its group
    Mv {
        task: String,

        /// Destination column
        #[arg(long, conflicts_with = "under")]
        to: Option<String>,

        /// Destination parent task
        #[arg(long)]
        under: Option<String>,

        /// 1-based position in the destination (default: last)
        #[arg(long)]
        at: Option<usize>,
    },
    /// Delete a task with its subtasks
    Rm { task: String },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
