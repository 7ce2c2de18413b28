//! Configuration for the `join-board` CLI.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/join-board/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use crate::dragdrop::DropPolicy;
use crate::notify::NotificationDurations;
use crate::permission::Capabilities;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    store: StoreFileConfig,
    board: BoardFileConfig,
    notifications: NotificationsFileConfig,
    sync: SyncFileConfig,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    path: Option<PathBuf>,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    renumber_destination: Option<bool>,
    read_only: Option<bool>,
}

/// `[notifications]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NotificationsFileConfig {
    success_ms: Option<u64>,
    failure_ms: Option<u64>,
}

/// `[sync]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SyncFileConfig {
    channel_capacity: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved board configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// JSON file holding the task collection.
    pub store_path: PathBuf,
    /// Renumber the destination column on cross-column drops.
    pub renumber_destination: bool,
    /// Deny every mutation.
    pub read_only: bool,
    /// Toast durations.
    pub durations: NotificationDurations,
    /// Capacity of the command and notification channels.
    pub channel_capacity: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            renumber_destination: true,
            read_only: false,
            durations: NotificationDurations::default(),
            channel_capacity: 64,
        }
    }
}

impl BoardConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// or if any config file cannot be parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            store_path: cli
                .store
                .clone()
                .or_else(|| file.store.path.clone())
                .unwrap_or(defaults.store_path),
            renumber_destination: cli
                .renumber_destination
                .or(file.board.renumber_destination)
                .unwrap_or(defaults.renumber_destination),
            read_only: cli.read_only || file.board.read_only.unwrap_or(defaults.read_only),
            durations: NotificationDurations {
                success: file
                    .notifications
                    .success_ms
                    .map_or(defaults.durations.success, Duration::from_millis),
                failure: file
                    .notifications
                    .failure_ms
                    .map_or(defaults.durations.failure, Duration::from_millis),
            },
            channel_capacity: file
                .sync
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
        }
    }

    /// Drop policy derived from this configuration.
    #[must_use]
    pub const fn drop_policy(&self) -> DropPolicy {
        DropPolicy {
            renumber_destination: self.renumber_destination,
        }
    }

    /// Initial capabilities derived from this configuration.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        if self.read_only {
            Capabilities::read_only()
        } else {
            Capabilities::default()
        }
    }
}

/// `<data dir>/join-board/tasks.json`, or `tasks.json` in the working
/// directory when no data dir is known.
fn default_store_path() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from("tasks.json"),
        |dir| dir.join("join-board").join("tasks.json"),
    )
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Kanban board for the Join task manager")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/join-board/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the task file.
    #[arg(long, env = "JOIN_BOARD_STORE")]
    pub store: Option<PathBuf>,

    /// Renumber the destination column on cross-column moves.
    #[arg(long)]
    pub renumber_destination: Option<bool>,

    /// Open the board without edit, create or delete rights.
    #[arg(long)]
    pub read_only: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "JOIN_BOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/join-board.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// What to do. Defaults to `show`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Board subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the board.
    Show {
        /// Only show tasks matching this term.
        #[arg(long)]
        search: Option<String>,
        /// Highlight one task.
        #[arg(long)]
        highlight_task: Option<String>,
        /// Highlight every task with this status.
        #[arg(long)]
        highlight_status: Option<String>,
        /// Highlight urgent tasks.
        #[arg(long)]
        highlight_urgent: bool,
    },
    /// Drag a task to a position in a column.
    Move {
        /// Task id.
        id: String,
        /// Target list id (`doneList`, `doneList-list`) or status (`done`).
        to: String,
        /// Position in the target column.
        #[arg(default_value_t = 0)]
        index: usize,
        /// Indices refer to the board filtered by this term.
        #[arg(long)]
        search: Option<String>,
    },
    /// Create a task.
    Add {
        /// Title.
        title: String,
        /// Description.
        #[arg(long, short)]
        description: String,
        /// Category, e.g. "User Story".
        #[arg(long, short = 'k')]
        category: String,
        /// Initial status.
        #[arg(long, default_value = "todo")]
        status: String,
        /// Priority (low, medium, urgent).
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        due: Option<String>,
        /// Assigned contact id. Repeatable.
        #[arg(long = "assign")]
        assigned_to: Vec<String>,
        /// Subtask title. Repeatable.
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: String,
    },
    /// Flip a subtask's done flag.
    Toggle {
        /// Task id.
        id: String,
        /// Subtask position.
        index: usize,
    },
    /// Print board counters.
    Summary,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("join-board").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
