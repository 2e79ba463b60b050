//! Error types for directory listing and search

use std::path::PathBuf;

/// Errors surfaced to callers through `Response::error`.
///
/// Cancellation is deliberately absent: a cancelled search is reported with
/// `Response::cancelled` and no error.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("cannot read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("search engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("search task failed: {0}")]
    Task(String),
}

/// Errors from invoking an external content-search engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no command available for engine {0}")]
    NoCommand(&'static str),

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stdout pipe not available for {0}")]
    StdoutNotAvailable(String),

    #[error("failed to read output of {command}: {source}")]
    Read {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with status {code}: {stderr}")]
    ExitStatus {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("{command} was terminated by a signal")]
    Killed { command: String },

    /// The search was cancelled; `partial` holds the paths read so far.
    #[error("engine search cancelled after {} results", partial.len())]
    Cancelled { partial: Vec<PathBuf> },
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled { .. })
    }
}

/// Errors loading a `WorkerConfig` file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
