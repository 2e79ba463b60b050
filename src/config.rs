//! Worker configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::EngineKind;
use crate::error::ConfigError;
use crate::query::MAX_CONTENT_SIZE;

/// Paths the builtin walk never enters.
pub const SYSTEM_SKIP_PATHS: &[&str] = &[
    "/dev",
    "/proc",
    "/sys",
    "/run",
    "/snap",
    "/boot",
    "/lost+found",
];

/// Tunables for the directory/search worker.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// 進捗チャネルの容量
    pub progress_capacity: usize,
    /// Engine used when a request leaves the engine as builtin.
    pub default_engine: EngineKind,
    /// Binary for `default_engine`; looked up on `PATH` when unset.
    pub default_engine_cmd: Option<String>,
    /// Directories skipped by the builtin walk, together with everything below them.
    pub skip_paths: Vec<PathBuf>,
    /// Files above this size are never content-matched.
    pub max_content_size: u64,
    /// `recursive:` の深さが解釈できない場合の深さ
    pub fallback_depth: usize,
    /// Read file contents through a memory map instead of a plain read.
    pub use_mmap: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            progress_capacity: 64,
            default_engine: EngineKind::Builtin,
            default_engine_cmd: None,
            skip_paths: SYSTEM_SKIP_PATHS.iter().map(PathBuf::from).collect(),
            max_content_size: MAX_CONTENT_SIZE,
            fallback_depth: 10,
            use_mmap: false,
        }
    }
}

impl WorkerConfig {
    /// JSON設定ファイルを読み込む
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// True if `path` is, or lies under, one of the skipped directories.
    ///
    /// Relative paths are resolved against the current directory first.
    pub fn is_skipped(&self, path: &Path) -> bool {
        let absolute;
        let path = if path.is_relative() {
            absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
            absolute.as_path()
        } else {
            path
        };
        self.skip_paths.iter().any(|skip| path.starts_with(skip))
    }
}
