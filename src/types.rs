use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::engine::EngineKind;
use crate::error::SearchError;

/// Snapshot of one filesystem node taken at listing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// ファイル名（パスの最後の要素）
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    /// バイト数（ディレクトリは0）
    pub size: u64,
    pub modified: SystemTime,
}

impl Entry {
    /// Build an entry from a path and metadata already fetched for it.
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            name,
            path: path.to_path_buf(),
            is_dir: metadata.is_dir(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }

    /// Stat `path`, following symlinks when the target exists.
    ///
    /// Returns `None` when neither the target nor the link itself can be read.
    pub fn stat(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path)
            .or_else(|_| std::fs::symlink_metadata(path))
            .ok()?;
        Some(Self::from_metadata(path, &metadata))
    }

    /// Lower-cased extension including the leading dot, or empty.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    FetchDir,
    SearchDir,
    CancelSearch,
}

/// A unit of work submitted to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub op: Op,
    /// 対象ディレクトリ
    pub path: PathBuf,
    /// 生のクエリ文字列
    pub query: String,
    /// 呼び出し側が発行した世代
    pub generation: u64,
    pub engine: EngineKind,
    pub engine_cmd: Option<String>,
}

impl Request {
    pub fn fetch(path: impl Into<PathBuf>, generation: u64) -> Self {
        Self {
            op: Op::FetchDir,
            path: path.into(),
            query: String::new(),
            generation,
            engine: EngineKind::Builtin,
            engine_cmd: None,
        }
    }

    pub fn search(path: impl Into<PathBuf>, query: impl Into<String>, generation: u64) -> Self {
        Self {
            op: Op::SearchDir,
            path: path.into(),
            query: query.into(),
            generation,
            engine: EngineKind::Builtin,
            engine_cmd: None,
        }
    }

    pub fn cancel(generation: u64) -> Self {
        Self {
            op: Op::CancelSearch,
            path: PathBuf::new(),
            query: String::new(),
            generation,
            engine: EngineKind::Builtin,
            engine_cmd: None,
        }
    }

    /// Select a content-search engine for this request.
    ///
    /// `cmd` overrides the binary located on `PATH`.
    pub fn with_engine(mut self, engine: EngineKind, cmd: Option<String>) -> Self {
        self.engine = engine;
        self.engine_cmd = cmd;
        self
    }
}

/// The answer to one `FetchDir` or `SearchDir` request.
#[derive(Debug)]
pub struct Response {
    pub op: Op,
    pub path: PathBuf,
    pub entries: Vec<Entry>,
    pub error: Option<SearchError>,
    pub generation: u64,
    pub cancelled: bool,
}

impl Response {
    pub fn ok(request: &Request, entries: Vec<Entry>) -> Self {
        Self {
            op: request.op,
            path: request.path.clone(),
            entries,
            error: None,
            generation: request.generation,
            cancelled: false,
        }
    }

    pub fn failed(request: &Request, error: SearchError) -> Self {
        Self {
            op: request.op,
            path: request.path.clone(),
            entries: Vec::new(),
            error: Some(error),
            generation: request.generation,
            cancelled: false,
        }
    }

    pub fn cancelled(request: &Request) -> Self {
        Self {
            op: request.op,
            path: request.path.clone(),
            entries: Vec::new(),
            error: None,
            generation: request.generation,
            cancelled: true,
        }
    }
}

/// 実行中の検索の進捗
///
/// `total == 0` means the total is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub generation: u64,
    pub current: u64,
    pub total: u64,
    pub label: String,
}

impl Progress {
    pub fn is_indeterminate(&self) -> bool {
        self.total == 0
    }

    /// Completion percentage, or `None` when indeterminate.
    pub fn percent(&self) -> Option<u64> {
        (self.total > 0).then(|| (self.current.min(self.total) * 100) / self.total)
    }
}
