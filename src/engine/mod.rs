//! External content-search engines.
//!
//! This module wraps grep-family tools (ripgrep, ugrep) behind a common
//! adapter so the worker can hand the `contents:` part of a query to a fast
//! native binary and only post-filter the returned paths.

mod ripgrep;
mod ugrep;

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

pub use ripgrep::RipgrepAdapter;
pub use ugrep::UgrepAdapter;

/// Per-file size cap handed to engines, matching the builtin matcher.
pub const ENGINE_MAX_FILESIZE: &str = "10M";

/// Progress callback cadence, in discovered paths.
const PROGRESS_EVERY: usize = 10;

/// 内容検索を行うバックエンドの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Builtin,
    Ripgrep,
    Ugrep,
}

impl EngineKind {
    pub fn all() -> [EngineKind; 3] {
        [EngineKind::Builtin, EngineKind::Ripgrep, EngineKind::Ugrep]
    }

    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Builtin => "builtin",
            EngineKind::Ripgrep => "ripgrep",
            EngineKind::Ugrep => "ugrep",
        }
    }

    /// ユーザー指定のエンジン名を解析
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "builtin" | "native" | "" => Some(EngineKind::Builtin),
            "rg" | "ripgrep" => Some(EngineKind::Ripgrep),
            "ug" | "ugrep" => Some(EngineKind::Ugrep),
            _ => None,
        }
    }

    pub fn is_external(self) -> bool {
        self != EngineKind::Builtin
    }

    fn adapter(self) -> Option<&'static dyn EngineAdapter> {
        match self {
            EngineKind::Builtin => None,
            EngineKind::Ripgrep => Some(&RipgrepAdapter),
            EngineKind::Ugrep => Some(&UgrepAdapter),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 検出されたエンジン情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub engine: EngineKind,
    pub name: String,
    /// Resolved binary; empty for the builtin engine or when not found.
    pub command: String,
    pub available: bool,
    pub version: String,
}

/// 外部エンジンのコマンドライン構築
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Binary names looked up on `PATH`, in preference order.
    fn candidates(&self) -> &'static [&'static str];

    /// Build an invocation that prints matching file paths, one per line.
    fn build_command(&self, program: &str, pattern: &str, base: &Path, max_depth: usize) -> Command;

    /// First line of `<program> --version`, or `None` if it cannot be run.
    async fn version(&self, program: &str) -> Option<String> {
        let output = Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| log::debug!("{} --version failed: {}", program, e))
            .ok()?;

        if !output.status.success() {
            log::debug!("{} --version exited with {}", program, output.status);
            return None;
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string())
    }
}

/// Resolve the binary to run for `kind`.
///
/// An explicit `override_cmd` wins when it resolves; otherwise the adapter's
/// default names are looked up on `PATH`. Always `None` for the builtin engine.
pub fn resolve_command(kind: EngineKind, override_cmd: Option<&str>) -> Option<String> {
    let adapter = kind.adapter()?;

    if let Some(cmd) = override_cmd.map(str::trim).filter(|cmd| !cmd.is_empty()) {
        return match which::which(cmd) {
            Ok(path) => Some(path.to_string_lossy().into_owned()),
            Err(e) => {
                log::warn!("configured {} command {:?} not found: {}", kind, cmd, e);
                None
            }
        };
    }

    adapter
        .candidates()
        .iter()
        .find_map(|candidate| which::which(candidate).ok())
        .map(|path| path.to_string_lossy().into_owned())
}

/// Look up every known engine on `PATH`. The builtin engine is always available.
pub async fn detect_engines() -> Vec<EngineInfo> {
    let mut engines = Vec::with_capacity(3);

    for kind in EngineKind::all() {
        let info = match kind.adapter() {
            None => EngineInfo {
                engine: kind,
                name: kind.name().to_string(),
                command: String::new(),
                available: true,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            Some(adapter) => match resolve_command(kind, None) {
                Some(command) => {
                    let version = adapter.version(&command).await.unwrap_or_default();
                    EngineInfo {
                        engine: kind,
                        name: kind.name().to_string(),
                        command,
                        available: true,
                        version,
                    }
                }
                None => EngineInfo {
                    engine: kind,
                    name: kind.name().to_string(),
                    command: String::new(),
                    available: false,
                    version: String::new(),
                },
            },
        };

        log::debug!(
            "engine {}: available={} command={:?} version={:?}",
            info.name,
            info.available,
            info.command,
            info.version
        );
        engines.push(info);
    }

    engines
}

/// Run an external engine and collect the files whose content matches `pattern`.
///
/// Output is consumed line by line while the process runs; `progress` is
/// called every few discovered paths and once more with the final count.
/// Exit code 1 means "no matches" and is not an error. On cancellation the
/// child is killed and the paths read so far come back in
/// `EngineError::Cancelled`.
pub async fn search_with_engine<F>(
    token: &CancellationToken,
    kind: EngineKind,
    program: &str,
    pattern: &str,
    base: &Path,
    max_depth: usize,
    mut progress: F,
) -> Result<Vec<PathBuf>, EngineError>
where
    F: FnMut(usize) + Send,
{
    let adapter = kind.adapter().ok_or(EngineError::NoCommand(kind.name()))?;

    let mut cmd = adapter.build_command(program, pattern, base, max_depth);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    log::debug!("Executing {}: {:?}", kind, cmd);

    let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
        command: program.to_string(),
        source,
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| EngineError::StdoutNotAvailable(program.to_string()))?;

    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut content = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut content).await;
            content
        })
    });

    let mut lines = BufReader::new(stdout).lines();
    let mut paths: Vec<PathBuf> = Vec::new();

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                log::info!("{} search cancelled after {} results", kind, paths.len());
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill {} process: {}", kind, e);
                }
                return Err(EngineError::Cancelled { partial: paths });
            }

            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim_end();
                        if line.is_empty() {
                            continue;
                        }
                        paths.push(normalize_path(line));
                        if paths.len() % PROGRESS_EVERY == 0 {
                            progress(paths.len());
                        }
                    }
                    Ok(None) => break,
                    Err(source) => {
                        let _ = child.kill().await;
                        return Err(EngineError::Read {
                            command: program.to_string(),
                            source,
                        });
                    }
                }
            }
        }
    }

    // stdout can close while the process keeps running
    let (status, stderr) = tokio::select! {
        biased;

        _ = token.cancelled() => {
            log::info!("{} search cancelled after {} results", kind, paths.len());
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill {} process: {}", kind, e);
            }
            return Err(EngineError::Cancelled { partial: paths });
        }

        finished = async {
            let status = child.wait().await;
            let stderr = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };
            (status, stderr)
        } => finished,
    };

    let status = status.map_err(|source| EngineError::Read {
        command: program.to_string(),
        source,
    })?;

    progress(paths.len());

    match status.code() {
        Some(0) => Ok(paths),
        // grep convention: 1 means the search ran and found nothing.
        Some(1) => Ok(paths),
        Some(code) => {
            log::warn!("{} exited with {}: {}", kind, code, stderr.trim());
            Err(EngineError::ExitStatus {
                command: program.to_string(),
                code,
                stderr: stderr.trim().to_string(),
            })
        }
        None => Err(EngineError::Killed {
            command: program.to_string(),
        }),
    }
}

fn normalize_path(line: &str) -> PathBuf {
    let path = PathBuf::from(line);
    if path.is_absolute() {
        return path;
    }
    std::path::absolute(&path).unwrap_or(path)
}
