//! Builtin recursive walk.

use std::path::{Path, PathBuf};

use ignore::{Walk, WalkBuilder};
use tokio_util::sync::CancellationToken;

use super::channels::ProgressReporter;
use crate::config::WorkerConfig;
use crate::query::Matcher;
use crate::types::Entry;

/// How a walk ended.
#[derive(Debug)]
pub enum WalkOutcome {
    Completed(Vec<Entry>),
    Cancelled,
}

/// 相対ルート（`.` など）をカレントディレクトリ基準の絶対パスに解決
///
/// Skip paths are absolute and are compared component-wise.
fn absolute_root(root: &Path) -> PathBuf {
    std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf())
}

fn build_walker(root: &Path, max_depth: usize, config: &WorkerConfig) -> Walk {
    let skip_paths = config.skip_paths.clone();
    WalkBuilder::new(root)
        .standard_filters(false) // No ignore files, hidden entries included
        .follow_links(false)
        .max_depth(Some(max_depth))
        .filter_entry(move |entry| !skip_paths.iter().any(|skip| entry.path().starts_with(skip)))
        .build()
}

/// Stat a walked path through any symlink; `None` for anything that is
/// neither a regular file nor a directory, broken links included.
fn regular_entry(path: &Path) -> Option<Entry> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            log::debug!("skipping {}: {}", path.display(), e);
            return None;
        }
    };
    if !metadata.is_file() && !metadata.is_dir() {
        return None;
    }
    Some(Entry::from_metadata(path, &metadata))
}

fn content_weight(entry: &Entry, config: &WorkerConfig) -> u64 {
    if entry.is_dir || entry.size > config.max_content_size {
        0
    } else {
        entry.size
    }
}

/// Bytes of content the walk under `root` would read.
///
/// Returns `None` if cancelled part way.
pub fn count_total_bytes(
    root: &Path,
    max_depth: usize,
    config: &WorkerConfig,
    token: &CancellationToken,
) -> Option<u64> {
    let mut total = 0u64;
    for item in build_walker(&absolute_root(root), max_depth, config) {
        if token.is_cancelled() {
            return None;
        }
        let Ok(walked) = item else { continue };
        if walked.depth() == 0 {
            continue;
        }
        if let Some(entry) = regular_entry(walked.path()) {
            total = total.saturating_add(content_weight(&entry, config));
        }
    }
    Some(total)
}

/// Walk `root` down to `max_depth`, collecting entries accepted by `matcher`.
///
/// Unreadable directories are logged and skipped. The token is checked
/// before every entry.
pub fn walk(
    root: &Path,
    max_depth: usize,
    config: &WorkerConfig,
    matcher: &Matcher,
    token: &CancellationToken,
    reporter: &mut ProgressReporter,
) -> WalkOutcome {
    let mut entries = Vec::new();
    let root = absolute_root(root);

    for item in build_walker(&root, max_depth, config) {
        if token.is_cancelled() {
            log::debug!("walk of {} cancelled", root.display());
            return WalkOutcome::Cancelled;
        }

        let walked = match item {
            Ok(walked) => walked,
            Err(e) => {
                log::warn!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if walked.depth() == 0 || config.is_skipped(walked.path()) {
            continue;
        }

        let Some(entry) = regular_entry(walked.path()) else {
            continue;
        };
        if !entry.is_dir {
            reporter.file_done(content_weight(&entry, config));
        }
        if matcher.matches(&entry) {
            entries.push(entry);
        }
    }

    if token.is_cancelled() {
        return WalkOutcome::Cancelled;
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    WalkOutcome::Completed(entries)
}
