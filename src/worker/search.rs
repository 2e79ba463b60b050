//! One `SearchDir` request, from raw query to response.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::channels::{ProgressReporter, ProgressSink};
use super::fetch::fetch_dir;
use super::walk::{count_total_bytes, walk, WalkOutcome};
use crate::config::WorkerConfig;
use crate::engine::{resolve_command, search_with_engine, EngineKind};
use crate::error::SearchError;
use crate::query::{cancellable, mmap_reader, parse, read_lossy, Matcher, Query};
use crate::types::{Entry, Progress, Request, Response};

/// Everything a search task needs, moved into its own task.
#[derive(Debug)]
pub struct SearchJob {
    pub request: Request,
    pub config: Arc<WorkerConfig>,
    pub token: CancellationToken,
    pub progress: ProgressSink,
}

/// Run one search to completion or cancellation.
pub async fn run_search(job: SearchJob) -> Response {
    let SearchJob {
        request,
        config,
        token,
        progress,
    } = job;

    let query = parse(&request.query);
    if query.is_empty() {
        log::debug!("empty query, listing {}", request.path.display());
        let path = request.path.clone();
        return match tokio::task::spawn_blocking(move || fetch_dir(&path)).await {
            Ok(Ok(entries)) => Response::ok(&request, entries),
            Ok(Err(e)) => Response::failed(&request, e),
            Err(e) => Response::failed(&request, SearchError::Task(e.to_string())),
        };
    }

    if let Err(e) = validate_root(&request.path).await {
        return Response::failed(&request, e);
    }

    let max_depth = query.max_depth(config.fallback_depth);
    log::info!(
        "search generation {} in {} (depth {}): {:?}",
        request.generation,
        request.path.display(),
        max_depth,
        request.query
    );

    let mut engine_error = None;
    if let Some(pattern) = query.contents_pattern() {
        let (kind, cmd) = select_engine(&request, &config);
        if kind.is_external() {
            match resolve_command(kind, cmd.as_deref()) {
                Some(program) => {
                    let result = search_external(
                        &request, &query, &config, &token, &progress, kind, &program, pattern,
                        max_depth,
                    )
                    .await;
                    match result {
                        Ok(response) => return response,
                        Err(e) => {
                            log::warn!("{} failed, falling back to builtin search: {}", kind, e);
                            engine_error = Some(e);
                        }
                    }
                }
                // 未インストールはエラーにせず内蔵検索で応答
                None => log::warn!("{} command not found, using builtin search", kind),
            }
        }
    }

    let outcome = search_builtin(&request, query, Arc::clone(&config), &token, progress, max_depth).await;
    match outcome {
        Ok(WalkOutcome::Completed(entries)) => {
            log::info!(
                "search generation {} finished with {} entries",
                request.generation,
                entries.len()
            );
            let mut response = Response::ok(&request, entries);
            response.error = engine_error;
            response
        }
        Ok(WalkOutcome::Cancelled) => {
            log::info!("search generation {} cancelled", request.generation);
            Response::cancelled(&request)
        }
        Err(e) => Response::failed(&request, e),
    }
}

async fn validate_root(path: &Path) -> Result<(), SearchError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| SearchError::ReadDir {
            path: path.to_path_buf(),
            source,
        })?;
    if !metadata.is_dir() {
        return Err(SearchError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// A non-builtin engine on the request wins; otherwise the configured default.
fn select_engine(request: &Request, config: &WorkerConfig) -> (EngineKind, Option<String>) {
    if request.engine.is_external() {
        (request.engine, request.engine_cmd.clone())
    } else {
        (config.default_engine, config.default_engine_cmd.clone())
    }
}

/// Delegate the content pattern to an external engine and post-filter its paths.
///
/// `Err` means the engine failed and the caller should fall back to the builtin walk.
#[allow(clippy::too_many_arguments)]
async fn search_external(
    request: &Request,
    query: &Query,
    config: &Arc<WorkerConfig>,
    token: &CancellationToken,
    progress: &ProgressSink,
    kind: EngineKind,
    program: &str,
    pattern: &str,
    max_depth: usize,
) -> Result<Response, SearchError> {
    let generation = request.generation;
    let sink = progress.clone();
    let on_progress = move |count: usize| {
        sink.report(Progress {
            generation,
            current: count as u64,
            total: 0,
            label: format!("{}: {} matching files", kind, count),
        });
    };

    let paths = match search_with_engine(
        token,
        kind,
        program,
        pattern,
        &request.path,
        max_depth,
        on_progress,
    )
    .await
    {
        Ok(paths) => paths,
        Err(e) if e.is_cancelled() => {
            log::info!("search generation {} cancelled", generation);
            return Ok(Response::cancelled(request));
        }
        Err(e) => return Err(e.into()),
    };

    log::debug!("{} returned {} paths, post-filtering", kind, paths.len());
    let filter_query = query.without_contents();
    let filter_config = Arc::clone(config);
    let entries = tokio::task::spawn_blocking(move || post_filter(paths, &filter_query, &filter_config))
        .await
        .map_err(|e| SearchError::Task(e.to_string()))?;

    if token.is_cancelled() {
        return Ok(Response::cancelled(request));
    }
    log::info!(
        "search generation {} finished with {} entries via {}",
        generation,
        entries.len(),
        kind
    );
    Ok(Response::ok(request, entries))
}

/// Apply the non-content directives and the walk's own limits to engine output.
fn post_filter(paths: Vec<PathBuf>, query: &Query, config: &WorkerConfig) -> Vec<Entry> {
    let matcher = Matcher::new(query);
    let mut entries: Vec<Entry> = paths
        .into_iter()
        .filter(|path| !config.is_skipped(path))
        .filter_map(|path| Entry::stat(&path))
        .filter(|entry| !entry.is_dir && entry.size <= config.max_content_size)
        .filter(|entry| matcher.matches(entry))
        .collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries.dedup_by(|a, b| a.path == b.path);
    entries
}

async fn search_builtin(
    request: &Request,
    query: Query,
    config: Arc<WorkerConfig>,
    token: &CancellationToken,
    progress: ProgressSink,
    max_depth: usize,
) -> Result<WalkOutcome, SearchError> {
    let root = request.path.clone();
    let generation = request.generation;
    let token = token.clone();

    tokio::task::spawn_blocking(move || {
        let total = if query.has_contents() {
            match count_total_bytes(&root, max_depth, &config, &token) {
                Some(total) => total,
                None => return WalkOutcome::Cancelled,
            }
        } else {
            0
        };

        let reader = if config.use_mmap { mmap_reader() } else { read_lossy() };
        let matcher = Matcher::new(&query)
            .with_reader(cancellable(reader, token.clone()))
            .with_max_content_size(config.max_content_size);
        let mut reporter = ProgressReporter::new(progress, generation, total);

        walk(&root, max_depth, &config, &matcher, &token, &mut reporter)
    })
    .await
    .map_err(|e| SearchError::Task(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Op;
    use crate::worker::channels::progress_channel;
    use std::fs;
    use tempfile::TempDir;

    fn make_job(request: Request, config: WorkerConfig) -> (SearchJob, tokio::sync::mpsc::Receiver<Progress>) {
        let (progress, rx) = progress_channel(64);
        (
            SearchJob {
                request,
                config: Arc::new(config),
                token: CancellationToken::new(),
                progress,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn test_empty_query_lists_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let (job, _rx) = make_job(Request::search(dir.path(), "   ", 1), WorkerConfig::default());
        let response = run_search(job).await;
        assert_eq!(response.op, Op::SearchDir);
        assert!(response.error.is_none());
        let names: Vec<_> = response.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let (job, _rx) = make_job(
            Request::search(dir.path().join("gone"), "ext:rs", 2),
            WorkerConfig::default(),
        );
        let response = run_search(job).await;
        assert!(matches!(response.error, Some(SearchError::ReadDir { .. })));
        assert!(!response.cancelled);
        assert!(response.entries.is_empty());
    }

    #[tokio::test]
    async fn test_file_root_is_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.txt");
        fs::write(&file, "x").unwrap();
        let (job, _rx) = make_job(Request::search(&file, "ext:txt", 1), WorkerConfig::default());
        let response = run_search(job).await;
        assert!(matches!(response.error, Some(SearchError::NotADirectory(_))));
    }

    #[tokio::test]
    async fn test_builtin_content_search_reports_progress() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.go"), "// TODO: a").unwrap();
        fs::write(dir.path().join("b.go"), "package b").unwrap();
        fs::write(dir.path().join("c.txt"), "TODO").unwrap();

        let (job, mut rx) = make_job(
            Request::search(dir.path(), "ext:go contents:todo", 3),
            WorkerConfig::default(),
        );
        let response = run_search(job).await;
        assert!(response.error.is_none());
        let names: Vec<_> = response.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.go"]);

        let mut last = None;
        while let Ok(progress) = rx.try_recv() {
            assert_eq!(progress.generation, 3);
            assert!(progress.total > 0);
            last = Some(progress);
        }
        let last = last.expect("at least one progress event");
        assert_eq!(last.current, last.total);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.go"), "x").unwrap();
        let (job, _rx) = make_job(Request::search(dir.path(), "contents:x", 4), WorkerConfig::default());
        job.token.cancel();
        let response = run_search(job).await;
        assert!(response.cancelled);
        assert!(response.error.is_none());
        assert!(response.entries.is_empty());
    }

    #[tokio::test]
    async fn test_missing_engine_falls_back_silently() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hit.txt"), "needle").unwrap();
        fs::write(dir.path().join("miss.txt"), "hay").unwrap();

        let request = Request::search(dir.path(), "contents:needle", 5).with_engine(
            EngineKind::Ripgrep,
            Some("dirscout-no-such-engine".to_string()),
        );
        let (job, _rx) = make_job(request, WorkerConfig::default());
        let response = run_search(job).await;
        assert!(response.error.is_none());
        assert!(!response.cancelled);
        let names: Vec<_> = response.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["hit.txt"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_engine_falls_back_with_error() {
        use crate::error::EngineError;
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hit.txt"), "needle").unwrap();
        let bin = TempDir::new().unwrap();
        let script = bin.path().join("rg");
        fs::write(&script, "#!/bin/sh\necho 'regex parse error' >&2\nexit 2\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let request = Request::search(dir.path(), "contents:needle", 6)
            .with_engine(EngineKind::Ripgrep, Some(script.to_string_lossy().into_owned()));
        let (job, _rx) = make_job(request, WorkerConfig::default());
        let response = run_search(job).await;
        assert!(matches!(
            response.error,
            Some(SearchError::Engine(EngineError::ExitStatus { code: 2, .. }))
        ));
        let names: Vec<_> = response.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["hit.txt"]);
    }

    #[test]
    fn test_request_engine_overrides_default() {
        let config = WorkerConfig {
            default_engine: EngineKind::Ugrep,
            default_engine_cmd: Some("ug".to_string()),
            ..WorkerConfig::default()
        };
        let request = Request::search("/", "contents:x", 1);
        assert_eq!(
            select_engine(&request, &config),
            (EngineKind::Ugrep, Some("ug".to_string()))
        );
        let request = request.with_engine(EngineKind::Ripgrep, None);
        assert_eq!(select_engine(&request, &config), (EngineKind::Ripgrep, None));
    }

    #[test]
    fn test_post_filter_applies_metadata_directives() {
        let dir = TempDir::new().unwrap();
        let go = dir.path().join("a.go");
        let txt = dir.path().join("b.txt");
        fs::write(&go, "x").unwrap();
        fs::write(&txt, "x").unwrap();
        let mut config = WorkerConfig::default();
        config.skip_paths.clear();

        let entries = post_filter(
            vec![txt.clone(), go.clone(), go.clone(), dir.path().to_path_buf()],
            &parse("ext:go contents:x").without_contents(),
            &config,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, go);
    }
}
