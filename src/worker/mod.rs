//! Background directory/search worker.
//!
//! One long-lived task consumes `Request`s in submission order. `FetchDir`
//! and `CancelSearch` are handled inline; each `SearchDir` runs in its own
//! task behind a `SearchSlot`, so at most one search is in flight and any
//! later request cancels it. Responses carry the request's generation
//! untouched; dropping stale ones is the caller's job (see
//! [`crate::generation::GenerationTracker`]).

mod channels;
mod fetch;
mod search;
mod slot;
mod walk;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;
use crate::error::SearchError;
use crate::types::{Op, Progress, Request, Response};

pub use channels::{
    progress_channel, response_channel, ProgressReporter, ProgressSink, ResponseSink,
    INDETERMINATE_EVERY, PROGRESS_STEP_PERCENT,
};
pub use fetch::fetch_dir;
pub use search::{run_search, SearchJob};
pub use slot::SearchSlot;
pub use walk::{count_total_bytes, walk, WalkOutcome};

/// 実行中ワーカーの呼び出し側ハンドル
#[derive(Debug)]
pub struct WorkerHandle {
    pub requests: mpsc::UnboundedSender<Request>,
    pub responses: mpsc::UnboundedReceiver<Response>,
    /// 進捗イベント（取りこぼしあり）
    pub progress: mpsc::Receiver<Progress>,
    pub join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Submit a request. Returns `false` once the worker has stopped.
    pub fn submit(&self, request: Request) -> bool {
        self.requests.send(request).is_ok()
    }
}

pub struct Worker {
    config: Arc<WorkerConfig>,
    slot: SearchSlot,
    responses: ResponseSink,
    progress: ProgressSink,
}

impl Worker {
    /// Start the worker loop on the current Tokio runtime.
    ///
    /// The loop ends, cancelling any running search, once every clone of
    /// `WorkerHandle::requests` is dropped.
    pub fn spawn(config: WorkerConfig) -> WorkerHandle {
        let (requests, request_rx) = mpsc::unbounded_channel();
        let (responses, response_rx) = response_channel();
        let (progress, progress_rx) = progress_channel(config.progress_capacity);

        let worker = Worker {
            config: Arc::new(config),
            slot: SearchSlot::new(),
            responses,
            progress,
        };
        let join = tokio::spawn(worker.run(request_rx));

        WorkerHandle {
            requests,
            responses: response_rx,
            progress: progress_rx,
            join,
        }
    }

    async fn run(self, mut requests: mpsc::UnboundedReceiver<Request>) {
        log::debug!("worker started");
        while let Some(request) = requests.recv().await {
            self.handle(request).await;
        }
        self.slot.cancel().await;
        log::debug!("worker stopped");
    }

    async fn handle(&self, request: Request) {
        log::debug!(
            "request {:?} generation {} path {}",
            request.op,
            request.generation,
            request.path.display()
        );

        match request.op {
            Op::FetchDir => {
                self.slot.cancel().await;
                let path = request.path.clone();
                let response = match tokio::task::spawn_blocking(move || fetch_dir(&path)).await {
                    Ok(Ok(entries)) => Response::ok(&request, entries),
                    Ok(Err(e)) => {
                        log::warn!("fetch failed: {}", e);
                        Response::failed(&request, e)
                    }
                    Err(e) => Response::failed(&request, SearchError::Task(e.to_string())),
                };
                self.responses.send(response);
            }
            Op::CancelSearch => {
                if let Some(generation) = self.slot.cancel().await {
                    log::debug!("cancel request stopped generation {}", generation);
                }
            }
            Op::SearchDir => {
                let token = self.slot.replace(request.generation, &request.query).await;
                let job = SearchJob {
                    request,
                    config: Arc::clone(&self.config),
                    token,
                    progress: self.progress.clone(),
                };
                let slot = self.slot.clone();
                let responses = self.responses.clone();
                tokio::spawn(async move {
                    let generation = job.request.generation;
                    let response = run_search(job).await;
                    slot.finish(generation).await;
                    responses.send(response);
                });
            }
        }
    }
}
