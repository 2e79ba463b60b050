//! Outbound channels of the worker.
//!
//! Responses and progress travel on differently provisioned channels:
//! responses are unbounded and never dropped, progress is bounded and a
//! full queue drops the newest update instead of stalling the search.

use tokio::sync::mpsc;

use crate::types::{Progress, Response};

/// Report at most once per this many percentage points.
pub const PROGRESS_STEP_PERCENT: u64 = 5;

/// Indeterminate progress is reported every this many files.
pub const INDETERMINATE_EVERY: u64 = 100;

/// レスポンス送信側（取りこぼしなし）
#[derive(Debug, Clone)]
pub struct ResponseSink {
    tx: mpsc::UnboundedSender<Response>,
}

impl ResponseSink {
    /// Deliver a response. Returns `false` once the receiver is gone.
    pub fn send(&self, response: Response) -> bool {
        let generation = response.generation;
        match self.tx.send(response) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("response receiver dropped, discarding generation {}", generation);
                false
            }
        }
    }
}

pub fn response_channel() -> (ResponseSink, mpsc::UnboundedReceiver<Response>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ResponseSink { tx }, rx)
}

/// 進捗送信側（満杯時は破棄）
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<Progress>,
}

impl ProgressSink {
    /// Queue `progress` unless the channel is full or closed.
    pub fn report(&self, progress: Progress) {
        match self.tx.try_send(progress) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                log::trace!(
                    "progress channel full, dropping update {}/{} for generation {}",
                    dropped.current,
                    dropped.total,
                    dropped.generation
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

pub fn progress_channel(capacity: usize) -> (ProgressSink, mpsc::Receiver<Progress>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ProgressSink { tx }, rx)
}

/// Throttled progress for one builtin walk.
///
/// With a known byte total, reports whenever completion advances by
/// `PROGRESS_STEP_PERCENT` and once more on reaching 100%. With
/// `total == 0`, reports a file count every `INDETERMINATE_EVERY` files.
#[derive(Debug)]
pub struct ProgressReporter {
    sink: ProgressSink,
    generation: u64,
    total: u64,
    current: u64,
    files: u64,
    last_percent: Option<u64>,
}

impl ProgressReporter {
    pub fn new(sink: ProgressSink, generation: u64, total: u64) -> Self {
        Self {
            sink,
            generation,
            total,
            current: 0,
            files: 0,
            last_percent: None,
        }
    }

    /// Record one processed file weighing `bytes`.
    pub fn file_done(&mut self, bytes: u64) {
        self.files += 1;
        self.current = self.current.saturating_add(bytes);

        if self.total == 0 {
            if self.files % INDETERMINATE_EVERY == 0 {
                self.sink.report(Progress {
                    generation: self.generation,
                    current: self.files,
                    total: 0,
                    label: format!("Searched {} files", self.files),
                });
            }
            return;
        }

        let current = self.current.min(self.total);
        let percent = current * 100 / self.total;
        let due = match self.last_percent {
            None => true,
            Some(last) => {
                percent >= last + PROGRESS_STEP_PERCENT || (percent == 100 && last < 100)
            }
        };
        if due {
            self.last_percent = Some(percent);
            self.sink.report(Progress {
                generation: self.generation,
                current,
                total: self.total,
                label: format!("Searching contents {}%", percent),
            });
        }
    }
}
