//! Single-slot, latest-wins search supervisor.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// 実行中の検索状態
#[derive(Debug)]
struct SearchState {
    /// 現在の検索クエリ
    query: String,
    /// 検索の世代
    generation: u64,
    /// キャンセレーショントークン
    cancellation_token: CancellationToken,
}

/// Holds at most one active search. Installing a new one cancels the old one.
#[derive(Debug, Clone, Default)]
pub struct SearchSlot {
    /// 現在の検索状態（共有状態）
    current: Arc<Mutex<Option<SearchState>>>,
}

impl SearchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい検索を登録し、実行中の検索をキャンセル
    ///
    /// Returns the token the new search must observe.
    pub async fn replace(&self, generation: u64, query: &str) -> CancellationToken {
        let mut current = self.current.lock().await;
        if let Some(existing) = current.take() {
            log::info!(
                "Cancelling search generation {} ({:?}) for generation {}",
                existing.generation,
                existing.query,
                generation
            );
            existing.cancellation_token.cancel();
        }

        let cancellation_token = CancellationToken::new();
        *current = Some(SearchState {
            query: query.to_string(),
            generation,
            cancellation_token: cancellation_token.clone(),
        });
        cancellation_token
    }

    /// 実行中の検索をキャンセルし、その世代を返す
    pub async fn cancel(&self) -> Option<u64> {
        let existing = self.current.lock().await.take()?;
        log::info!(
            "Cancelling search generation {} ({:?})",
            existing.generation,
            existing.query
        );
        existing.cancellation_token.cancel();
        Some(existing.generation)
    }

    /// Clear the slot if it still belongs to `generation`.
    pub async fn finish(&self, generation: u64) {
        let mut current = self.current.lock().await;
        if current
            .as_ref()
            .is_some_and(|state| state.generation == generation)
        {
            *current = None;
        }
    }

    /// Generation of the search in flight.
    pub async fn active_generation(&self) -> Option<u64> {
        self.current.lock().await.as_ref().map(|state| state.generation)
    }
}
