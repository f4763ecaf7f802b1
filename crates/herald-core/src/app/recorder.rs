//! OutcomeRecorder - パス中の状態変更を溜めて最後に 1 回でコミットする
//!
//! # 設計
//! - 各アイテムのタスクは recorder の clone を持ち、書き込みを積むだけ（読まない）
//! - ロックは積む瞬間だけ取り、await をまたがない
//! - `commit` は WriteBatch をストアに 1 回で渡す。部分適用は起きない

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{NotificationId, UserId, WriteBatch};
use crate::ports::{NotificationStore, StoreError};

#[derive(Debug, Clone, Default)]
pub struct OutcomeRecorder {
    staged: Arc<Mutex<WriteBatch>>,
}

impl OutcomeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mark_triggered(&self, id: NotificationId) {
        self.staged.lock().await.mark_triggered(id);
    }

    pub async fn clear_push_token(&self, id: UserId) {
        self.staged.lock().await.clear_push_token(id);
    }

    pub async fn staged_len(&self) -> usize {
        self.staged.lock().await.len()
    }

    /// Commits everything staged so far and returns the number of writes.
    ///
    /// An empty buffer skips the store round-trip.
    pub async fn commit(&self, store: &dyn NotificationStore) -> Result<usize, StoreError> {
        let batch = std::mem::take(&mut *self.staged.lock().await);
        let writes = batch.len();
        if writes == 0 {
            return Ok(0);
        }
        store.commit(batch).await?;
        Ok(writes)
    }
}
