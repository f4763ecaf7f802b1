//! NotificationStore port - 通知ドキュメントの正本（source of truth）
//!
//! 期限到来クエリとバッチコミットの 2 操作だけを要求します。
//! 本番ではドキュメントストア（バッチ書き込みがアトミックなもの）が実装します。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{DocumentKey, ScheduledNotification, WriteBatch};

/// ストア操作のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("document not found: {0}")]
    NotFound(DocumentKey),
}

/// NotificationStore は scheduled_notifications コレクションを扱う
///
/// # 設計原則
/// - `commit` はアトミック: 全ての書き込みが反映されるか、何も反映されない
/// - 書き込みは冪等（`triggered = true` を二度書いても害はない）
/// - 同時に走る複数パスの整合性は、このアトミック性と
///   `triggered == false` フィルタだけで担保する
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// `scheduled_time <= now && !triggered` を最大 `limit` 件返す（順序保証なし）
    async fn query_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledNotification>, StoreError>;

    /// バッチをアトミックに適用する
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
