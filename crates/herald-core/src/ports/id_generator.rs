//! IdGenerator port - ID 生成の抽象化
//!
//! パスごとに一意な `PassId` を払い出します。ログの相関用です。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use ulid::Ulid;

use crate::domain::ids::PassId;
use crate::ports::Clock;

/// IdGenerator は分散環境でも衝突しない ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数のトリガーから同時に使える）
pub trait IdGenerator: Send + Sync {
    fn generate_pass_id(&self) -> PassId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テストでは FixedClock を渡すと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_pass_id(&self) -> PassId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        PassId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
