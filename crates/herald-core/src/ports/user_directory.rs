//! UserDirectory port - ユーザーとデバイストークンの参照

use async_trait::async_trait;

use crate::domain::{DeviceRecord, UserId, UserProfile};
use crate::ports::notification_store::StoreError;

/// UserDirectory は users コレクションを読む
///
/// トークンの保存形は 2 種類あります：
/// - `users/{id}.fcmToken`（1 ユーザー 1 トークン、スケジュール通知用）
/// - `users/{id}/devices/*.fcmToken`（デバイスごと、ログイン通知用）
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// ユーザードキュメントを取得（存在しなければ `Ok(None)`）
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError>;

    /// デバイスのサブコレクションを列挙（ユーザーがいなければ空）
    async fn list_devices(&self, user_id: &UserId) -> Result<Vec<DeviceRecord>, StoreError>;
}
