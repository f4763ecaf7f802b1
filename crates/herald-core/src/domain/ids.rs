//! Domain identifiers (strongly-typed IDs).
//!
//! # ドキュメント ID + ジェネリック実装
//! ストア上のドキュメント ID はただの文字列ですが、`NotificationId` と `UserId` を
//! 取り違えるとトークン無効化が別ユーザーに飛んでしまいます。
//! Phantom type パターンで `Id<T>` に共通実装をまとめ、`T` をコレクションの
//! マーカーとして使うことで、コンパイル時に混同を防ぎます。
//!
//! パス（dispatch の 1 回分）には ULID ベースの `PassId` を使います。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// ドキュメントが属するコレクション名を提供します。
pub trait IdMarker: Send + Sync + 'static {
    /// コレクション名（例: "users", "scheduled_notifications"）
    fn collection() -> &'static str;
}

/// ジェネリックなドキュメント ID 型
///
/// `T` は PhantomData で、実行時にはメモリを消費しませんが、
/// コンパイル時に型安全性を提供します。
///
/// # 例
/// ```ignore
/// let user: UserId = Id::new("u-1");
/// let notification: NotificationId = Id::new("n-1");
/// // user と notification は異なる型なので、混同できない
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// `collection/id` 形式のドキュメントパス
    pub fn path(&self) -> String {
        format!("{}/{}", T::collection(), self.value)
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// Serialized as the bare document id string.
impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// ScheduledNotification のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Notification {}

impl IdMarker for Notification {
    fn collection() -> &'static str {
        "scheduled_notifications"
    }
}

/// User のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn collection() -> &'static str {
        "users"
    }
}

/// Device のマーカー型（users/{id}/devices のサブコレクション）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Device {}

impl IdMarker for Device {
    fn collection() -> &'static str {
        "devices"
    }
}

/// Event のマーカー型（参照のみ、このクレートでは読み書きしない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Event {}

impl IdMarker for Event {
    fn collection() -> &'static str {
        "events"
    }
}

/// Identifier of a scheduled notification document.
pub type NotificationId = Id<Notification>;

/// Identifier of a user document.
pub type UserId = Id<User>;

/// Identifier of a device document under a user.
pub type DeviceId = Id<Device>;

/// Identifier of the event a notification reminds about.
pub type EventId = Id<Event>;

/// Identifier of one dispatch pass.
///
/// ULID なので生成順にソートでき、ログからパスの前後関係を追えます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassId(Ulid);

impl PassId {
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for PassId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pass-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_render_their_document_path() {
        let user = UserId::new("alice");
        let notification = NotificationId::new("n-1");

        assert_eq!(user.path(), "users/alice");
        assert_eq!(notification.path(), "scheduled_notifications/n-1");
        assert_eq!(user.to_string(), "alice");

        // let _: UserId = notification; // <- does not compile
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let user = UserId::new("alice");
        let s = serde_json::to_string(&user).unwrap();
        assert_eq!(s, "\"alice\"");

        let back: UserId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn pass_id_has_prefix() {
        let id = PassId::from(Ulid::new());
        assert!(id.to_string().starts_with("pass-"));
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<UserId>(), size_of::<String>());
    }
}
