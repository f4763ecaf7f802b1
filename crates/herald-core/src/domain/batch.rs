//! WriteBatch - 1 パス分の書き込みをまとめたもの
//!
//! ドキュメント単位でキー付けされるので、同じ更新を二度積んでも 1 件になります。
//! ストアはこの単位でアトミックにコミットします（全部反映 or 何も反映しない）。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{NotificationId, UserId};

/// Identity of a document touched by a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "collection", content = "id", rename_all = "snake_case")]
pub enum DocumentKey {
    Notification(NotificationId),
    User(UserId),
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKey::Notification(id) => f.write_str(&id.path()),
            DocumentKey::User(id) => f.write_str(&id.path()),
        }
    }
}

/// A single staged field update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    /// `triggered = true` on a notification.
    MarkTriggered,
    /// `fcmToken = null` on a user.
    ClearPushToken,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: BTreeMap<DocumentKey, Mutation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_triggered(&mut self, id: NotificationId) {
        self.writes
            .insert(DocumentKey::Notification(id), Mutation::MarkTriggered);
    }

    pub fn clear_push_token(&mut self, id: UserId) {
        self.writes.insert(DocumentKey::User(id), Mutation::ClearPushToken);
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn contains(&self, key: &DocumentKey) -> bool {
        self.writes.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocumentKey, &Mutation)> {
        self.writes.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = (DocumentKey, Mutation);
    type IntoIter = std::collections::btree_map::IntoIter<DocumentKey, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_is_keyed_by_document() {
        let mut batch = WriteBatch::new();
        batch.mark_triggered(NotificationId::new("n-1"));
        batch.mark_triggered(NotificationId::new("n-1"));
        batch.clear_push_token(UserId::new("u-1"));
        batch.clear_push_token(UserId::new("u-1"));

        assert_eq!(batch.len(), 2);
        assert!(batch.contains(&DocumentKey::User(UserId::new("u-1"))));
    }

    #[test]
    fn document_key_displays_path() {
        let key = DocumentKey::Notification(NotificationId::new("n-9"));
        assert_eq!(key.to_string(), "scheduled_notifications/n-9");
    }
}
