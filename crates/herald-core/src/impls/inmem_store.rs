//! InMemoryStore - 開発・テスト用のドキュメントストア
//!
//! # 学習ポイント
//! - 1 つの Mutex 配下で「検証 → 適用」することでバッチコミットをアトミックにする
//! - スナップショット（JSON）で初期データを投入・ダンプできる
//! - 障害注入（コミット失敗、クエリ失敗、特定ユーザーの参照失敗）

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{
    DeviceRecord, DocumentKey, Mutation, NotificationId, ScheduledNotification, UserId,
    UserProfile, WriteBatch,
};
use crate::ports::{NotificationStore, StoreError, UserDirectory};

/// Serializable dump of every collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub notifications: Vec<ScheduledNotification>,
    pub users: Vec<UserProfile>,
    /// `users/{id}/devices`, keyed by user id.
    pub devices: BTreeMap<UserId, Vec<DeviceRecord>>,
}

#[derive(Debug, Default)]
struct Faults {
    /// Number of upcoming commits that fail.
    failing_commits: usize,
    failing_queries: bool,
    failing_users: HashSet<UserId>,
}

#[derive(Debug, Default)]
struct StoreState {
    notifications: BTreeMap<NotificationId, ScheduledNotification>,
    users: BTreeMap<UserId, UserProfile>,
    devices: BTreeMap<UserId, Vec<DeviceRecord>>,
    faults: Faults,
    commits: usize,
}

impl StoreState {
    fn exists(&self, key: &DocumentKey) -> bool {
        match key {
            DocumentKey::Notification(id) => self.notifications.contains_key(id),
            DocumentKey::User(id) => self.users.contains_key(id),
        }
    }

    fn apply(&mut self, key: DocumentKey, mutation: Mutation) {
        match (key, mutation) {
            (DocumentKey::Notification(id), Mutation::MarkTriggered) => {
                if let Some(n) = self.notifications.get_mut(&id) {
                    n.triggered = true;
                }
            }
            (DocumentKey::User(id), Mutation::ClearPushToken) => {
                if let Some(u) = self.users.get_mut(&id) {
                    u.push_token = None;
                }
            }
            // The batch API only pairs notifications with MarkTriggered and
            // users with ClearPushToken.
            _ => {}
        }
    }
}

/// In-memory implementation of both store ports.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let state = StoreState {
            notifications: snapshot
                .notifications
                .into_iter()
                .map(|n| (n.id.clone(), n))
                .collect(),
            users: snapshot
                .users
                .into_iter()
                .map(|u| (u.user_id.clone(), u))
                .collect(),
            devices: snapshot.devices,
            ..StoreState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.lock().await;
        StoreSnapshot {
            notifications: state.notifications.values().cloned().collect(),
            users: state.users.values().cloned().collect(),
            devices: state.devices.clone(),
        }
    }

    pub async fn insert_notification(&self, notification: ScheduledNotification) {
        let mut state = self.state.lock().await;
        state
            .notifications
            .insert(notification.id.clone(), notification);
    }

    pub async fn upsert_user(&self, profile: UserProfile) {
        let mut state = self.state.lock().await;
        state.users.insert(profile.user_id.clone(), profile);
    }

    pub async fn add_device(&self, user_id: UserId, device: DeviceRecord) {
        let mut state = self.state.lock().await;
        state.devices.entry(user_id).or_default().push(device);
    }

    pub async fn notification(&self, id: &NotificationId) -> Option<ScheduledNotification> {
        self.state.lock().await.notifications.get(id).cloned()
    }

    pub async fn profile(&self, id: &UserId) -> Option<UserProfile> {
        self.state.lock().await.users.get(id).cloned()
    }

    /// Number of commits that actually applied.
    pub async fn commit_count(&self) -> usize {
        self.state.lock().await.commits
    }

    /// The next `n` commits fail without applying anything.
    pub async fn fail_next_commits(&self, n: usize) {
        self.state.lock().await.faults.failing_commits = n;
    }

    pub async fn fail_queries(&self, failing: bool) {
        self.state.lock().await.faults.failing_queries = failing;
    }

    /// Lookups of this user's documents fail until cleared.
    pub async fn fail_lookups_for(&self, user_id: UserId) {
        self.state.lock().await.faults.failing_users.insert(user_id);
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults = Faults::default();
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn query_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledNotification>, StoreError> {
        let state = self.state.lock().await;
        if state.faults.failing_queries {
            return Err(StoreError::Unavailable("query failed (injected)".to_string()));
        }
        Ok(state
            .notifications
            .values()
            .filter(|n| n.is_due(now))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.faults.failing_commits > 0 {
            state.faults.failing_commits -= 1;
            return Err(StoreError::Unavailable("commit failed (injected)".to_string()));
        }

        // 先に全件検証してから適用する（途中で失敗しても何も書かない）
        if let Some((missing, _)) = batch.iter().find(|(key, _)| !state.exists(key)) {
            return Err(StoreError::NotFound(missing.clone()));
        }
        for (key, mutation) in batch {
            state.apply(key, mutation);
        }
        state.commits += 1;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let state = self.state.lock().await;
        if state.faults.failing_users.contains(user_id) {
            return Err(StoreError::Unavailable(format!(
                "lookup of {} failed (injected)",
                user_id.path()
            )));
        }
        Ok(state.users.get(user_id).cloned())
    }

    async fn list_devices(&self, user_id: &UserId) -> Result<Vec<DeviceRecord>, StoreError> {
        let state = self.state.lock().await;
        if state.faults.failing_users.contains(user_id) {
            return Err(StoreError::Unavailable(format!(
                "lookup of {}/devices failed (injected)",
                user_id.path()
            )));
        }
        Ok(state.devices.get(user_id).cloned().unwrap_or_default())
    }
}
