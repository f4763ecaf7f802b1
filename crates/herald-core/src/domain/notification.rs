//! Stored documents: scheduled notifications, user profiles, devices.
//!
//! Field names follow the stored document shape (`userId`, `fcmToken`, ...),
//! so these types serialize straight into store snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DeviceId, EventId, NotificationId, UserId};

/// A push-delivery token issued by the gateway to one app install.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushToken(String);

impl PushToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stored tokens may be empty strings; those count as absent.
    /// Whitespace is left to the gateway to judge.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PushToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for PushToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reminder created ahead of time by the scheduling side.
///
/// Once `triggered` is true the notification is never sent again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNotification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub title: String,
    pub body: String,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub triggered: bool,
}

impl ScheduledNotification {
    pub fn new(
        id: impl Into<NotificationId>,
        user_id: impl Into<UserId>,
        event_id: impl Into<EventId>,
        title: impl Into<String>,
        body: impl Into<String>,
        scheduled_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            event_id: event_id.into(),
            title: title.into(),
            body: body.into(),
            scheduled_time,
            triggered: false,
        }
    }

    /// Due means scheduled at or before `now` and not yet triggered.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.triggered && self.scheduled_time <= now
    }
}

/// The part of a user document the dispatcher reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    #[serde(rename = "fcmToken", default)]
    pub push_token: Option<PushToken>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<UserId>, push_token: Option<PushToken>) -> Self {
        Self {
            user_id: user_id.into(),
            push_token,
        }
    }

    /// The stored token, if present and non-empty.
    pub fn usable_token(&self) -> Option<&PushToken> {
        self.push_token.as_ref().filter(|t| !t.is_empty())
    }
}

/// One registered device under `users/{id}/devices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_id: DeviceId,
    #[serde(rename = "fcmToken", default)]
    pub push_token: Option<PushToken>,
}

impl DeviceRecord {
    pub fn new(device_id: impl Into<DeviceId>, push_token: Option<PushToken>) -> Self {
        Self {
            device_id: device_id.into(),
            push_token,
        }
    }
}
