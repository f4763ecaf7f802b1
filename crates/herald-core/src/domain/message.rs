//! Push message model.
//!
//! Gateway payloads are strongly typed here and serialize to the gateway's
//! JSON shape (`notification`, `data`, `android`, `apns`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::notification::{PushToken, ScheduledNotification};

/// Data key carrying the event the reminder is about.
pub const DATA_EVENT_ID: &str = "eventId";

/// Data key the client uses to route a tap.
pub const DATA_CLICK_ACTION: &str = "click_action";

/// Data key carrying the notification type.
pub const DATA_TYPE: &str = "type";

/// Notification type stamped on scheduled reminders.
pub const EVENT_REMINDER_TYPE: &str = "event_reminder";

/// Visible title/body pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

/// Android delivery priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AndroidPriority {
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidNotification {
    pub channel_id: String,
    pub sound: String,
}

/// Android-specific delivery hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidConfig {
    pub priority: AndroidPriority,
    pub notification: AndroidNotification,
}

impl AndroidConfig {
    pub fn high_priority(channel_id: impl Into<String>, sound: impl Into<String>) -> Self {
        Self {
            priority: AndroidPriority::High,
            notification: AndroidNotification {
                channel_id: channel_id.into(),
                sound: sound.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aps {
    pub sound: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

/// APNs-specific delivery hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
}

impl ApnsConfig {
    pub fn with_sound(sound: impl Into<String>) -> Self {
        Self {
            payload: ApnsPayload {
                aps: Aps {
                    sound: sound.into(),
                },
            },
        }
    }
}

/// Everything in a message except its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub notification: NotificationContent,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
}

impl MessagePayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            notification: NotificationContent {
                title: title.into(),
                body: body.into(),
            },
            data: BTreeMap::new(),
            android: None,
            apns: None,
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_android(mut self, android: AndroidConfig) -> Self {
        self.android = Some(android);
        self
    }

    pub fn with_apns(mut self, apns: ApnsConfig) -> Self {
        self.apns = Some(apns);
        self
    }
}

/// A message addressed to a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub token: PushToken,
    #[serde(flatten)]
    pub payload: MessagePayload,
}

impl PushMessage {
    pub fn new(token: PushToken, payload: MessagePayload) -> Self {
        Self { token, payload }
    }
}

/// A message fanned out to several tokens in one gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticastMessage {
    pub tokens: Vec<PushToken>,
    #[serde(flatten)]
    pub payload: MessagePayload,
}

impl MulticastMessage {
    pub fn new(tokens: Vec<PushToken>, payload: MessagePayload) -> Self {
        Self { tokens, payload }
    }
}

/// Static parts of the event-reminder message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderTemplate {
    pub channel_id: String,
    pub click_action: String,
    pub sound: String,
}

impl ReminderTemplate {
    /// Builds the reminder payload for one notification.
    pub fn render(&self, notification: &ScheduledNotification) -> MessagePayload {
        MessagePayload::new(notification.title.clone(), notification.body.clone())
            .with_data(DATA_EVENT_ID, notification.event_id.as_str())
            .with_data(DATA_CLICK_ACTION, self.click_action.clone())
            .with_data(DATA_TYPE, EVENT_REMINDER_TYPE)
            .with_android(AndroidConfig::high_priority(
                self.channel_id.clone(),
                self.sound.clone(),
            ))
            .with_apns(ApnsConfig::with_sound(self.sound.clone()))
    }
}
