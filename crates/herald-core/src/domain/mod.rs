//! Domain model (IDs, stored documents, messages, outcomes, write batches).

pub mod batch;
pub mod ids;
pub mod message;
pub mod notification;
pub mod outcome;

pub use batch::{DocumentKey, Mutation, WriteBatch};
pub use ids::{DeviceId, EventId, NotificationId, PassId, UserId};
pub use message::{
    AndroidConfig, AndroidPriority, ApnsConfig, MessagePayload, MulticastMessage, PushMessage,
    ReminderTemplate,
};
pub use notification::{DeviceRecord, PushToken, ScheduledNotification, UserProfile};
pub use outcome::{BatchOutcome, ItemOutcome, PassReport};
