//! Token resolution strategies.
//!
//! Two storage shapes exist and are kept apart on purpose:
//! - [`ProfileTokenResolver`]: one `fcmToken` field on the user document
//!   (scheduled reminders).
//! - [`DeviceTokenResolver`]: one token per device under `users/{id}/devices`
//!   (login alerts).

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::context::AppContext;
use crate::domain::{PushToken, UserId};
use crate::ports::{StoreError, UserDirectory};

/// Resolves a recipient to the token a single push should go to.
///
/// A missing user and a user without a token both resolve to `Ok(None)`;
/// only a failing lookup is an error.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn resolve(&self, user_id: &UserId) -> Result<Option<PushToken>, StoreError>;
}

pub struct ProfileTokenResolver {
    users: Arc<dyn UserDirectory>,
}

impl ProfileTokenResolver {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(Arc::clone(&ctx.users))
    }
}

#[async_trait]
impl TokenResolver for ProfileTokenResolver {
    async fn resolve(&self, user_id: &UserId) -> Result<Option<PushToken>, StoreError> {
        let profile = self.users.get_profile(user_id).await?;
        Ok(profile.and_then(|p| p.usable_token().cloned()))
    }
}

pub struct DeviceTokenResolver {
    users: Arc<dyn UserDirectory>,
}

impl DeviceTokenResolver {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(Arc::clone(&ctx.users))
    }

    /// Every non-empty device token of the user, in device order.
    pub async fn resolve_all(&self, user_id: &UserId) -> Result<Vec<PushToken>, StoreError> {
        let devices = self.users.list_devices(user_id).await?;
        Ok(devices
            .into_iter()
            .filter_map(|d| d.push_token)
            .filter(|t| !t.is_empty())
            .collect())
    }
}

#[async_trait]
impl TokenResolver for DeviceTokenResolver {
    /// First registered device wins.
    async fn resolve(&self, user_id: &UserId) -> Result<Option<PushToken>, StoreError> {
        Ok(self.resolve_all(user_id).await?.into_iter().next())
    }
}
