//! Login alert: one multicast push to every registered device of a user.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::context::AppContext;
use crate::app::resolver::DeviceTokenResolver;
use crate::app::sender::PushSender;
use crate::config::MessageConfig;
use crate::domain::{AndroidConfig, ApnsConfig, MessagePayload, MulticastMessage, UserId};
use crate::error::HeraldError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAlertRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

impl LoginAlertRequest {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAlertResponse {
    pub success: bool,
    pub message: String,
    /// Tokens the gateway accepted.
    pub success_count: usize,
}

pub struct LoginAlertSender {
    resolver: DeviceTokenResolver,
    sender: Arc<PushSender>,
    messages: MessageConfig,
}

impl LoginAlertSender {
    pub fn new(resolver: DeviceTokenResolver, sender: Arc<PushSender>, messages: MessageConfig) -> Self {
        Self {
            resolver,
            sender,
            messages,
        }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(
            DeviceTokenResolver::from_context(ctx),
            Arc::new(PushSender::from_context(ctx)),
            ctx.config.messages.clone(),
        )
    }

    fn payload(&self) -> MessagePayload {
        let m = &self.messages;
        MessagePayload::new(m.login_title.clone(), m.login_body.clone())
            .with_android(AndroidConfig::high_priority(
                m.login_channel_id.clone(),
                m.sound.clone(),
            ))
            .with_apns(ApnsConfig::with_sound(m.sound.clone()))
    }

    pub async fn send(&self, request: LoginAlertRequest) -> Result<LoginAlertResponse, HeraldError> {
        let user_id = request
            .user_id
            .filter(|id| !id.is_empty())
            .map(UserId::new)
            .ok_or_else(|| HeraldError::InvalidArgument("Missing userId".to_string()))?;

        let tokens = self.resolver.resolve_all(&user_id).await?;
        if tokens.is_empty() {
            info!(%user_id, "no device tokens found");
            return Ok(LoginAlertResponse {
                success: false,
                message: "No device tokens found".to_string(),
                success_count: 0,
            });
        }

        let message = MulticastMessage::new(tokens, self.payload());
        let report = self.sender.send_multicast(&message).await?;
        info!(
            %user_id,
            success_count = report.success_count(),
            failure_count = report.failure_count(),
            "login notification sent"
        );

        Ok(LoginAlertResponse {
            success: true,
            message: "Login notification sent".to_string(),
            success_count: report.success_count(),
        })
    }
}
