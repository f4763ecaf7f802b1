//! PushSender - ゲートウェイ送信と失敗の分類
//!
//! 送信結果は必ず [`SendResult`] に落とし込み、エラーとして上に投げません。
//! 分類はポリシー用の 2 値だけです：
//! - 登録解除（恒久）→ トークンを無効化する
//! - それ以外（一時的）→ 何も変更せず次のパスに任せる

use std::sync::Arc;

use crate::app::context::AppContext;
use crate::domain::{
    MulticastMessage, PushMessage, PushToken, ReminderTemplate, ScheduledNotification,
};
use crate::error::ErrorKind;
use crate::ports::{GatewayError, MessageId, MulticastReport, PushGateway};

/// Classified result of one single-token send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendResult {
    Delivered(MessageId),
    /// The gateway no longer knows the token.
    TokenInvalid(GatewayError),
    /// Anything else; retry on a later pass.
    Transient(GatewayError),
}

impl SendResult {
    pub fn classify(result: Result<MessageId, GatewayError>) -> Self {
        match result {
            Ok(id) => SendResult::Delivered(id),
            Err(err) if err.kind() == ErrorKind::Permanent => SendResult::TokenInvalid(err),
            Err(err) => SendResult::Transient(err),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, SendResult::Delivered(_))
    }
}

pub struct PushSender {
    gateway: Arc<dyn PushGateway>,
    template: ReminderTemplate,
}

impl PushSender {
    pub fn new(gateway: Arc<dyn PushGateway>, template: ReminderTemplate) -> Self {
        Self { gateway, template }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(
            Arc::clone(&ctx.gateway),
            ctx.config.messages.reminder_template(),
        )
    }

    /// Event-reminder message for `notification`, addressed to `token`.
    pub fn reminder_for(&self, token: PushToken, notification: &ScheduledNotification) -> PushMessage {
        PushMessage::new(token, self.template.render(notification))
    }

    pub async fn send(&self, message: &PushMessage) -> SendResult {
        SendResult::classify(self.gateway.send(message).await)
    }

    /// Multicast is not classified: per-token failures stay in the report
    /// and only a failure of the whole call is an error.
    pub async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<MulticastReport, GatewayError> {
        self.gateway.send_multicast(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MessageConfig;
    use crate::impls::InMemoryGateway;
    use chrono::Utc;
    use rstest::rstest;

    #[rstest]
    #[case::not_registered(GatewayError::token_not_registered(), false)]
    #[case::unavailable(GatewayError::new("messaging/unavailable", "try later"), true)]
    #[case::quota(GatewayError::new("messaging/quota-exceeded", "slow down"), true)]
    fn failures_are_classified(#[case] err: GatewayError, #[case] transient: bool) {
        let result = SendResult::classify(Err(err));
        assert_eq!(matches!(result, SendResult::Transient(_)), transient);
        assert_eq!(matches!(result, SendResult::TokenInvalid(_)), !transient);
    }

    #[tokio::test]
    async fn send_captures_gateway_failures() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway
            .fail_token_always("dead", GatewayError::token_not_registered())
            .await;
        let sender = PushSender::new(gateway.clone(), MessageConfig::default().reminder_template());
        let n = ScheduledNotification::new("n-1", "u-1", "e-1", "t", "b", Utc::now());

        let ok = sender.send(&sender.reminder_for("live".into(), &n)).await;
        assert!(ok.is_delivered());

        let dead = sender.send(&sender.reminder_for("dead".into(), &n)).await;
        assert!(matches!(dead, SendResult::TokenInvalid(_)));

        let sent = gateway.sent_messages().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].payload.data["type"], "event_reminder");
        assert_eq!(sent[0].payload.data["eventId"], "e-1");
    }
}
