//! InMemoryGateway - 開発・テスト用のプッシュ配信ゲートウェイ
//!
//! 送信はすべて記録され、トークンごとに失敗を仕込めます。
//! - `fail_token_always`: そのトークンへの送信は常に失敗（登録解除の再現など）
//! - `fail_token_once`: 次の 1 回だけ失敗（一時障害の再現）

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::{MulticastMessage, PushMessage, PushToken};
use crate::ports::{GatewayError, MessageId, MulticastReport, PushGateway};

#[derive(Debug, Default)]
struct GatewayState {
    sent: Vec<PushMessage>,
    multicasts: Vec<MulticastMessage>,
    always: HashMap<PushToken, GatewayError>,
    once: HashMap<PushToken, VecDeque<GatewayError>>,
    multicast_failure: Option<GatewayError>,
    next_id: u64,
}

impl GatewayState {
    fn deliver(&mut self, token: &PushToken) -> Result<MessageId, GatewayError> {
        if let Some(err) = self.always.get(token) {
            return Err(err.clone());
        }
        if let Some(err) = self.once.get_mut(token).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        self.next_id += 1;
        Ok(MessageId(format!("projects/herald/messages/{}", self.next_id)))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<GatewayState>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_token_always(&self, token: impl Into<PushToken>, error: GatewayError) {
        self.state.lock().await.always.insert(token.into(), error);
    }

    pub async fn fail_token_once(&self, token: impl Into<PushToken>, error: GatewayError) {
        self.state
            .lock()
            .await
            .once
            .entry(token.into())
            .or_default()
            .push_back(error);
    }

    /// The next multicast call fails as a whole.
    pub async fn fail_next_multicast(&self, error: GatewayError) {
        self.state.lock().await.multicast_failure = Some(error);
    }

    /// Every single-token send attempt, successful or not.
    pub async fn sent_messages(&self) -> Vec<PushMessage> {
        self.state.lock().await.sent.clone()
    }

    pub async fn attempts_to(&self, token: &str) -> usize {
        self.state
            .lock()
            .await
            .sent
            .iter()
            .filter(|m| m.token.as_str() == token)
            .count()
    }

    pub async fn multicasts(&self) -> Vec<MulticastMessage> {
        self.state.lock().await.multicasts.clone()
    }
}

#[async_trait]
impl PushGateway for InMemoryGateway {
    async fn send(&self, message: &PushMessage) -> Result<MessageId, GatewayError> {
        let mut state = self.state.lock().await;
        state.sent.push(message.clone());
        let result = state.deliver(&message.token);
        if let Ok(id) = &result {
            info!(
                message_id = %id.0,
                title = %message.payload.notification.title,
                "push delivered"
            );
        }
        result
    }

    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<MulticastReport, GatewayError> {
        let mut state = self.state.lock().await;
        state.multicasts.push(message.clone());
        if let Some(err) = state.multicast_failure.take() {
            return Err(err);
        }
        let responses = message.tokens.iter().map(|t| state.deliver(t)).collect();
        Ok(MulticastReport { responses })
    }
}
