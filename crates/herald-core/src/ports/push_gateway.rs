//! PushGateway port - プッシュ配信サービスへの送信
//!
//! ゲートウェイのエラーはコード付きで返ってきます。ポリシー上の分類は
//! 「トークン登録解除（恒久）」とそれ以外（一時的）の 2 値です。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;
use crate::domain::{MulticastMessage, PushMessage};

/// Gateway code for a token that is no longer registered.
pub const TOKEN_NOT_REGISTERED: &str = "messaging/registration-token-not-registered";

/// ゲートウェイが返すエラー
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct GatewayError {
    pub code: String,
    pub message: String,
}

impl GatewayError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn token_not_registered() -> Self {
        Self::new(
            TOKEN_NOT_REGISTERED,
            "Requested entity was not found.",
        )
    }

    /// 送信失敗の運用分類
    ///
    /// 登録解除だけが Permanent。それ以外は次のパスで再試行する。
    pub fn kind(&self) -> ErrorKind {
        if self.code == TOKEN_NOT_REGISTERED {
            ErrorKind::Permanent
        } else {
            ErrorKind::Transient
        }
    }
}

/// ゲートウェイが発行したメッセージ ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

/// マルチキャスト送信の結果（トークンごと）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticastReport {
    pub responses: Vec<Result<MessageId, GatewayError>>,
}

impl MulticastReport {
    pub fn success_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.responses.len() - self.success_count()
    }
}

/// PushGateway は配信サービスへの送信口
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<MessageId, GatewayError>;

    /// 1 回の呼び出しで複数トークンへ送る。個別の失敗は report に入り、
    /// 呼び出し自体の失敗だけが `Err` になる。
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<MulticastReport, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_registered(TOKEN_NOT_REGISTERED, ErrorKind::Permanent)]
    #[case::unavailable("messaging/unavailable", ErrorKind::Transient)]
    #[case::internal("messaging/internal-error", ErrorKind::Transient)]
    #[case::invalid_argument("messaging/invalid-argument", ErrorKind::Transient)]
    fn classification_is_binary(#[case] code: &str, #[case] expected: ErrorKind) {
        assert_eq!(GatewayError::new(code, "x").kind(), expected);
    }

    #[test]
    fn multicast_report_counts() {
        let report = MulticastReport {
            responses: vec![
                Ok(MessageId("m-1".to_string())),
                Err(GatewayError::token_not_registered()),
                Ok(MessageId("m-2".to_string())),
            ],
        };
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 1);
    }
}
