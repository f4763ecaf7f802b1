//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（ドキュメントストア、プッシュ配信ゲートウェイ）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - ストアが source of truth（正本）
//! - 状態変更はパス終了時の 1 回のバッチコミットだけ
//! - ゲートウェイのエラーは呼び出し側で分類し、パスを止めない

pub mod notification_store;
pub mod user_directory;
pub mod push_gateway;
pub mod clock;
pub mod id_generator;

// 主要な trait を再エクスポート
pub use self::notification_store::{NotificationStore, StoreError};
pub use self::user_directory::UserDirectory;
pub use self::push_gateway::{
    GatewayError, MessageId, MulticastReport, PushGateway, TOKEN_NOT_REGISTERED,
};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
