//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryStore**: NotificationStore + UserDirectory（スナップショット・障害注入付き）
//! - **InMemoryGateway**: PushGateway（送信記録・失敗の仕込み）
//!
//! # 本番用実装
//! 本番のドキュメントストア／配信ゲートウェイのアダプタは別クレートに置く想定です。

pub mod inmem_store;
pub mod inmem_gateway;

// 主要な型を再エクスポート
pub use self::inmem_store::{InMemoryStore, StoreSnapshot};
pub use self::inmem_gateway::InMemoryGateway;
