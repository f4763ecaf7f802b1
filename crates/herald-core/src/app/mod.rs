//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder / App**: コンテキストの構築とワイヤリング
//! - **TokenResolver**: 受信者 → プッシュトークン（プロフィール／デバイスの 2 戦略）
//! - **PushSender**: 送信と失敗分類
//! - **OutcomeRecorder**: 書き込みのステージングとアトミックコミット
//! - **DispatchLoop**: 1 パスの本体（query → fan-out → join → commit）
//! - **Triggers**: 定期実行と即時実行
//! - **LoginAlertSender**: ログイン通知のマルチキャスト

pub mod builder;
pub mod context;
pub mod resolver;
pub mod sender;
pub mod recorder;
pub mod dispatch_loop;
pub mod trigger;
pub mod login_alert;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::context::AppContext;
pub use self::resolver::{DeviceTokenResolver, ProfileTokenResolver, TokenResolver};
pub use self::sender::{PushSender, SendResult};
pub use self::recorder::OutcomeRecorder;
pub use self::dispatch_loop::DispatchLoop;
pub use self::trigger::{ScheduledTrigger, TriggerResponse, run_scheduled_pass, trigger_now};
pub use self::login_alert::{LoginAlertRequest, LoginAlertResponse, LoginAlertSender};
