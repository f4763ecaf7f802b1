//! AppContext - プロセス全体で共有する実行コンテキスト
//!
//! 起動時に 1 度だけ組み立て（`AppBuilder`）、各コンポーネントへ明示的に渡します。
//! グローバルなクライアントハンドルを隠れて参照する箇所はありません。

use std::sync::Arc;

use crate::config::HeraldConfig;
use crate::ports::{Clock, IdGenerator, NotificationStore, PushGateway, UserDirectory};

pub struct AppContext {
    pub config: HeraldConfig,
    pub notifications: Arc<dyn NotificationStore>,
    pub users: Arc<dyn UserDirectory>,
    pub gateway: Arc<dyn PushGateway>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
}
