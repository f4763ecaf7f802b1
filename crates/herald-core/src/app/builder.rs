//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - コンテキストを 1 度だけ組み立て、全コンポーネントに明示的に渡す

use std::sync::Arc;

use crate::app::context::AppContext;
use crate::app::dispatch_loop::DispatchLoop;
use crate::app::login_alert::{LoginAlertRequest, LoginAlertResponse, LoginAlertSender};
use crate::app::trigger::{ScheduledTrigger, TriggerResponse, trigger_now};
use crate::config::{ConfigError, HeraldConfig};
use crate::error::HeraldError;
use crate::ports::{
    Clock, IdGenerator, NotificationStore, PushGateway, SystemClock, UlidGenerator, UserDirectory,
};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let store = Arc::new(InMemoryStore::new());
/// let app = AppBuilder::new()
///     .with_config(config)
///     .with_store(store)
///     .with_gateway(Arc::new(InMemoryGateway::new()))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - ストアとゲートウェイは必須。無ければ BuildError を返す
/// - 設定は build() 時に検証する
/// - Clock / IdGenerator は省略時にシステム時刻ベースのものを使う
#[derive(Default)]
pub struct AppBuilder {
    config: HeraldConfig,
    notifications: Option<Arc<dyn NotificationStore>>,
    users: Option<Arc<dyn UserDirectory>>,
    gateway: Option<Arc<dyn PushGateway>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing port: {0}. It must be provided before build().")]
    MissingPort(&'static str),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: HeraldConfig) -> Self {
        self.config = config;
        self
    }

    /// 1 つの実装で両方のストアポートを満たす場合のショートカット
    pub fn with_store<S>(self, store: Arc<S>) -> Self
    where
        S: NotificationStore + UserDirectory + 'static,
    {
        let users: Arc<dyn UserDirectory> = store.clone();
        self.with_notification_store(store).with_user_directory(users)
    }

    pub fn with_notification_store(mut self, store: Arc<dyn NotificationStore>) -> Self {
        self.notifications = Some(store);
        self
    }

    pub fn with_user_directory(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PushGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;
        let notifications = self
            .notifications
            .ok_or(BuildError::MissingPort("notification store"))?;
        let users = self.users.ok_or(BuildError::MissingPort("user directory"))?;
        let gateway = self.gateway.ok_or(BuildError::MissingPort("push gateway"))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let ids = self.ids.unwrap_or_else(|| {
            Arc::new(UlidGenerator::new(Arc::clone(&clock))) as Arc<dyn IdGenerator>
        });

        let ctx = Arc::new(AppContext {
            config: self.config,
            notifications,
            users,
            gateway,
            clock,
            ids,
        });
        Ok(App::new(ctx))
    }
}

/// App は組み立て済みのコンテキストと、その上のコンポーネント
pub struct App {
    ctx: Arc<AppContext>,
    dispatch: Arc<DispatchLoop>,
    login_alerts: LoginAlertSender,
}

impl App {
    fn new(ctx: Arc<AppContext>) -> Self {
        let dispatch = Arc::new(DispatchLoop::new(Arc::clone(&ctx)));
        let login_alerts = LoginAlertSender::from_context(&ctx);
        Self {
            ctx,
            dispatch,
            login_alerts,
        }
    }

    pub fn context(&self) -> Arc<AppContext> {
        Arc::clone(&self.ctx)
    }

    pub fn dispatch_loop(&self) -> Arc<DispatchLoop> {
        Arc::clone(&self.dispatch)
    }

    /// On-demand trigger.
    pub async fn trigger_now(&self) -> TriggerResponse {
        trigger_now(&self.dispatch).await
    }

    /// Starts the interval trigger using the configured interval.
    pub fn spawn_scheduled(&self) -> Result<ScheduledTrigger, HeraldError> {
        ScheduledTrigger::spawn(self.dispatch_loop(), self.ctx.config.dispatch.interval())
    }

    pub async fn send_login_alert(
        &self,
        request: LoginAlertRequest,
    ) -> Result<LoginAlertResponse, HeraldError> {
        self.login_alerts.send(request).await
    }
}
