//! Triggers - パスの起動口
//!
//! - **on-demand**: `trigger_now`。結果を `{success, message?}` で返す
//! - **scheduled**: `ScheduledTrigger`。一定間隔でパスを回し、失敗はログに出すだけ
//!
//! どちらも `DispatchLoop::run_pass` をそのまま呼ぶので、同じストア状態からは
//! 同じ結果になります。

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::app::dispatch_loop::DispatchLoop;
use crate::domain::PassReport;
use crate::error::HeraldError;

/// Response of the on-demand trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TriggerResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Runs one pass right now.
pub async fn trigger_now(dispatch: &DispatchLoop) -> TriggerResponse {
    match dispatch.run_pass().await {
        Ok(_) => TriggerResponse::ok(),
        Err(e) => {
            error!(error = %e, "on-demand dispatch failed");
            TriggerResponse::failed(e.to_string())
        }
    }
}

/// Runs one pass on behalf of the scheduler. Errors are logged, never returned.
pub async fn run_scheduled_pass(dispatch: &DispatchLoop) -> Option<PassReport> {
    match dispatch.run_pass().await {
        Ok(report) => Some(report),
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "scheduled dispatch failed; next tick retries");
            None
        }
    }
}

/// Handle of the interval runner.
/// - `request_shutdown()` で次の tick を待たずに止まる
/// - 実行中のパスは中断しない（コミットまで走り切る）
pub struct ScheduledTrigger {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ScheduledTrigger {
    /// The first pass runs immediately, then every `interval`.
    ///
    /// A zero interval is rejected up front; `tokio::time::interval` would
    /// panic on it inside the spawned task.
    pub fn spawn(dispatch: Arc<DispatchLoop>, interval: Duration) -> Result<Self, HeraldError> {
        if interval.is_zero() {
            return Err(HeraldError::InvalidArgument(
                "scheduled interval must be positive".to_string(),
            ));
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(scheduled_loop(dispatch, interval, shutdown_rx));
        Ok(Self { shutdown_tx, join })
    }

    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            error!(error = %e, "scheduled trigger task ended abnormally");
        }
    }
}

async fn scheduled_loop(
    dispatch: Arc<DispatchLoop>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // 長いパスの後にまとめて追いかけ実行しない
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = interval.as_secs(), "scheduled trigger started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        run_scheduled_pass(&dispatch).await;
    }

    info!("scheduled trigger stopped");
}
