//! DispatchLoop - スケジュール通知の配信パス
//!
//! # フロー（1 パス）
//! 1. `scheduled_time <= now && !triggered` を最大 `batch_limit` 件取得
//! 2. アイテムごとにタスクを spawn（トークン解決 → 送信 → 結果分類 → recorder に積む）
//! 3. 全タスクの完了を待つ（パス内で唯一の合流点）
//! 4. 積んだ書き込みを 1 回のバッチでコミット
//!
//! コミットに失敗するとパスの変更はすべて捨てられ、次のパスで同じアイテムが
//! 再処理されます（at-least-once。二重送信は許容）。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::app::context::AppContext;
use crate::app::recorder::OutcomeRecorder;
use crate::app::resolver::{ProfileTokenResolver, TokenResolver};
use crate::app::sender::{PushSender, SendResult};
use crate::domain::{
    BatchOutcome, ItemOutcome, NotificationId, PassId, PassReport, ScheduledNotification,
};
use crate::error::HeraldError;
use crate::observability::PassCounts;

pub struct DispatchLoop {
    ctx: Arc<AppContext>,
    resolver: Arc<dyn TokenResolver>,
    sender: Arc<PushSender>,
}

impl DispatchLoop {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let resolver = Arc::new(ProfileTokenResolver::from_context(&ctx));
        let sender = Arc::new(PushSender::from_context(&ctx));
        Self::with_parts(ctx, resolver, sender)
    }

    pub fn with_parts(
        ctx: Arc<AppContext>,
        resolver: Arc<dyn TokenResolver>,
        sender: Arc<PushSender>,
    ) -> Self {
        Self {
            ctx,
            resolver,
            sender,
        }
    }

    /// Runs one batch pass and commits its staged writes.
    ///
    /// Per-item failures never fail the pass. Only the due-item query and the
    /// final commit can return an error, and in both cases nothing from this
    /// pass is persisted.
    pub async fn run_pass(&self) -> Result<PassReport, HeraldError> {
        let pass_id = self.ctx.ids.generate_pass_id();
        let now = self.ctx.clock.now();
        let limit = self.ctx.config.dispatch.batch_limit;

        let mut due = self.ctx.notifications.query_due(now, limit).await?;
        due.truncate(limit);
        info!(%pass_id, due = due.len(), %now, "dispatch pass started");

        let recorder = OutcomeRecorder::new();
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, NotificationId> = HashMap::new();

        for notification in due {
            let id = notification.id.clone();
            let handle = tasks.spawn(process_item(
                pass_id,
                notification,
                Arc::clone(&self.resolver),
                Arc::clone(&self.sender),
                recorder.clone(),
            ));
            in_flight.insert(handle.id(), id);
        }

        let mut items = Vec::with_capacity(in_flight.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((task_id, item)) => {
                    in_flight.remove(&task_id);
                    items.push(item);
                }
                Err(join_err) => {
                    // パニックしたアイテムは何も積んでいない前提で、次のパスに回す
                    let Some(id) = in_flight.remove(&join_err.id()) else {
                        continue;
                    };
                    error!(%pass_id, notification_id = %id, error = %join_err, "item task aborted");
                    items.push(
                        ItemOutcome::new(id, BatchOutcome::ProcessingError)
                            .with_reason(join_err.to_string()),
                    );
                }
            }
        }

        let committed_writes = recorder
            .commit(self.ctx.notifications.as_ref())
            .await
            .map_err(|e| {
                error!(%pass_id, error = %e, "commit failed; pass discarded");
                HeraldError::Commit(e)
            })?;

        let report = PassReport {
            pass_id,
            items,
            committed_writes,
        };
        let counts = PassCounts::from(&report);
        info!(
            %pass_id,
            sent = counts.sent,
            skipped_no_token = counts.skipped_no_token,
            transient = counts.send_failed_transient,
            token_invalid = counts.send_failed_token_invalid,
            errors = counts.processing_error,
            committed_writes,
            "dispatch pass committed"
        );
        Ok(report)
    }
}

async fn process_item(
    pass_id: PassId,
    notification: ScheduledNotification,
    resolver: Arc<dyn TokenResolver>,
    sender: Arc<PushSender>,
    recorder: OutcomeRecorder,
) -> ItemOutcome {
    let id = notification.id.clone();
    let user_id = &notification.user_id;

    let token = match resolver.resolve(user_id).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            // 届け先がないので、無限に再試行しないよう triggered にする
            debug!(%pass_id, notification_id = %id, %user_id, "no push token; marking triggered");
            recorder.mark_triggered(id.clone()).await;
            return ItemOutcome::new(id, BatchOutcome::SkippedNoToken);
        }
        Err(e) => {
            warn!(%pass_id, notification_id = %id, %user_id, error = %e, "recipient lookup failed");
            return ItemOutcome::new(id, BatchOutcome::ProcessingError).with_reason(e.to_string());
        }
    };

    let message = sender.reminder_for(token, &notification);
    match sender.send(&message).await {
        SendResult::Delivered(message_id) => {
            debug!(%pass_id, notification_id = %id, message_id = %message_id.0, "reminder sent");
            recorder.mark_triggered(id.clone()).await;
            ItemOutcome::new(id, BatchOutcome::Sent)
        }
        SendResult::TokenInvalid(err) => {
            // トークンだけ消す。通知自体は次のパスで no-token 経路に乗って triggered になる
            error!(%pass_id, notification_id = %id, %user_id, error = %err, "send failed; token no longer registered");
            recorder.clear_push_token(user_id.clone()).await;
            ItemOutcome::new(id, BatchOutcome::SendFailedTokenInvalid).with_reason(err.to_string())
        }
        SendResult::Transient(err) => {
            error!(%pass_id, notification_id = %id, %user_id, error = %err, "send failed; will retry next pass");
            ItemOutcome::new(id, BatchOutcome::SendFailedTransient).with_reason(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::builder::AppBuilder;
    use crate::config::HeraldConfig;
    use crate::domain::{PushToken, UserId, UserProfile};
    use crate::impls::{InMemoryGateway, InMemoryStore};
    use crate::ports::{FixedClock, GatewayError};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    struct Harness {
        store: Arc<InMemoryStore>,
        gateway: Arc<InMemoryGateway>,
        dispatch: DispatchLoop,
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn harness_with(config: HeraldConfig) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(InMemoryGateway::new());
        let app = AppBuilder::new()
            .with_config(config)
            .with_store(store.clone())
            .with_gateway(gateway.clone())
            .with_clock(Arc::new(FixedClock::new(now())))
            .build()
            .unwrap();
        Harness {
            store,
            gateway,
            dispatch: DispatchLoop::new(app.context()),
        }
    }

    fn harness() -> Harness {
        harness_with(HeraldConfig::default())
    }

    async fn due(store: &InMemoryStore, id: &str, user: &str) {
        store
            .insert_notification(ScheduledNotification::new(
                id,
                user,
                format!("event-{id}"),
                "Reminder",
                "Soon",
                now() - Duration::minutes(1),
            ))
            .await;
    }

    async fn user(store: &InMemoryStore, id: &str, token: Option<&str>) {
        store
            .upsert_user(UserProfile::new(id, token.map(PushToken::new)))
            .await;
    }

    async fn triggered(store: &InMemoryStore, id: &str) -> bool {
        store
            .notification(&NotificationId::new(id))
            .await
            .unwrap()
            .triggered
    }

    async fn token_of(store: &InMemoryStore, id: &str) -> Option<PushToken> {
        store.profile(&UserId::new(id)).await.unwrap().push_token
    }

    #[tokio::test]
    async fn mixed_batch_scenario() {
        let h = harness();
        due(&h.store, "A", "ua").await;
        user(&h.store, "ua", Some("tok-a")).await;
        due(&h.store, "B", "ub").await;
        user(&h.store, "ub", None).await;
        due(&h.store, "C", "uc").await;
        user(&h.store, "uc", Some("tok-c")).await;
        due(&h.store, "D", "ud").await;
        user(&h.store, "ud", Some("tok-d")).await;
        h.gateway
            .fail_token_always("tok-c", GatewayError::token_not_registered())
            .await;
        h.gateway
            .fail_token_always("tok-d", GatewayError::new("messaging/unavailable", "later"))
            .await;

        let report = h.dispatch.run_pass().await.unwrap();

        assert_eq!(report.outcome_of(&"A".into()), Some(BatchOutcome::Sent));
        assert_eq!(report.outcome_of(&"B".into()), Some(BatchOutcome::SkippedNoToken));
        assert_eq!(
            report.outcome_of(&"C".into()),
            Some(BatchOutcome::SendFailedTokenInvalid)
        );
        assert_eq!(
            report.outcome_of(&"D".into()),
            Some(BatchOutcome::SendFailedTransient)
        );
        assert_eq!(report.committed_writes, 3);

        assert!(triggered(&h.store, "A").await);
        assert!(triggered(&h.store, "B").await);
        assert!(!triggered(&h.store, "C").await);
        assert!(!triggered(&h.store, "D").await);

        assert_eq!(token_of(&h.store, "uc").await, None);
        assert_eq!(token_of(&h.store, "ud").await, Some(PushToken::new("tok-d")));

        // B には送信していない
        let sent = h.gateway.sent_messages().await;
        assert_eq!(sent.len(), 3);
        assert_eq!(h.gateway.attempts_to("tok-a").await, 1);
    }

    #[tokio::test]
    async fn invalid_token_item_is_marked_on_following_pass_without_resend() {
        let h = harness();
        due(&h.store, "C", "uc").await;
        user(&h.store, "uc", Some("tok-c")).await;
        h.gateway
            .fail_token_always("tok-c", GatewayError::token_not_registered())
            .await;

        h.dispatch.run_pass().await.unwrap();
        assert!(!triggered(&h.store, "C").await);

        let second = h.dispatch.run_pass().await.unwrap();
        assert_eq!(
            second.outcome_of(&"C".into()),
            Some(BatchOutcome::SkippedNoToken)
        );
        assert!(triggered(&h.store, "C").await);
        assert_eq!(h.gateway.attempts_to("tok-c").await, 1);
    }

    #[tokio::test]
    async fn transient_failure_reappears_next_pass() {
        let h = harness();
        due(&h.store, "D", "ud").await;
        user(&h.store, "ud", Some("tok-d")).await;
        h.gateway
            .fail_token_once("tok-d", GatewayError::new("messaging/internal-error", "boom"))
            .await;

        let first = h.dispatch.run_pass().await.unwrap();
        assert_eq!(
            first.outcome_of(&"D".into()),
            Some(BatchOutcome::SendFailedTransient)
        );
        assert!(!triggered(&h.store, "D").await);

        let second = h.dispatch.run_pass().await.unwrap();
        assert_eq!(second.outcome_of(&"D".into()), Some(BatchOutcome::Sent));
        assert!(triggered(&h.store, "D").await);
        assert_eq!(h.gateway.attempts_to("tok-d").await, 2);
    }

    #[tokio::test]
    async fn lookup_failure_leaves_item_for_retry() {
        let h = harness();
        due(&h.store, "E", "ue").await;
        user(&h.store, "ue", Some("tok-e")).await;
        due(&h.store, "A", "ua").await;
        user(&h.store, "ua", Some("tok-a")).await;
        h.store.fail_lookups_for(UserId::new("ue")).await;

        let report = h.dispatch.run_pass().await.unwrap();
        assert_eq!(
            report.outcome_of(&"E".into()),
            Some(BatchOutcome::ProcessingError)
        );
        assert!(!triggered(&h.store, "E").await);
        assert!(triggered(&h.store, "A").await);
        assert_eq!(h.gateway.attempts_to("tok-e").await, 0);
    }

    #[tokio::test]
    async fn pass_is_capped_at_batch_limit() {
        let h = harness();
        user(&h.store, "u", Some("tok")).await;
        for i in 0..130 {
            due(&h.store, &format!("n-{i:03}"), "u").await;
        }

        let first = h.dispatch.run_pass().await.unwrap();
        assert_eq!(first.items.len(), 100);
        assert_eq!(h.gateway.sent_messages().await.len(), 100);

        let second = h.dispatch.run_pass().await.unwrap();
        assert_eq!(second.items.len(), 30);

        let third = h.dispatch.run_pass().await.unwrap();
        assert!(third.items.is_empty());
        assert_eq!(third.committed_writes, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_passes_both_commit_and_leave_nothing_due() {
        let h = harness();
        user(&h.store, "u", Some("tok")).await;
        for i in 0..50 {
            due(&h.store, &format!("n-{i:02}"), "u").await;
        }

        let (a, b) = tokio::join!(h.dispatch.run_pass(), h.dispatch.run_pass());
        assert!(a.is_ok());
        assert!(b.is_ok());

        // 同じアイテムを両方のパスが拾うことはある（at-least-once）が、取りこぼしはない
        let sends = h.gateway.attempts_to("tok").await;
        assert!((50..=100).contains(&sends), "sends = {sends}");
        for i in 0..50 {
            assert!(triggered(&h.store, &format!("n-{i:02}")).await);
        }

        let third = h.dispatch.run_pass().await.unwrap();
        assert!(third.items.is_empty());
    }

    #[tokio::test]
    async fn whitespace_token_is_still_attempted() {
        let h = harness();
        due(&h.store, "A", "ua").await;
        user(&h.store, "ua", Some("  ")).await;

        let report = h.dispatch.run_pass().await.unwrap();
        assert_eq!(report.outcome_of(&"A".into()), Some(BatchOutcome::Sent));
        assert_eq!(h.gateway.attempts_to("  ").await, 1);
    }

    #[tokio::test]
    async fn configured_limit_is_honoured() {
        let mut config = HeraldConfig::default();
        config.dispatch.batch_limit = 2;
        let h = harness_with(config);
        user(&h.store, "u", None).await;
        for i in 0..5 {
            due(&h.store, &format!("n-{i}"), "u").await;
        }

        let report = h.dispatch.run_pass().await.unwrap();
        assert_eq!(report.items.len(), 2);
    }

    #[tokio::test]
    async fn commit_failure_discards_the_whole_pass() {
        let h = harness();
        due(&h.store, "A", "ua").await;
        user(&h.store, "ua", Some("tok-a")).await;
        due(&h.store, "B", "ub").await;
        due(&h.store, "C", "uc").await;
        user(&h.store, "uc", Some("tok-c")).await;
        h.gateway
            .fail_token_always("tok-c", GatewayError::token_not_registered())
            .await;
        h.store.fail_next_commits(1).await;

        let err = h.dispatch.run_pass().await.unwrap_err();
        assert!(matches!(err, HeraldError::Commit(_)));

        assert!(!triggered(&h.store, "A").await);
        assert!(!triggered(&h.store, "B").await);
        assert_eq!(token_of(&h.store, "uc").await, Some(PushToken::new("tok-c")));

        // at-least-once: A は次のパスで再送される
        h.dispatch.run_pass().await.unwrap();
        assert!(triggered(&h.store, "A").await);
        assert_eq!(h.gateway.attempts_to("tok-a").await, 2);
    }

    #[tokio::test]
    async fn query_failure_is_an_error_without_sends() {
        let h = harness();
        due(&h.store, "A", "ua").await;
        user(&h.store, "ua", Some("tok-a")).await;
        h.store.fail_queries(true).await;

        let err = h.dispatch.run_pass().await.unwrap_err();
        assert!(matches!(err, HeraldError::Store(_)));
        assert!(h.gateway.sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn future_and_triggered_items_are_ignored() {
        let h = harness();
        user(&h.store, "u", Some("tok")).await;
        h.store
            .insert_notification(ScheduledNotification::new(
                "later", "u", "e", "t", "b", now() + Duration::minutes(5),
            ))
            .await;
        let mut done = ScheduledNotification::new("done", "u", "e", "t", "b", now());
        done.triggered = true;
        h.store.insert_notification(done).await;

        let report = h.dispatch.run_pass().await.unwrap();
        assert!(report.items.is_empty());
        assert!(h.gateway.sent_messages().await.is_empty());
    }

    struct PanickingResolver;

    #[async_trait::async_trait]
    impl TokenResolver for PanickingResolver {
        async fn resolve(
            &self,
            _user_id: &UserId,
        ) -> Result<Option<PushToken>, crate::ports::StoreError> {
            panic!("resolver exploded");
        }
    }

    #[tokio::test]
    async fn panicking_item_is_contained() {
        let h = harness();
        due(&h.store, "A", "ua").await;
        let ctx = h.dispatch.ctx.clone();
        let sender = Arc::new(PushSender::from_context(&ctx));
        let dispatch = DispatchLoop::with_parts(ctx, Arc::new(PanickingResolver), sender);

        let report = dispatch.run_pass().await.unwrap();
        assert_eq!(
            report.outcome_of(&"A".into()),
            Some(BatchOutcome::ProcessingError)
        );
        assert!(!triggered(&h.store, "A").await);
    }
}
