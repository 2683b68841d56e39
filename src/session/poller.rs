// src/session/poller.rs
//! Background poller: one task per open chat session. Each cycle sleeps a
//! fixed interval and forwards every row above its private cursor over an
//! unbounded channel to the coordinator. The poller never writes session
//! render state; the channel is the only thing shared with the foreground.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::Message;
use crate::store::MessageFeed;

/// Handle to a running poller. Dropping it without `stop` leaves the task
/// running until its next cancellation check fails to find a receiver.
pub struct ChatPoller {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl ChatPoller {
    /// Spawn the poll loop. `after_id` seeds the private cursor, normally
    /// the watermark of the history rendered at session open.
    pub fn spawn(
        feed: Arc<dyn MessageFeed>,
        user_id: String,
        partner_id: String,
        after_id: i64,
        interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            poll_loop(feed, user_id, partner_id, after_id, interval, token, tx).await;
        });

        (Self { handle, cancel }, rx)
    }

    /// Cooperative shutdown: signal cancellation, then wait at most `grace`
    /// for the task to observe it. A poller stuck in a slow fetch is
    /// detached rather than awaited forever.
    pub async fn stop(self, grace: Duration) {
        self.cancel.cancel();
        if tokio::time::timeout(grace, self.handle).await.is_err() {
            tracing::warn!("chat poller did not stop within grace period, detaching");
        }
    }
}

async fn poll_loop(
    feed: Arc<dyn MessageFeed>,
    user_id: String,
    partner_id: String,
    after_id: i64,
    interval: Duration,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<Message>,
) {
    let mut cursor = after_id;
    tracing::debug!(partner = %partner_id, cursor, "chat poller started");

    loop {
        // Cancellation interrupts the sleep, so shutdown latency is bounded
        // by an in-flight fetch only.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let batch = match feed.fetch_since(&user_id, &partner_id, cursor).await {
            Ok(batch) => batch,
            Err(err) => {
                // Transient store failures are one empty cycle, never a
                // reason to terminate.
                tracing::debug!(partner = %partner_id, "poll cycle failed: {err}");
                continue;
            }
        };

        for message in batch {
            cursor = cursor.max(message.id);
            if tx.send(message).is_err() {
                tracing::debug!(partner = %partner_id, "session receiver gone, poller exiting");
                return;
            }
        }
    }

    tracing::debug!(partner = %partner_id, cursor, "chat poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedFeed {
        batches: Mutex<VecDeque<Result<Vec<Message>, StoreError>>>,
        cursors: Mutex<Vec<i64>>,
    }

    impl ScriptedFeed {
        fn new(batches: Vec<Result<Vec<Message>, StoreError>>) -> Arc<Self> {
            Arc::new(Self {
                batches: Mutex::new(batches.into()),
                cursors: Mutex::new(Vec::new()),
            })
        }

        fn seen_cursors(&self) -> Vec<i64> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageFeed for ScriptedFeed {
        async fn fetch_since(
            &self,
            _user_id: &str,
            _partner_id: &str,
            after_id: i64,
        ) -> Result<Vec<Message>, StoreError> {
            self.cursors.lock().unwrap().push(after_id);
            self.batches
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn msg(id: i64) -> Message {
        Message {
            id,
            from_user_id: "11111111".into(),
            to_user_id: "22222222".into(),
            body: format!("message {id}"),
            created_at: chrono::Utc::now(),
        }
    }

    fn spawn(feed: Arc<ScriptedFeed>, after_id: i64) -> (ChatPoller, mpsc::UnboundedReceiver<Message>) {
        ChatPoller::spawn(
            feed,
            "22222222".into(),
            "11111111".into(),
            after_id,
            Duration::from_millis(10),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_ascending_and_advances_cursor() {
        let feed = ScriptedFeed::new(vec![
            Ok(vec![msg(1), msg(2)]),
            Ok(vec![msg(3)]),
        ]);
        let (poller, mut rx) = spawn(feed.clone(), 0);

        let ids: Vec<i64> = [rx.recv().await, rx.recv().await, rx.recv().await]
            .into_iter()
            .map(|m| m.unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);

        poller.stop(Duration::from_secs(1)).await;

        // The cursor moved past each delivered batch, so nothing is ever
        // re-fetched.
        let cursors = feed.seen_cursors();
        assert_eq!(cursors[0], 0);
        assert_eq!(cursors[1], 2);
        assert!(cursors[2..].iter().all(|&c| c == 3));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_are_one_empty_cycle() {
        let feed = ScriptedFeed::new(vec![
            Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut)),
            Err(StoreError::QueryFailed(sqlx::Error::RowNotFound)),
            Ok(vec![msg(7)]),
        ]);
        let (poller, mut rx) = spawn(feed, 0);

        // Still alive after two failed cycles and delivers on the third.
        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.id, 7);

        poller.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop() {
        let feed = ScriptedFeed::new(Vec::new());
        let (poller, mut rx) = spawn(feed, 0);

        poller.stop(Duration::from_secs(1)).await;

        // Sender dropped on exit: the channel reports closed.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cursor_seed_skips_rendered_history() {
        let feed = ScriptedFeed::new(vec![Ok(vec![msg(42)])]);
        let (poller, mut rx) = spawn(feed.clone(), 41);

        assert_eq!(rx.recv().await.unwrap().id, 42);
        poller.stop(Duration::from_secs(1)).await;

        assert_eq!(feed.seen_cursors()[0], 41);
    }
}
