//! Progress notifications: `notifications/progress` (spec.md §4.16).
//!
//! Progress must be monotonic within one token, coalesced so a tight loop
//! reporting every iteration doesn't flood the wire, and the final value
//! must always get through even if an intermediate update was dropped by
//! coalescing or a transient send failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::Rng;
use tokio::time::Instant;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification};
use turbomcp_core::session::{Session, SessionId};
use turbomcp_core::transport::TransportSink;
use turbomcp_core::{McpError, ProgressToken};
use turbomcp_protocol::methods;
use turbomcp_protocol::types::ProgressNotification;

use crate::error::ServerResult;

/// Coalescing rate: at most this many sends per second per (session, token)
/// pair (spec.md §4.16 "8Hz default").
const COALESCE_HZ: f64 = 8.0;
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_millis(20);

struct TokenState {
    last_progress: f64,
    last_sent_at: Option<Instant>,
}

#[derive(Default)]
pub struct ProgressTracker {
    state: Mutex<HashMap<(SessionId, ProgressToken), TokenState>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report progress. A value lower than the last reported progress for
    /// this token is rejected rather than silently clamped (spec.md §4.16
    /// "Monotonicity"). Updates arriving faster than the coalescing rate
    /// are recorded but not sent; the next update (or `close`) carries the
    /// latest value through.
    pub async fn update(
        &self,
        sink: &dyn TransportSink,
        session: &Arc<Session>,
        token: ProgressToken,
        progress: f64,
        total: Option<f64>,
        message: Option<String>,
    ) -> ServerResult<()> {
        let key = (session.id.clone(), token.clone());
        let should_send = {
            let mut state = self.state.lock();
            let entry = state.entry(key).or_insert(TokenState { last_progress: f64::MIN, last_sent_at: None });
            if progress < entry.last_progress {
                return Err(McpError::invalid_params("progress must not regress"));
            }
            entry.last_progress = progress;

            let due = entry.last_sent_at.is_none_or(|at| at.elapsed() >= Duration::from_secs_f64(1.0 / COALESCE_HZ));
            if due {
                entry.last_sent_at = Some(Instant::now());
            }
            due
        };

        if should_send {
            self.send(sink, session, token, progress, total, message).await?;
        }
        Ok(())
    }

    /// Flush the last known value for this token unconditionally, bypassing
    /// coalescing, and drop the tracker's bookkeeping for it (spec.md §4.16
    /// "at-least-once final flush on close").
    pub async fn close(
        &self,
        sink: &dyn TransportSink,
        session: &Arc<Session>,
        token: ProgressToken,
        total: Option<f64>,
        message: Option<String>,
    ) -> ServerResult<()> {
        let key = (session.id.clone(), token.clone());
        let progress = {
            let mut state = self.state.lock();
            state.remove(&key).map(|entry| entry.last_progress)
        };
        let Some(progress) = progress else {
            return Ok(());
        };
        self.send(sink, session, token, progress, total, message).await
    }

    async fn send(
        &self,
        sink: &dyn TransportSink,
        session: &Arc<Session>,
        token: ProgressToken,
        progress: f64,
        total: Option<f64>,
        message: Option<String>,
    ) -> ServerResult<()> {
        let notification = ProgressNotification {
            progress_token: token,
            progress: Some(progress),
            total,
            message,
        };
        let wire = JsonRpcMessage::Notification(JsonRpcNotification::new(
            methods::PROGRESS,
            serde_json::to_value(&notification).ok(),
        ));

        let mut last_err = None;
        for attempt in 0..RETRY_ATTEMPTS {
            match sink.send(&session.id, wire.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    last_err = Some(err);
                    if attempt + 1 < RETRY_ATTEMPTS {
                        tokio::time::sleep(jittered_backoff(attempt)).await;
                    }
                }
            }
        }
        Err(McpError::ServiceUnavailable(format!(
            "progress notification undeliverable after {RETRY_ATTEMPTS} attempts: {}",
            last_err.expect("loop ran at least once")
        )))
    }
}

fn jittered_backoff(attempt: u32) -> Duration {
    let base = RETRY_BASE * 2u32.pow(attempt);
    let jitter = OsRng.gen_range(0.8..=1.2);
    Duration::from_secs_f64(base.as_secs_f64() * jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use turbomcp_core::transport::TransportResult;

    #[derive(Default)]
    struct CountingSink {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl TransportSink for CountingSink {
        async fn send(&self, _session_id: &SessionId, _message: JsonRpcMessage) -> TransportResult<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn session() -> Arc<Session> {
        Arc::new(Session::new(SessionId::generate()))
    }

    #[tokio::test]
    async fn first_update_always_sends() {
        let tracker = ProgressTracker::new();
        let sink = CountingSink::default();
        let session = session();
        tracker.update(&sink, &session, ProgressToken::Number(1), 10.0, Some(100.0), None).await.unwrap();
        assert_eq!(sink.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rapid_updates_are_coalesced() {
        let tracker = ProgressTracker::new();
        let sink = CountingSink::default();
        let session = session();
        let token = ProgressToken::Number(1);
        for i in 0..10 {
            tracker.update(&sink, &session, token.clone(), i as f64, None, None).await.unwrap();
        }
        assert_eq!(sink.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn regression_is_rejected() {
        let tracker = ProgressTracker::new();
        let sink = CountingSink::default();
        let session = session();
        let token = ProgressToken::Number(1);
        tracker.update(&sink, &session, token.clone(), 50.0, None, None).await.unwrap();
        let err = tracker.update(&sink, &session, token, 10.0, None, None).await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_INVALID_PARAMS);
    }

    #[tokio::test]
    async fn close_flushes_the_last_value_even_if_coalesced() {
        let tracker = ProgressTracker::new();
        let sink = CountingSink::default();
        let session = session();
        let token = ProgressToken::Number(1);
        tracker.update(&sink, &session, token.clone(), 10.0, None, None).await.unwrap();
        tracker.update(&sink, &session, token.clone(), 20.0, None, None).await.unwrap();
        assert_eq!(sink.sent.load(Ordering::SeqCst), 1);
        tracker.close(&sink, &session, token, Some(100.0), Some("done".to_string())).await.unwrap();
        assert_eq!(sink.sent.load(Ordering::SeqCst), 2);
    }
}
