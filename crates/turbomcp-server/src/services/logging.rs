//! Logging service: `logging/setLevel` and `notifications/message`
//! (spec.md §4.10).
//!
//! Unlike the list-changed observer registries, every session that has ever
//! been seen is a logging observer: the threshold check happens per
//! delivery, not at subscribe time.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification};
use turbomcp_core::session::{LogLevel, Session, SessionId};
use turbomcp_core::transport::TransportSink;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::{LoggingMessageNotification, SetLevelRequest, SetLevelResult};

use crate::error::ServerResult;

#[derive(Default)]
pub struct LoggingRegistry {
    sessions: Mutex<HashMap<SessionId, Weak<Session>>>,
}

impl LoggingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, session: &Arc<Session>) {
        self.sessions.lock().insert(session.id.clone(), Arc::downgrade(session));
    }

    pub fn remove(&self, session_id: &SessionId) {
        self.sessions.lock().remove(session_id);
    }

    pub fn set_level(&self, session: &Arc<Session>, request: SetLevelRequest) -> ServerResult<SetLevelResult> {
        session.set_logging_threshold(request.level);
        Ok(SetLevelResult)
    }

    /// Emit a log message. Only sessions whose threshold is at or below
    /// `level` receive it; a session whose delivery fails is pruned.
    pub async fn log(&self, sink: &dyn TransportSink, level: LogLevel, logger: Option<String>, data: serde_json::Value) {
        let recipients: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.lock();
            let mut live = Vec::new();
            sessions.retain(|_, weak| match weak.upgrade() {
                Some(session) => {
                    live.push(session);
                    true
                }
                None => false,
            });
            live
        };

        let notification = LoggingMessageNotification { level, data, logger };
        let message = JsonRpcMessage::Notification(JsonRpcNotification::new(
            methods::LOGGING_MESSAGE,
            serde_json::to_value(notification).ok(),
        ));

        for session in recipients {
            if session.logging_threshold() > level {
                continue;
            }
            if sink.send(&session.id, message.clone()).await.is_err() {
                self.remove(&session.id);
            }
        }
    }
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

    #[tokio::test]
    async fn set_level_changes_this_sessions_threshold() {
        let registry = LoggingRegistry::new();
        let session = Arc::new(Session::new(SessionId::generate()));
        registry.set_level(&session, SetLevelRequest { level: LogLevel::Debug }).unwrap();
        assert_eq!(session.logging_threshold(), LogLevel::Debug);
    }

    #[tokio::test]
    async fn delivers_only_to_sessions_at_or_below_threshold() {
        let registry = LoggingRegistry::new();
        let permissive = Arc::new(Session::new(SessionId::generate()));
        permissive.set_logging_threshold(LogLevel::Debug);
        let strict = Arc::new(Session::new(SessionId::generate()));
        strict.set_logging_threshold(LogLevel::Critical);

        registry.track(&permissive);
        registry.track(&strict);

        let sink = CountingSink::default();
        registry.log(&sink, LogLevel::Info, None, serde_json::json!("hello")).await;
        assert_eq!(sink.sent.load(Ordering::SeqCst), 1);
    }
}
