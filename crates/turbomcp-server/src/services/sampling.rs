//! Sampling service: server-initiated `sampling/createMessage` (spec.md
//! §4.12).
//!
//! Requests to the peer are bounded by a concurrency semaphore and guarded
//! by a circuit breaker so a client that starts failing sampling calls
//! doesn't get hammered with more of them; grounded on the same
//! half-open-probe shape as `turbomcp-auth`'s bearer-token validation
//! backoff.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponsePayload};
use turbomcp_core::session::Session;
use turbomcp_core::transport::TransportSink;
use turbomcp_core::McpError;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::{CreateMessageRequest, CreateMessageResult};

use crate::error::ServerResult;

const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const FAILURE_THRESHOLD: u32 = 3;
const OPEN_DURATION: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

/// Three-state circuit breaker (closed / open / half-open) over consecutive
/// sampling failures (spec.md §4.12 "Circuit breaker").
struct CircuitBreaker {
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    opened_at: parking_lot::Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(CircuitState::Closed as u8),
            consecutive_failures: AtomicU32::new(0),
            opened_at: parking_lot::Mutex::new(None),
        }
    }

    /// Whether a call may proceed right now. An open breaker past its
    /// cool-down transitions to half-open and allows exactly this one probe
    /// through.
    fn allow(&self) -> bool {
        match CircuitState::from_u8(self.state.load(Ordering::SeqCst)) {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self.opened_at.lock().map(|at| at.elapsed()).unwrap_or_default();
                if elapsed >= OPEN_DURATION {
                    self.state.store(CircuitState::HalfOpen as u8, Ordering::SeqCst);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.state.store(CircuitState::Closed as u8, Ordering::SeqCst);
        *self.opened_at.lock() = None;
    }

    fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= FAILURE_THRESHOLD {
            self.state.store(CircuitState::Open as u8, Ordering::SeqCst);
            *self.opened_at.lock() = Some(Instant::now());
        }
    }
}

pub struct SamplingService {
    semaphore: Arc<Semaphore>,
    breaker: CircuitBreaker,
    timeout: Duration,
}

impl Default for SamplingService {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT)
    }
}

impl SamplingService {
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            breaker: CircuitBreaker::new(),
            timeout,
        }
    }

    /// Send `sampling/createMessage` to the session's peer and await the
    /// result. Rejects immediately if the peer never advertised the
    /// sampling capability, or if the breaker is open.
    pub async fn create_message(
        &self,
        sink: &dyn TransportSink,
        session: &Arc<Session>,
        request: CreateMessageRequest,
    ) -> ServerResult<CreateMessageResult> {
        if !session.client_capabilities().sampling {
            return Err(McpError::MethodNotFound(methods::SAMPLING_CREATE_MESSAGE.to_string()));
        }

        if !self.breaker.allow() {
            return Err(McpError::ServiceUnavailable("sampling circuit breaker is open".to_string()));
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| McpError::Internal("sampling semaphore closed".to_string()))?;

        let (id, receiver) = session.begin_outbound();
        let params = serde_json::to_value(&request).map_err(|e| McpError::Internal(format!("sampling request did not serialize: {e}")))?;
        let wire = JsonRpcMessage::Request(JsonRpcRequest::new(methods::SAMPLING_CREATE_MESSAGE, Some(params), id.clone()));

        if sink.send(&session.id, wire).await.is_err() {
            session.abandon_outbound(&id);
            self.breaker.record_failure();
            return Err(McpError::ServiceUnavailable("failed to deliver sampling request".to_string()));
        }

        let outcome = tokio::time::timeout(self.timeout, receiver).await;
        match outcome {
            Ok(Ok(JsonRpcResponsePayload::Success { result })) => {
                self.breaker.record_success();
                serde_json::from_value(result).map_err(|e| McpError::Internal(format!("malformed sampling result: {e}")))
            }
            Ok(Ok(JsonRpcResponsePayload::Error { error })) => {
                self.breaker.record_failure();
                Err(McpError::InvalidParamsWithData(error.message, serde_json::json!({"code": error.code})))
            }
            Ok(Err(_)) => {
                self.breaker.record_failure();
                Err(McpError::Internal("sampling response channel dropped".to_string()))
            }
            Err(_) => {
                session.abandon_outbound(&id);
                self.breaker.record_failure();
                Err(McpError::ServiceUnavailable("sampling request timed out".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use turbomcp_core::session::{ClientCapabilitySnapshot, SessionId};
    use turbomcp_core::transport::TransportResult;
    use turbomcp_core::types::{ContentBlock, Role};
    use turbomcp_protocol::types::SamplingMessage;

    struct EchoClientSink;

    #[async_trait]
    impl TransportSink for EchoClientSink {
        async fn send(&self, _session_id: &SessionId, _message: JsonRpcMessage) -> TransportResult<()> {
            Ok(())
        }
    }

    fn sample_request() -> CreateMessageRequest {
        CreateMessageRequest {
            messages: vec![SamplingMessage { role: Role::User, content: ContentBlock::text("hi") }],
            model_preferences: None,
            system_prompt: None,
            include_context: None,
            temperature: None,
            max_tokens: 16,
            stop_sequences: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn rejects_when_client_never_advertised_sampling() {
        let service = SamplingService::default();
        let session = Arc::new(Session::new(SessionId::generate()));
        let err = service.create_message(&EchoClientSink, &session, sample_request()).await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn times_out_when_no_response_arrives() {
        let service = SamplingService::new(4, Duration::from_millis(20));
        let session = Arc::new(Session::new(SessionId::generate()));
        session.set_client_capabilities(ClientCapabilitySnapshot { sampling: true, ..Default::default() });

        let err = service.create_message(&EchoClientSink, &session, sample_request()).await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn breaker_opens_after_consecutive_failures() {
        let service = SamplingService::new(4, Duration::from_millis(10));
        let session = Arc::new(Session::new(SessionId::generate()));
        session.set_client_capabilities(ClientCapabilitySnapshot { sampling: true, ..Default::default() });

        for _ in 0..FAILURE_THRESHOLD {
            let _ = service.create_message(&EchoClientSink, &session, sample_request()).await;
        }
        let err = service.create_message(&EchoClientSink, &session, sample_request()).await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_SERVICE_UNAVAILABLE);
    }
}
