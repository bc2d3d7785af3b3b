//! Streamable HTTP transport: POST for request/response, GET for the
//! server-push SSE stream, keyed by `Mcp-Session-Id` (spec.md §4.2
//! "Streamable HTTP").
//!
//! A POST carrying `initialize` mints a new session id if the client sent
//! none; every later request on that session must echo it back. Server-
//! initiated traffic (progress, logging, sampling/elicitation/roots
//! requests) goes out over the SSE stream a client opens with `GET /mcp`
//! once it holds a session id.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use dashmap::DashMap;
use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use turbomcp_core::jsonrpc::JsonRpcMessage;
use turbomcp_core::session::SessionId;
use turbomcp_core::transport::{TransportError, TransportResult, TransportSink};
use turbomcp_protocol::PROTOCOL_VERSION;

use crate::security::{validate_host, validate_origin, OriginGuardConfig};
use crate::MessageHandler;

/// Bound on a session's SSE send buffer. A session whose reader can't keep
/// up (client stalled, network partition) fills this and the next push is
/// dropped, per spec.md §9 "bounded per-stream buffers"; `handle_sse`'s
/// cleanup on stream end is what actually reclaims a session's slot.
const SSE_BUFFER_CAPACITY: usize = 256;

pub const SESSION_ID_HEADER: &str = "mcp-session-id";
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub bind_addr: SocketAddr,
    pub origin_guard: OriginGuardConfig,
    /// When true, no `Mcp-Session-Id` is minted or required and every POST
    /// is handled independently (spec.md §4.2 "Stateless mode"). GET (SSE)
    /// is unavailable in this mode since there is no session to key it by.
    pub stateless: bool,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            origin_guard: OriginGuardConfig::default(),
            stateless: false,
        }
    }
}

type SsePush = mpsc::Sender<JsonRpcMessage>;

#[derive(Debug)]
pub struct HttpTransport {
    config: HttpTransportConfig,
    channels: DashMap<SessionId, SsePush>,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Self {
        Self {
            config,
            channels: DashMap::new(),
        }
    }

    /// Bind and serve until the process is asked to shut down. `handler`
    /// receives every parsed frame regardless of which route it arrived on.
    pub async fn serve(self: Arc<Self>, handler: Arc<dyn MessageHandler>) -> TransportResult<()> {
        let state = AppState {
            transport: self.clone(),
            handler,
        };

        let router = Router::new()
            .route("/mcp", post(handle_post).get(handle_sse))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| TransportError::Io(e.to_string()))
    }
}

#[async_trait::async_trait]
impl TransportSink for HttpTransport {
    /// Drops (rather than blocks on) a push to a session whose SSE buffer is
    /// already full — a slow reader is declared stale instead of backing up
    /// every other session's broadcast (spec.md §9 "if a session cannot keep
    /// up, it is declared stale and pruned").
    async fn send(&self, session_id: &SessionId, message: JsonRpcMessage) -> TransportResult<()> {
        let channel = self
            .channels
            .get(session_id)
            .ok_or_else(|| TransportError::SessionNotFound(session_id.clone()))?;
        match channel.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                drop(channel);
                self.channels.remove(session_id);
                Err(TransportError::SessionClosed(session_id.clone()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                drop(channel);
                self.channels.remove(session_id);
                Err(TransportError::SessionClosed(session_id.clone()))
            }
        }
    }
}

#[derive(Clone)]
struct AppState {
    transport: Arc<HttpTransport>,
    handler: Arc<dyn MessageHandler>,
}

fn client_ip(addr: &ConnectInfo<SocketAddr>) -> std::net::IpAddr {
    addr.0.ip()
}

fn check_origin(state: &AppState, headers: &HeaderMap, addr: &ConnectInfo<SocketAddr>) -> Result<(), Response> {
    let origin = headers.get("origin").and_then(|v| v.to_str().ok());
    validate_origin(&state.transport.config.origin_guard, origin, client_ip(addr)).map_err(|e| {
        warn!(error = %e, "rejected request failing origin check");
        (StatusCode::FORBIDDEN, e.to_string()).into_response()
    })?;

    let host = headers.get(axum::http::header::HOST).and_then(|v| v.to_str().ok());
    validate_host(&state.transport.config.origin_guard, host, client_ip(addr)).map_err(|e| {
        warn!(error = %e, "rejected request failing host check");
        (StatusCode::FORBIDDEN, e.to_string()).into_response()
    })
}

fn check_protocol_version(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get(PROTOCOL_VERSION_HEADER).and_then(|v| v.to_str().ok()) {
        Some(version) if version == PROTOCOL_VERSION => Ok(()),
        None => Ok(()), // absent is tolerated on the very first request
        Some(other) => {
            debug!(requested = other, supported = PROTOCOL_VERSION, "protocol version mismatch");
            Err((StatusCode::BAD_REQUEST, format!("unsupported protocol version: {other}")).into_response())
        }
    }
}

async fn handle_post(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(resp) = check_origin(&state, &headers, &ConnectInfo(addr)) {
        return resp;
    }
    if let Err(resp) = check_protocol_version(&headers) {
        return resp;
    }

    let raw = match std::str::from_utf8(&body) {
        Ok(raw) => raw,
        Err(_) => return (StatusCode::BAD_REQUEST, "body is not valid UTF-8").into_response(),
    };

    let message = match JsonRpcMessage::parse(raw) {
        Ok(message) => message,
        Err(error_response) => {
            return axum::Json(error_response.to_json()).into_response();
        }
    };

    let session_id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| SessionId::from(s.to_string()))
        .unwrap_or_else(SessionId::generate);

    let response = state.handler.handle(&session_id, message).await;

    let mut http_response = match response {
        Some(message) => axum::Json(message.to_json()).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };

    if !state.transport.config.stateless {
        if let Ok(header_value) = HeaderValue::from_str(&session_id.0) {
            http_response.headers_mut().insert(SESSION_ID_HEADER, header_value);
        }
    }

    http_response
}

/// Removes a session's SSE channel entry when the stream it backs is
/// dropped (the client disconnected, or axum tore down the response body),
/// closing the gap comment 5 in the review flagged: without this, every
/// reconnect leaked the previous channel forever.
struct SseCleanup {
    transport: Arc<HttpTransport>,
    handler: Arc<dyn MessageHandler>,
    session_id: SessionId,
}

impl Drop for SseCleanup {
    fn drop(&mut self) {
        self.transport.channels.remove(&self.session_id);
        let handler = Arc::clone(&self.handler);
        let session_id = self.session_id.clone();
        tokio::spawn(async move { handler.on_disconnect(&session_id).await });
    }
}

struct SseStream {
    inner: Pin<Box<dyn Stream<Item = Result<Event, std::convert::Infallible>> + Send>>,
    _cleanup: SseCleanup,
}

impl Stream for SseStream {
    type Item = Result<Event, std::convert::Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}

async fn handle_sse(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Sse<SseStream>, Response> {
    if state.transport.config.stateless {
        return Err((StatusCode::BAD_REQUEST, "SSE is unavailable in stateless mode").into_response());
    }
    check_origin(&state, &headers, &ConnectInfo(addr))?;

    let session_id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| SessionId::from(s.to_string()))
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "missing Mcp-Session-Id header").into_response())?;

    let (tx, rx) = mpsc::channel(SSE_BUFFER_CAPACITY);
    state.transport.channels.insert(session_id.clone(), tx);

    let inner = ReceiverStream::new(rx)
        .map(|message| {
            let json = serde_json::to_string(&message.to_json()).unwrap_or_default();
            Ok(Event::default().data(json))
        })
        .boxed();

    let stream = SseStream {
        inner,
        _cleanup: SseCleanup {
            transport: state.transport,
            handler: state.handler,
            session_id,
        },
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
