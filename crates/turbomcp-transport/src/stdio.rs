//! Newline-delimited JSON over stdin/stdout (spec.md §4.2 "STDIO").
//!
//! Per the MCP spec, messages MUST NOT contain embedded newlines and all
//! non-protocol diagnostics MUST go to stderr — `tracing` already defaults
//! there, so logging from anywhere in the server is automatically safe to
//! use alongside this transport.

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{self, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, warn};
use turbomcp_core::jsonrpc::JsonRpcMessage;
use turbomcp_core::session::SessionId;
use turbomcp_core::transport::{TransportError, TransportResult, TransportSink};

use crate::MessageHandler;

type StdinReader = FramedRead<BufReader<Stdin>, LinesCodec>;
type StdoutWriter = FramedWrite<Stdout, LinesCodec>;

/// The STDIO transport. One process equals one session: there is no
/// `Mcp-Session-Id` to look up, so `TransportSink::send` ignores the session
/// id it's given and always writes to the single stdout stream.
#[derive(Debug)]
pub struct StdioTransport {
    session_id: SessionId,
    writer: Arc<Mutex<StdoutWriter>>,
    reader: Mutex<Option<StdinReader>>,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            session_id: SessionId::generate(),
            writer: Arc::new(Mutex::new(FramedWrite::new(io::stdout(), LinesCodec::new()))),
            reader: Mutex::new(Some(FramedRead::new(BufReader::new(io::stdin()), LinesCodec::new()))),
        }
    }

    /// The single session this process represents for its whole lifetime.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Read lines from stdin until EOF, dispatching each parsed frame to
    /// `handler` and writing back whatever response it returns. A line that
    /// fails to parse as JSON-RPC gets a `-32700`/`-32600` response instead
    /// of killing the loop — one malformed frame shouldn't end the session.
    pub async fn run(&self, handler: Arc<dyn MessageHandler>) -> TransportResult<()> {
        let mut reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or_else(|| TransportError::Io("stdio transport already running".to_string()))?;

        while let Some(line) = reader.next().await {
            let line = match line {
                Ok(line) => line,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!("stdin line exceeded max length, dropping");
                    continue;
                }
                Err(LinesCodecError::Io(e)) => {
                    return Err(TransportError::Io(e.to_string()));
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let message = match JsonRpcMessage::parse(&line) {
                Ok(message) => message,
                Err(error_response) => {
                    debug!("failed to parse stdin line as JSON-RPC, replying with error frame");
                    self.write_line(&JsonRpcMessage::Response(error_response)).await?;
                    continue;
                }
            };

            if let Some(response) = handler.handle(&self.session_id, message).await {
                self.write_line(&response).await?;
            }
        }

        handler.on_disconnect(&self.session_id).await;
        Ok(())
    }

    async fn write_line(&self, message: &JsonRpcMessage) -> TransportResult<()> {
        let json = serde_json::to_string(&message.to_json())
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        let mut writer = self.writer.lock().await;
        futures::SinkExt::send(&mut *writer, json)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TransportSink for StdioTransport {
    async fn send(&self, _session_id: &SessionId, message: JsonRpcMessage) -> TransportResult<()> {
        self.write_line(&message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constructs() {
        let _transport = StdioTransport::default();
    }
}
