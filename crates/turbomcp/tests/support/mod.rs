//! Loopback wiring for end-to-end tests: a `TransportSink` that hands a
//! message straight to the peer's `MessageHandler` and, if the peer answers,
//! delivers that answer straight back to the originator's own handler -
//! the same round trip a real transport would do over a socket, minus the
//! socket.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use turbomcp::prelude::*;

pub struct Loopback {
    peer: OnceLock<Arc<dyn MessageHandler>>,
    local: OnceLock<Arc<dyn MessageHandler>>,
}

impl Loopback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            peer: OnceLock::new(),
            local: OnceLock::new(),
        })
    }
}

#[async_trait]
impl TransportSink for Loopback {
    async fn send(&self, session_id: &SessionId, message: JsonRpcMessage) -> TransportResult<()> {
        let peer = self.peer.get().expect("loopback peer not wired");
        if let Some(reply) = peer.handle(session_id, message).await {
            let local = self.local.get().expect("loopback local not wired");
            local.handle(session_id, reply).await;
        }
        Ok(())
    }
}

/// Wire a [`Client`] and a [`Dispatcher`] to each other over two
/// [`Loopback`] sinks sharing one session id, and return them plus the
/// session id used.
pub fn wire(client: Arc<Client>, dispatcher: Arc<Dispatcher>) -> SessionId {
    let session_id = client.session_id().clone();

    let client_sink = Loopback::new();
    let server_sink = Loopback::new();

    client_sink.peer.set(dispatcher.clone() as Arc<dyn MessageHandler>).ok().unwrap();
    client_sink.local.set(client.clone() as Arc<dyn MessageHandler>).ok().unwrap();
    server_sink.peer.set(client.clone() as Arc<dyn MessageHandler>).ok().unwrap();
    server_sink.local.set(dispatcher.clone() as Arc<dyn MessageHandler>).ok().unwrap();

    client.set_sink(client_sink);
    dispatcher.set_sink(server_sink);

    session_id
}
