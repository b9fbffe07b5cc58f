//! WebSocket accept loop and per-connection tasks

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use ticker_core::{ClientMessage, ServerConfig};
use ticker_hub::HubHandle;

/// WebSocket server bound to its listen address.
pub struct WsServer {
    listener: TcpListener,
    hub: HubHandle,
}

impl WsServer {
    pub async fn bind(config: &ServerConfig, hub: HubHandle) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.address()).await?;
        Ok(Self { listener, hub })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the shutdown signal fires.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) -> anyhow::Result<()> {
        info!(addr = %self.listener.local_addr()?, "websocket server listening");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    tokio::spawn(handle_connection(self.hub.clone(), stream, peer));
                }
                _ = &mut shutdown => {
                    info!("server shutdown requested");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// One task per connection for the inbound side; the outbound side gets its
/// own task draining the subscriber's quote channel. Either side failing
/// tears the connection down and unregisters the subscriber.
async fn handle_connection(hub: HubHandle, stream: TcpStream, peer: SocketAddr) {
    let socket = match accept_async(stream).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!(%peer, error = %e, "websocket handshake failed");
            return;
        }
    };

    let (id, mut quote_rx) = match hub.connect() {
        Ok(connected) => connected,
        Err(e) => {
            // Registration saturated: this client loses, others are unaffected.
            warn!(%peer, error = %e, "dropping connection, hub registration failed");
            return;
        }
    };

    debug!(%peer, id, "connection established");

    let (mut sink, mut inbound) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(quote) = quote_rx.recv().await {
            let frame = match serde_json::to_string(&quote) {
                Ok(text) => text,
                Err(e) => {
                    warn!(id, error = %e, "failed to encode quote");
                    continue;
                }
            };
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = inbound.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Subscribe { symbol }) => {
                    if let Err(e) = hub.subscribe(id, symbol) {
                        warn!(id, error = %e, "subscribe command dropped");
                    }
                }
                Err(e) => debug!(id, error = %e, "ignoring malformed client message"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // pings are answered by the protocol layer
            Err(e) => {
                debug!(id, error = %e, "read error, closing connection");
                break;
            }
        }
    }

    hub.disconnect(id);
    writer.abort();
    debug!(%peer, id, "connection closed");
}
