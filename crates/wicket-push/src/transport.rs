//! WebSocket transport driver built on tokio-tungstenite.

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::session::{Connector, Transport, TransportEvent};
use crate::Result;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Frames buffered between the reader task and the session's event pump.
const EVENT_BUFFER: usize = 64;

/// Connector backed by `tokio_tungstenite::connect_async`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn Transport>, mpsc::Receiver<TransportEvent>)> {
        let (stream, _response) = connect_async(url).await?;
        let (sink, mut reader) = stream.split();

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if event_tx.send(TransportEvent::Message(text)).await.is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let reason = frame.map(|f| f.reason.to_string());
                        let _ = event_tx.send(TransportEvent::Closed { reason }).await;
                        return;
                    }
                    Ok(other) => {
                        // Binary, ping and pong frames are not part of the
                        // push protocol.
                        debug!("ignoring non-text frame: {other:?}");
                    }
                    Err(err) => {
                        let _ = event_tx
                            .send(TransportEvent::Errored {
                                detail: err.to_string(),
                            })
                            .await;
                        return;
                    }
                }
            }
            let _ = event_tx.send(TransportEvent::Closed { reason: None }).await;
        });

        Ok((Box::new(WebSocketTransport { sink }), event_rx))
    }
}

/// Write half of an established tungstenite connection.
struct WebSocketTransport {
    sink: WsSink,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        self.sink.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.send(Message::Close(None)).await?;
        Ok(())
    }
}
