//! The socket session: owner of the one outbound push connection.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{error, info};

use crate::channel::ChannelScheduler;
use crate::config::{PageLocation, SessionConfig};
use crate::decode::{EnvelopeDecoder, ResponseProcessor};
use crate::error::PushError;
use crate::event::{EventBus, SessionEvent, Topic};
use crate::Result;

/// Write half of an established connection.
#[async_trait]
pub trait Transport: Send {
    /// Forward one text frame verbatim.
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;
}

/// Events the transport driver feeds back into the session.
#[derive(Debug)]
pub enum TransportEvent {
    /// A single text payload arrived.
    Message(String),
    /// The connection closed.
    Closed { reason: Option<String> },
    /// The transport failed.
    Errored { detail: String },
}

/// Opens connections; the seam in front of the concrete WebSocket stack.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Whether the runtime has a usable WebSocket transport at all.
    fn supported(&self) -> bool {
        true
    }

    /// Connect to `url`, returning the write half and the inbound event
    /// feed the session will pump.
    async fn connect(&self, url: &str)
        -> Result<(Box<dyn Transport>, mpsc::Receiver<TransportEvent>)>;
}

struct Inner {
    transport: Mutex<Option<Box<dyn Transport>>>,
    url: Mutex<Option<String>>,
    bus: EventBus,
    scheduler: Arc<ChannelScheduler>,
    decoder: EnvelopeDecoder,
}

/// Cloneable handle to one connection's state.
///
/// Lifecycle: constructed empty, [`initialize`](Self::initialize) derives
/// the address and opens the transport, inbound payloads are routed while
/// open, and the transport handle is discarded on any close or error so a
/// second close is an informational no-op.
#[derive(Clone)]
pub struct SocketSession {
    inner: Arc<Inner>,
}

impl SocketSession {
    /// Construct an inert session around its response processor.
    pub fn new(processor: Arc<dyn ResponseProcessor>) -> Self {
        let bus = EventBus::new();
        let scheduler = Arc::new(ChannelScheduler::new());
        let decoder = EnvelopeDecoder::new(Arc::clone(&scheduler), processor, bus.clone());
        Self {
            inner: Arc::new(Inner {
                transport: Mutex::new(None),
                url: Mutex::new(None),
                bus,
                scheduler,
                decoder,
            }),
        }
    }

    /// Subscribe to a notification topic.
    ///
    /// Registrations survive `close`; a reinitialized session publishes to
    /// the same subscribers.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<SessionEvent> {
        self.inner.bus.subscribe(topic)
    }

    /// The lane scheduler shared with the decoder.
    pub fn scheduler(&self) -> &Arc<ChannelScheduler> {
        &self.inner.scheduler
    }

    /// The resolved target address, once initialized.
    pub async fn url(&self) -> Option<String> {
        self.inner.url.lock().await.clone()
    }

    /// Derive the address, open the transport and wire its events.
    ///
    /// A runtime without WebSocket capability publishes `NotSupported` and
    /// leaves the session inert without failing. A connect failure is
    /// published under `Error` and returned.
    pub async fn initialize(
        &self,
        config: &SessionConfig,
        page: &PageLocation,
        connector: &dyn Connector,
    ) -> Result<()> {
        if !connector.supported() {
            let detail = "WebSocket is not supported in this runtime!";
            error!("[initialize] {detail}");
            self.inner.bus.publish(SessionEvent::NotSupported {
                detail: detail.to_string(),
            });
            return Ok(());
        }

        let url = config.connect_url(page);
        *self.inner.url.lock().await = Some(url.clone());

        let (transport, mut events) = match connector.connect(&url).await {
            Ok(connection) => connection,
            Err(err) => {
                error!("[initialize] could not open {url}: {err}");
                self.inner.bus.publish(SessionEvent::Error {
                    detail: err.to_string(),
                });
                return Err(err);
            }
        };

        *self.inner.transport.lock().await = Some(transport);
        info!("[initialize] connected to {url}");
        self.inner.bus.publish(SessionEvent::Opened);

        let session = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    TransportEvent::Message(text) => session.handle_message(text),
                    TransportEvent::Closed { reason } => {
                        session.handle_close(reason).await;
                        return;
                    }
                    TransportEvent::Errored { detail } => {
                        session.handle_error(detail).await;
                        return;
                    }
                }
            }
            // Feed dropped without a close frame; treat as a remote close.
            session.handle_close(None).await;
        });

        Ok(())
    }

    /// Forward `text` verbatim over the open connection.
    ///
    /// Empty text and a missing connection are logged errors, not panics;
    /// neither reaches the transport's send primitive.
    pub async fn send(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            error!("[send] Cannot send an empty text message!");
            return Err(PushError::EmptyMessage);
        }
        let mut guard = self.inner.transport.lock().await;
        match guard.as_mut() {
            Some(transport) => {
                info!("[send] Sending: {text}");
                transport.send_text(text).await
            }
            None => {
                error!("[send] No open WebSocket connection! Cannot send text message: {text}");
                Err(PushError::NotConnected)
            }
        }
    }

    /// Close the connection.
    ///
    /// A second call finds no transport handle and only logs that the
    /// connection is already closed. Subscriber registrations are kept.
    pub async fn close(&self) {
        let transport = self.inner.transport.lock().await.take();
        match transport {
            Some(mut transport) => {
                if let Err(err) = transport.close().await {
                    error!("[close] transport close failed: {err}");
                }
                info!("[close] Connection closed.");
            }
            None => info!("[close] Connection already closed."),
        }
    }

    /// Inbound payload from the transport driver.
    pub fn handle_message(&self, text: String) {
        self.inner.decoder.route(text);
    }

    /// Remote close: discard the handle, notify subscribers.
    pub async fn handle_close(&self, reason: Option<String>) {
        if let Some(mut transport) = self.inner.transport.lock().await.take() {
            let _ = transport.close().await;
        }
        self.inner.bus.publish(SessionEvent::Closed { reason });
    }

    /// Transport failure: same discard pattern, published under `Error`.
    pub async fn handle_error(&self, detail: String) {
        if let Some(mut transport) = self.inner.transport.lock().await.take() {
            let _ = transport.close().await;
        }
        self.inner.bus.publish(SessionEvent::Error { detail });
    }
}
