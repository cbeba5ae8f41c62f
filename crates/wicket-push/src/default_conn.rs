//! Process-wide default connection.
//!
//! Static-style `send` and `close` calls route through a lazily created
//! singleton slot. Closing removes the slot, so a later [`create`] starts
//! from a fresh session with no memory of prior state; tests reset global
//! state through the same functions.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{error, info};

use crate::decode::ResponseProcessor;
use crate::error::PushError;
use crate::session::SocketSession;
use crate::Result;

static INSTANCE: Lazy<Mutex<Option<SocketSession>>> = Lazy::new(|| Mutex::new(None));

/// Create the default connection if none exists; returns the live handle.
///
/// The processor is only used when the slot is empty.
pub fn create(processor: Arc<dyn ResponseProcessor>) -> SocketSession {
    let mut slot = INSTANCE.lock();
    slot.get_or_insert_with(|| SocketSession::new(processor)).clone()
}

/// The current default connection, if any.
pub fn get() -> Option<SocketSession> {
    INSTANCE.lock().clone()
}

/// Send through the default connection.
pub async fn send(text: &str) -> Result<()> {
    match get() {
        Some(session) => session.send(text).await,
        None => {
            error!("[send] No default connection available!");
            Err(PushError::NotConnected)
        }
    }
}

/// Close and discard the default connection.
pub async fn close() {
    let session = INSTANCE.lock().take();
    match session {
        Some(session) => session.close().await,
        None => info!("[close] No default connection to close."),
    }
}
