//! Client-side bridge for Wicket native WebSocket push.
//!
//! A session opens one persistent WebSocket to the server and distinguishes
//! two payload shapes arriving over it: opaque application messages, which
//! are republished to subscribers, and embedded request/response envelopes,
//! which are fed into a strictly-ordered execution lane so server pushes
//! never interleave with client-initiated cycles sharing the same lane.

pub mod channel;
pub mod config;
pub mod decode;
pub mod default_conn;
pub mod error;
pub mod event;
pub mod execute;
pub mod session;
pub mod transport;

pub use channel::{ChannelScheduler, Task, MESSAGE_CHANNEL};
pub use config::{ConnectionTarget, PageLocation, SessionConfig};
pub use decode::{is_envelope, EnvelopeDecoder, ResponseProcessor, ENVELOPE_MARKER};
pub use error::PushError;
pub use event::{EventBus, SessionEvent, Topic};
pub use execute::{ExecutionContext, Step, StepExecutor, StepOutcome};
pub use session::{Connector, SocketSession, Transport, TransportEvent};
pub use transport::WebSocketConnector;

/// Result type for push bridge operations.
pub type Result<T> = std::result::Result<T, PushError>;
