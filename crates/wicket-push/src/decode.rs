//! Inbound payload classification and envelope handling.

use std::sync::Arc;

use tracing::error;

use crate::channel::{ChannelScheduler, MESSAGE_CHANNEL};
use crate::event::{EventBus, SessionEvent};
use crate::execute::{ExecutionContext, StepExecutor, StepOutcome};
use crate::Result;

/// Marker distinguishing protocol envelopes from application messages.
pub const ENVELOPE_MARKER: &str = "<ajax-response>";

/// Classify an inbound payload: `true` when it embeds a protocol envelope.
///
/// Pure substring scan; well-formedness is checked downstream, if at all.
pub fn is_envelope(message: &str) -> bool {
    message.contains(ENVELOPE_MARKER)
}

/// Downstream collaborator that parses envelope payloads and queues the
/// steps applying them.
pub trait ResponseProcessor: Send + Sync {
    /// Parse `raw` and append processing steps to `ctx`.
    ///
    /// A returned error means the payload could not be parsed; the decoder
    /// logs and drops it. The message lane is released either way.
    fn load(&self, raw: &str, ctx: &mut ExecutionContext) -> Result<()>;
}

/// Routes each raw inbound payload to subscribers or the message lane.
pub struct EnvelopeDecoder {
    scheduler: Arc<ChannelScheduler>,
    processor: Arc<dyn ResponseProcessor>,
    bus: EventBus,
}

impl EnvelopeDecoder {
    /// Create a decoder wired to its scheduler, processor and event bus.
    pub fn new(
        scheduler: Arc<ChannelScheduler>,
        processor: Arc<dyn ResponseProcessor>,
        bus: EventBus,
    ) -> Self {
        Self {
            scheduler,
            processor,
            bus,
        }
    }

    /// Handle one raw inbound payload.
    ///
    /// Application messages are republished unchanged; envelopes are
    /// scheduled on [`MESSAGE_CHANNEL`] so they never interleave with
    /// request/response cycles sharing that lane.
    pub fn route(&self, message: String) {
        if is_envelope(&message) {
            self.handle_envelope(message);
        } else {
            self.bus.publish(SessionEvent::Message { text: message });
        }
    }

    fn handle_envelope(&self, message: String) {
        let processor = Arc::clone(&self.processor);
        let scheduler = Arc::clone(&self.scheduler);
        self.scheduler.schedule(
            MESSAGE_CHANNEL,
            Box::new(move || {
                let mut ctx = ExecutionContext::new();
                if let Err(err) = processor.load(&message, &mut ctx) {
                    // Parser errors are logged and dropped; the release
                    // step below still runs.
                    error!("could not parse push envelope: {err}; payload: {message}");
                }
                // Always-reached final step: release the lane and halt.
                ctx.push_step(move |_ctx| {
                    scheduler.done(MESSAGE_CHANNEL);
                    StepOutcome::Done
                });
                StepExecutor::run(&mut ctx);
            }),
        );
    }
}
