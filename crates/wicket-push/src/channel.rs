//! Named execution lanes with at-most-one-in-flight ordering.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// The lane all push envelopes are processed on. The name is shared with
/// the collaborating response processor; the `|s` suffix is part of the
/// wire constant, not parsed by the scheduler.
pub const MESSAGE_CHANNEL: &str = "websocketMessage|s";

/// A queued unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Lane {
    busy: bool,
    queue: VecDeque<Task>,
}

/// Serializes tasks on named lanes so at most one per lane is in flight.
///
/// A running task owns its lane until [`ChannelScheduler::done`] is called
/// for that lane. A task that never calls `done` starves the lane; that is
/// the caller's responsibility to avoid.
#[derive(Default)]
pub struct ChannelScheduler {
    lanes: Mutex<HashMap<String, Lane>>,
}

impl ChannelScheduler {
    /// Create a scheduler with no lanes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task on the named lane.
    ///
    /// Runs the task in the current call when the lane is idle; otherwise
    /// it waits FIFO behind every previously scheduled task.
    pub fn schedule(&self, channel: &str, task: Task) {
        let runnable = {
            let mut lanes = self.lanes.lock();
            let lane = lanes.entry(channel.to_string()).or_default();
            if lane.busy {
                lane.queue.push_back(task);
                debug!(
                    "channel {} busy, task queued at position {}",
                    channel,
                    lane.queue.len()
                );
                None
            } else {
                lane.busy = true;
                Some(task)
            }
        };
        if let Some(task) = runnable {
            task();
        }
    }

    /// Release the lane and start the next queued task in the same turn.
    pub fn done(&self, channel: &str) {
        let next = {
            let mut lanes = self.lanes.lock();
            match lanes.get_mut(channel) {
                Some(lane) => {
                    let next = lane.queue.pop_front();
                    if next.is_none() {
                        lane.busy = false;
                    }
                    next
                }
                None => {
                    warn!("done() called for unknown channel {}", channel);
                    None
                }
            }
        };
        if let Some(task) = next {
            task();
        }
    }

    /// Whether a task currently owns the lane.
    pub fn is_busy(&self, channel: &str) -> bool {
        self.lanes.lock().get(channel).is_some_and(|lane| lane.busy)
    }

    /// Tasks waiting behind the in-flight one.
    pub fn queued(&self, channel: &str) -> usize {
        self.lanes
            .lock()
            .get(channel)
            .map_or(0, |lane| lane.queue.len())
    }
}
