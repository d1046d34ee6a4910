use log::error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::message::Event;

/// Producer side of the aggregator's inbound queue.
///
/// Pushing never waits on the aggregator, even while it is flushing.
#[derive(Clone)]
pub struct EventQueue {
    tx: UnboundedSender<Event>,
}

pub fn channel() -> (EventQueue, UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventQueue { tx }, rx)
}

impl EventQueue {
    /// Queues an event for the next flush window. Returns `false` once the
    /// aggregator has stopped.
    pub fn push(&self, event: Event) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Failed to queue {} event (aggregator stopped)",
                    e.0.entity_type()
                );
                false
            }
        }
    }
}
