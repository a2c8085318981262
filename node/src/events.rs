//! Outbound status-transition events.
//!
//! The notification collaborator subscribes here. Delivery is
//! fire-and-forget: a send with no subscribers (or with lagging ones) is
//! dropped without ever affecting the transition that produced it. Events
//! for one item are emitted from its single checker task, so subscribers
//! observe transitions in the order they occurred.

use concord_consensus::ValidationStatus;
use concord_types::ItemId;
use tokio::sync::broadcast;

/// A status transition worth telling the outside world about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusEvent {
    /// The item's decision reached its required quorum.
    QuorumReached { item: ItemId },
    /// The item was finalized as validated.
    Validated { item: ItemId },
    /// The item was finalized as rejected.
    Rejected { item: ItemId },
}

impl StatusEvent {
    /// The terminal event for a verdict.
    pub fn finalized(item: ItemId, status: ValidationStatus) -> Option<Self> {
        match status {
            ValidationStatus::Validated => Some(Self::Validated { item }),
            ValidationStatus::Rejected => Some(Self::Rejected { item }),
            ValidationStatus::Pending => None,
        }
    }
}

/// Broadcast hub for status events.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<StatusEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; failures never propagate to the caller.
    pub fn emit(&self, event: StatusEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!(?event, "no event subscribers");
        }
    }
}
