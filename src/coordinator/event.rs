//! Operator lifecycle notifications
//!
//! Observers (the scheduler retiring pending tasks, metrics, the HTTP
//! layer) subscribe to a broadcast channel of operator events.

use crate::coordinator::split::SplitOperator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle stage of an operator.
///
/// The split path only posts `End`, since a reported split has already
/// run on the store. The other stages are for schedulers that drive
/// their own operators through an [`EventNotifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorEventKind {
    Start,
    End,
    Cancel,
    Timeout,
}

impl std::fmt::Display for OperatorEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatorEventKind::Start => write!(f, "start"),
            OperatorEventKind::End => write!(f, "end"),
            OperatorEventKind::Cancel => write!(f, "cancel"),
            OperatorEventKind::Timeout => write!(f, "timeout"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorEvent {
    pub kind: OperatorEventKind,
    pub region_id: u64,
    pub operator: Arc<SplitOperator>,
    pub timestamp: i64,
}

/// Posts operator lifecycle events to interested observers.
pub trait EventNotifier: Send + Sync {
    fn post(&self, op: Arc<SplitOperator>, kind: OperatorEventKind);
}

/// Broadcast-backed notifier.
///
/// Posting never blocks; slow subscribers lag and lose the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<OperatorEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OperatorEvent> {
        self.tx.subscribe()
    }
}

impl EventNotifier for EventBus {
    fn post(&self, op: Arc<SplitOperator>, kind: OperatorEventKind) {
        let event = OperatorEvent {
            kind,
            region_id: op.region_id(),
            operator: op,
            timestamp: chrono::Utc::now().timestamp(),
        };
        // no subscribers is fine
        let _ = self.tx.send(event);
    }
}
