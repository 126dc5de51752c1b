// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The event queue feeding the VNIC auto-configuration. Lower numeric priorities
//! are served first; events of equal priority are served in submission order.

use crate::event::{ServicePayload, VnicEventType};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::hash::{Hash, Hasher};
use tokio::sync::Notify;

#[allow(unused)]
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Event queue is closed")]
    Closed,
    #[error("Event queue is full ({0} events)")]
    Full(usize),
}

/// An event, as submitted to an [`EventQueue`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedEvent {
    pub priority: u32,
    pub timestamp: DateTime<Utc>,
    pub event_type: VnicEventType,
    pub payload: ServicePayload,
}

/// A sink of events. Submission never blocks.
pub trait EventQueue: Send + Sync {
    fn submit(&self, event: QueuedEvent) -> Result<(), QueueError>;
}

/// Queue entries are unique by sequence number, whatever the event.
struct Pending {
    seq: u64,
    event: QueuedEvent,
}
impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}
impl Eq for Pending {}
impl Hash for Pending {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.seq.hash(state);
    }
}

// max-heap: reverse (priority, seq) so that the lowest of both pops first
type Rank = Reverse<(u32, u64)>;

#[derive(Default)]
struct QueueState {
    queue: PriorityQueue<Pending, Rank>,
    next_seq: u64,
    closed: bool,
}

/// In-process [`EventQueue`]
#[derive(Default)]
pub struct PriorityEventQueue {
    state: Mutex<QueueState>,
    limit: Option<usize>,
    notify: Notify,
}

impl PriorityEventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue refusing submissions beyond `limit` pending events
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    /// Refuse further submissions. Pending events can still be drained.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Take the next event, if any
    pub fn try_pop(&self) -> Option<QueuedEvent> {
        self.state.lock().queue.pop().map(|(pending, _)| pending.event)
    }

    /// Wait for the next event. Returns `None` once the queue is closed and drained.
    pub async fn recv(&self) -> Option<QueuedEvent> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if let Some((pending, _)) = state.queue.pop() {
                    return Some(pending.event);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }
}

impl EventQueue for PriorityEventQueue {
    fn submit(&self, event: QueuedEvent) -> Result<(), QueueError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            if let Some(limit) = self.limit
                && state.queue.len() >= limit
            {
                warn!("Dropping {} event: queue is full", event.event_type);
                return Err(QueueError::Full(limit));
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            trace!(
                "Queued {} event with priority {} as #{seq}",
                event.event_type, event.priority
            );
            let rank = Reverse((event.priority, seq));
            state.queue.push(Pending { seq, event }, rank);
        }
        self.notify.notify_one();
        Ok(())
    }
}
