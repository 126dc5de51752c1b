// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use parking_lot::Mutex;
use platform::{EventQueue, PriorityEventQueue, QueueError, QueuedEvent, VnicStatus};
use std::collections::BTreeSet;

/// An [`EventQueue`] that remembers what was submitted, in submission order, and forwards the
/// accepted events to a [`PriorityEventQueue`] for consumer-side checks
#[derive(Default)]
pub struct RecordingQueue {
    submitted: Mutex<Vec<QueuedEvent>>,
    /// 0-based indexes of the submissions to reject
    rejected: Mutex<BTreeSet<usize>>,
    reject_all: Mutex<bool>,
    inner: PriorityEventQueue,
}

impl RecordingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Reject the n-th submission (0-based, counting every submission)
    pub fn reject_nth(&self, n: usize) {
        self.rejected.lock().insert(n);
    }
    pub fn reject_all(&self, reject: bool) {
        *self.reject_all.lock() = reject;
    }

    /// Every submission, accepted or not
    #[must_use]
    pub fn submitted(&self) -> Vec<QueuedEvent> {
        self.submitted.lock().clone()
    }
    /// `(vm_name, status)` of every submission
    #[must_use]
    pub fn summary(&self) -> Vec<(String, VnicStatus)> {
        self.submitted
            .lock()
            .iter()
            .map(|e| (e.payload.service.vm_name.clone(), e.payload.service.status))
            .collect()
    }
    /// The queue holding the accepted events
    #[must_use]
    pub fn queue(&self) -> &PriorityEventQueue {
        &self.inner
    }
}

impl EventQueue for RecordingQueue {
    fn submit(&self, event: QueuedEvent) -> Result<(), QueueError> {
        let index = {
            let mut submitted = self.submitted.lock();
            submitted.push(event.clone());
            submitted.len() - 1
        };
        if *self.reject_all.lock() || self.rejected.lock().contains(&index) {
            return Err(QueueError::Closed);
        }
        self.inner.submit(event)
    }
}
