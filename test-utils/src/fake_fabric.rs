// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::fault::{Fault, Injected, Verdict};
use async_trait::async_trait;
use parking_lot::Mutex;
use platform::{FabricController, FabricError, StaticRouteUpdate};

/// A [`FabricController`] recording the static-route updates it gets
#[derive(Default)]
pub struct FakeFabric {
    updates: Mutex<Vec<StaticRouteUpdate>>,
    fault: Mutex<Option<Injected>>,
}

impl FakeFabric {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    pub fn fail(&self, fault: Fault) {
        *self.fault.lock() = Some(Injected::new(fault));
    }
    pub fn heal(&self) {
        *self.fault.lock() = None;
    }
    /// Every update received, including the failed ones
    #[must_use]
    pub fn updates(&self) -> Vec<StaticRouteUpdate> {
        self.updates.lock().clone()
    }
    #[must_use]
    pub fn count(&self) -> usize {
        self.updates.lock().len()
    }
}

#[async_trait]
impl FabricController for FakeFabric {
    async fn update_static_routes(&self, update: &StaticRouteUpdate) -> Result<(), FabricError> {
        self.updates.lock().push(update.clone());
        let verdict = self
            .fault
            .lock()
            .as_mut()
            .map_or(Verdict::Pass, Injected::verdict);
        match verdict {
            Verdict::Pass => Ok(()),
            Verdict::Fail | Verdict::NotReady => Err(FabricError::Rejected {
                op: "update_static_routes",
                reason: "injected failure".to_string(),
            }),
            Verdict::Panic => panic!("injected panic in update_static_routes"),
        }
    }
}
