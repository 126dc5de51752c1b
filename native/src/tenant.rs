// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-tenant state of the service and per-tenant serialization of operations.

use parking_lot::Mutex;
use platform::{RouterId, TenantId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

#[allow(unused)]
use tracing::{debug, warn};

/// What the service remembers about a tenant whose firewall is (being) set up
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TenantServiceState {
    pub router_id: Option<RouterId>,
    /// last host a router port of the tenant was seen bound to
    pub bound_host: Option<String>,
}

/// The tenant states, keyed by tenant id
#[derive(Debug, Default)]
pub struct TenantStateTable(Mutex<HashMap<TenantId, TenantServiceState>>);

impl TenantStateTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh state for a tenant, replacing any previous one
    pub fn create(&self, tenant: &TenantId, router_id: Option<RouterId>) {
        let state = TenantServiceState {
            router_id,
            bound_host: None,
        };
        if self.0.lock().insert(tenant.clone(), state).is_some() {
            debug!("Replaced state of tenant {tenant}");
        }
    }

    /// Create the state of a tenant if it has none. Returns true if it was created.
    pub fn ensure(&self, tenant: &TenantId, router_id: Option<RouterId>) -> bool {
        let mut table = self.0.lock();
        if table.contains_key(tenant) {
            return false;
        }
        table.insert(
            tenant.clone(),
            TenantServiceState {
                router_id,
                bound_host: None,
            },
        );
        true
    }

    #[must_use]
    pub fn get(&self, tenant: &TenantId) -> Option<TenantServiceState> {
        self.0.lock().get(tenant).cloned()
    }
    #[must_use]
    pub fn router_id(&self, tenant: &TenantId) -> Option<RouterId> {
        self.0.lock().get(tenant).and_then(|s| s.router_id.clone())
    }
    #[must_use]
    pub fn bound_host(&self, tenant: &TenantId) -> Option<String> {
        self.0.lock().get(tenant).and_then(|s| s.bound_host.clone())
    }

    /// Remember the host of a tenant. Returns false if the tenant has no state.
    pub fn set_bound_host(&self, tenant: &TenantId, host: &str) -> bool {
        match self.0.lock().get_mut(tenant) {
            Some(state) => {
                state.bound_host = Some(host.to_owned());
                true
            }
            None => {
                warn!("Not caching host {host}: tenant {tenant} has no state");
                false
            }
        }
    }

    pub fn remove(&self, tenant: &TenantId) -> Option<TenantServiceState> {
        self.0.lock().remove(tenant)
    }
    #[must_use]
    pub fn contains(&self, tenant: &TenantId) -> bool {
        self.0.lock().contains_key(tenant)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

/// One async lock per tenant. Operations on the same tenant run one at a time,
/// operations on distinct tenants do not wait for each other.
#[derive(Debug, Default)]
pub struct TenantLocks(Mutex<HashMap<TenantId, Arc<tokio::sync::Mutex<()>>>>);

impl TenantLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a tenant. Access is released when the guard is dropped.
    pub async fn lock(&self, tenant: &TenantId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.0.lock();
            // a lock nobody holds or waits for is only referenced by the map
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(tenant.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of tenants with a lock in use
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}
