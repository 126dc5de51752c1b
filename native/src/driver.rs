// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The interface of a firewall driver, as seen by a firewall manager. Drivers report
//! success or failure only: the details of a failure are logged.

use crate::errors::{Operation, SequenceError, Step, catch_fault};
use crate::requests::{
    CreateFwRequest, DeleteFwRequest, FwRequestData, NetworkCreateNotif, NetworkDeleteNotif,
};
use crate::sequencer::NativeFw;
use async_trait::async_trait;
use platform::TenantId;

#[allow(unused)]
use tracing::{debug, error, info, warn};

#[async_trait]
pub trait FwDriver: Send + Sync {
    fn name(&self) -> &'static str;
    fn is_device_virtual(&self) -> bool;
    /// Max number of firewalls the driver can host
    fn max_quota(&self) -> u32;

    async fn create_fw(&self, tenant: &TenantId, data: &FwRequestData) -> bool;
    async fn delete_fw(&self, tenant: &TenantId, data: &FwRequestData) -> bool;
    async fn modify_fw(&self, tenant: &TenantId, data: &FwRequestData) -> bool;
    async fn nwk_create_notif(&self, tenant: &TenantId, notif: &NetworkCreateNotif) -> bool;
    async fn nwk_delete_notif(&self, tenant: &TenantId, notif: &NetworkDeleteNotif) -> bool;
}

fn report(tenant: &TenantId, op: Operation, result: Result<(), SequenceError>) -> bool {
    match result {
        Ok(()) => {
            info!("{op} succeeded for tenant {tenant}");
            true
        }
        Err(e) => {
            error!("Tenant {tenant}: {e}");
            false
        }
    }
}

#[async_trait]
impl FwDriver for NativeFw {
    fn name(&self) -> &'static str {
        "native"
    }
    fn is_device_virtual(&self) -> bool {
        true
    }
    fn max_quota(&self) -> u32 {
        self.config.max_quota
    }

    async fn create_fw(&self, tenant: &TenantId, data: &FwRequestData) -> bool {
        const OP: Operation = Operation::CreateFw;
        debug!("Creating firewall of tenant {tenant}: {data:?}");
        let _guard = self.locks.lock(tenant).await;
        let result = match CreateFwRequest::try_from(data) {
            Ok(request) => catch_fault(OP, self.try_create_fw(tenant, &request)).await,
            Err(source) => Err(SequenceError { op: OP, step: Step::Validate, source }),
        };
        if let Err(SequenceError { step: Step::Unexpected, .. }) = &result {
            // a failed create leaves no state, even if it crashed before the legs were attached
            self.tenants.remove(tenant);
        }
        report(tenant, OP, result)
    }

    async fn delete_fw(&self, tenant: &TenantId, data: &FwRequestData) -> bool {
        const OP: Operation = Operation::DeleteFw;
        debug!("Deleting firewall of tenant {tenant}: {data:?}");
        let _guard = self.locks.lock(tenant).await;
        let result = match DeleteFwRequest::try_from(data) {
            Ok(request) => catch_fault(OP, self.try_delete_fw(tenant, &request)).await,
            Err(source) => Err(SequenceError { op: OP, step: Step::Validate, source }),
        };
        report(tenant, OP, result)
    }

    async fn modify_fw(&self, tenant: &TenantId, data: &FwRequestData) -> bool {
        debug!("Nothing to modify for tenant {tenant}: {data:?}");
        true
    }

    async fn nwk_create_notif(&self, tenant: &TenantId, notif: &NetworkCreateNotif) -> bool {
        const OP: Operation = Operation::NetworkCreate;
        let _guard = self.locks.lock(tenant).await;
        report(tenant, OP, catch_fault(OP, self.try_nwk_create(tenant, notif)).await)
    }

    async fn nwk_delete_notif(&self, tenant: &TenantId, notif: &NetworkDeleteNotif) -> bool {
        const OP: Operation = Operation::NetworkDelete;
        let _guard = self.locks.lock(tenant).await;
        report(tenant, OP, catch_fault(OP, self.try_nwk_delete(tenant, notif)).await)
    }
}
