// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Announcement of the router ports of the service legs to the VNIC consumer

use crate::errors::FwError;
use crate::retry::{Attempt, RetryError, RetryPolicy};
use crate::sequencer::NativeFw;
use chrono::Utc;
use config::{Leg, ServiceTopology};
use platform::{
    QueuedEvent, RouterId, RouterPort, ServicePayload, TenantId, VnicEvent, VnicEventType,
    VnicStatus,
};

#[allow(unused)]
use tracing::{debug, error, info, warn};

impl NativeFw {
    /// Wait for the router port of a leg to be bound to a host. Gives up after the
    /// host-binding retries and returns the port as last seen.
    async fn bound_router_port(
        &self,
        tenant: &TenantId,
        topology: &ServiceTopology,
        leg: Leg,
    ) -> Result<RouterPort, FwError> {
        let subnet = &topology.leg(leg).subnet_id;
        let policy = RetryPolicy::from(self.config.host_binding);
        let result = policy
            .run("router port binding", move |_| async move {
                match self.platform.router_port_for_subnet(subnet).await {
                    Ok(Some(port)) if port.bound_host().is_some() => Ok(Attempt::Ready(port)),
                    Ok(Some(port)) => Ok(Attempt::Pending(port)),
                    Ok(None) => Err(FwError::PortNotFound(subnet.clone())),
                    Err(e) => Err(FwError::platform("router_port_for_subnet")(e)),
                }
            })
            .await;
        match result {
            Ok(port) => Ok(port),
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!("Port {} of tenant {tenant} still unbound after {attempts} attempts", last.port_id);
                Ok(last)
            }
            Err(RetryError::Failed(e)) => Err(e),
        }
    }

    /// Build the event announcing (or withdrawing) the router port of a leg
    pub(crate) async fn prepare_vnic_event(
        &self,
        tenant: &TenantId,
        tenant_name: &str,
        router: &RouterId,
        topology: &ServiceTopology,
        leg: Leg,
        status: VnicStatus,
    ) -> Result<VnicEvent, FwError> {
        let port = self.bound_router_port(tenant, topology, leg).await?;
        let host = match port.bound_host() {
            Some(host) => {
                self.tenants.set_bound_host(tenant, host);
                host.to_owned()
            }
            None => {
                error!("Null host for port {} of tenant {tenant}, {leg} leg", port.port_id);
                self.tenants
                    .bound_host(tenant)
                    .ok_or_else(|| FwError::HostUnresolved {
                        tenant: tenant.clone(),
                        port: port.port_id.clone(),
                    })?
            }
        };
        let vm_ip = port
            .first_ip()
            .ok_or_else(|| FwError::PortWithoutAddress(port.port_id.clone()))?;
        let service_leg = topology.leg(leg);
        Ok(VnicEvent {
            status,
            mac: port.mac,
            segment_id: service_leg.segment_id,
            host,
            port_id: port.port_id,
            network_id: service_leg.network_id.clone(),
            vm_name: self.config.vm_name(tenant_name, leg),
            vm_ip,
            vm_uuid: router.clone(),
            gw_mac: None,
            forwarding_mode: self.config.forwarding_mode.clone(),
        })
    }

    /// Submit the event of the router port of a leg to the event queue
    pub(crate) async fn send_router_port_msg(
        &self,
        tenant: &TenantId,
        tenant_name: &str,
        router: &RouterId,
        topology: &ServiceTopology,
        leg: Leg,
        status: VnicStatus,
    ) -> Result<(), FwError> {
        let failed = |reason: String| FwError::EventEmitFailed { leg, reason };
        let vnic = self
            .prepare_vnic_event(tenant, tenant_name, router, topology, leg, status)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let event = QueuedEvent {
            priority: self.config.event_priority,
            timestamp: Utc::now(),
            event_type: VnicEventType::from(status),
            payload: ServicePayload { service: vnic },
        };
        info!(
            "Sending {} for port {} of tenant {tenant} ({leg} leg, host {})",
            event.event_type, event.payload.service.port_id, event.payload.service.host
        );
        self.queue.submit(event).map_err(|e| failed(e.to_string()))
    }
}
