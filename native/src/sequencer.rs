// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The native firewall sequencer. It inserts a firewall between the two service legs
//! of a tenant by attaching the legs to the tenant router, steering traffic through them
//! and announcing the router ports to the VNIC auto-configuration consumer.

use crate::errors::{AtStep, FwError, Operation, SequenceError, Step, catch_fault};
use crate::requests::{CreateFwRequest, DeleteFwRequest, NetworkCreateNotif, NetworkDeleteNotif};
use crate::retry::{Attempt, RetryError, RetryPolicy};
use crate::tenant::{TenantLocks, TenantServiceState, TenantStateTable};
use config::{ConfigError, FwConfig, Leg, ServiceTopology, TopologySource};
use derive_builder::Builder;
use platform::{
    EventQueue, FabricController, NetworkPlatform, PlatformError, RouterId, StaticRouteUpdate,
    TenantId, VnicStatus,
};
use std::net::Ipv4Addr;
use std::sync::Arc;

#[allow(unused)]
use tracing::{debug, error, info, warn};

/// Everything a [`NativeFw`] needs
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct NativeFwParams {
    #[builder(default)]
    pub config: FwConfig,
    pub topology: Arc<dyn TopologySource>,
    pub platform: Arc<dyn NetworkPlatform>,
    pub fabric: Arc<dyn FabricController>,
    pub queue: Arc<dyn EventQueue>,
}

pub struct NativeFw {
    pub(crate) config: FwConfig,
    topology: Arc<dyn TopologySource>,
    pub(crate) platform: Arc<dyn NetworkPlatform>,
    fabric: Arc<dyn FabricController>,
    pub(crate) queue: Arc<dyn EventQueue>,
    pub(crate) tenants: TenantStateTable,
    pub(crate) locks: TenantLocks,
}

impl NativeFw {
    /// Create a sequencer. Fails if the configuration is not valid.
    pub fn new(params: NativeFwParams) -> Result<Self, ConfigError> {
        params.config.validate()?;
        Ok(Self {
            config: params.config,
            topology: params.topology,
            platform: params.platform,
            fabric: params.fabric,
            queue: params.queue,
            tenants: TenantStateTable::new(),
            locks: TenantLocks::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &FwConfig {
        &self.config
    }

    /// The state kept for a tenant, if any
    #[must_use]
    pub fn tenant_state(&self, tenant: &TenantId) -> Option<TenantServiceState> {
        self.tenants.get(tenant)
    }

    fn service_topology(&self, tenant: &TenantId) -> Result<ServiceTopology, FwError> {
        Ok(self.topology.service_topology(tenant)?)
    }

    /// The router of a tenant: the one we remember or else the one named after the tenant
    pub(crate) async fn router_id(
        &self,
        tenant: &TenantId,
        tenant_name: &str,
    ) -> Result<RouterId, FwError> {
        if let Some(router) = self.tenants.router_id(tenant) {
            return Ok(router);
        }
        let name = self.config.router_name(tenant_name);
        let routers = self
            .platform
            .find_router_by_name(&name)
            .await
            .map_err(FwError::platform("find_router_by_name"))?;
        if routers.len() > 1 {
            warn!("Found {} routers named {name}, using the first", routers.len());
        }
        let router = routers
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| FwError::RouterNotFound(tenant.clone()))?;
        debug!("Router of tenant {tenant} is {router}");
        Ok(router)
    }

    async fn detach_interfaces(
        &self,
        tenant: &TenantId,
        tenant_name: &str,
        topology: &ServiceTopology,
    ) -> Result<(), FwError> {
        let router = self.router_id(tenant, tenant_name).await?;
        self.platform
            .detach_router_interfaces(tenant_name, tenant, &router, &topology.subnet_ids())
            .await
            .map_err(FwError::platform("detach_router_interfaces"))?;
        debug!("Detached service legs of tenant {tenant} from router {router}");
        Ok(())
    }

    /// Push to the fabric the static routes of the service partition: all the tenant subnets
    /// but the service legs, via the service node.
    async fn push_static_routes(
        &self,
        tenant: &TenantId,
        tenant_name: &str,
        topology: &ServiceTopology,
        exclude_partition: bool,
    ) -> Result<(), FwError> {
        let subnets = self
            .platform
            .subnets_excluding(tenant, &topology.exclusion_list(), exclude_partition)
            .await
            .map_err(FwError::platform("subnets_excluding"))?;
        let update = StaticRouteUpdate {
            tenant_name: tenant_name.to_owned(),
            partition_name: self.config.service_partition.clone(),
            subnets,
            vrf_profile: self.config.service_partition_vrf_profile.clone(),
            service_node_ip: topology.service_node_ip,
        };
        debug!("Pushing static routes: {update}");
        self.fabric.update_static_routes(&update).await?;
        Ok(())
    }

    async fn program_default_gateway(
        &self,
        tenant: &TenantId,
        router: &RouterId,
        gateway: Ipv4Addr,
    ) -> Result<(), FwError> {
        let policy = RetryPolicy::from(self.config.default_gateway);
        policy
            .run("default gateway", move |attempt| async move {
                match self
                    .platform
                    .program_default_gateway(tenant, router, gateway)
                    .await
                {
                    Ok(()) => Ok(Attempt::Ready(())),
                    Err(e @ PlatformError::NotReady(_)) => {
                        warn!("Attempt {attempt} to set gateway {gateway} on router {router}: {e}");
                        Ok(Attempt::Pending(e))
                    }
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => FwError::RetryExhausted {
                    what: "default gateway",
                    attempts,
                    last: last.to_string(),
                },
                RetryError::Failed(source) => FwError::PlatformCallFailed {
                    op: "program_default_gateway",
                    source,
                },
            })
    }

    pub(crate) async fn try_create_fw(
        &self,
        tenant: &TenantId,
        request: &CreateFwRequest,
    ) -> Result<(), SequenceError> {
        const OP: Operation = Operation::CreateFw;
        let topology = self
            .service_topology(tenant)
            .at(OP, Step::ResolveTopology)?;

        self.platform
            .attach_router_interfaces(&request.router_id, tenant, &topology.subnet_ids())
            .await
            .map_err(FwError::platform("attach_router_interfaces"))
            .at(OP, Step::AttachInterfaces)?;
        self.tenants.create(tenant, Some(request.router_id.clone()));

        if let Err(e) = catch_fault(OP, self.provision(tenant, request, &topology)).await {
            self.unwind_create(tenant, request, &topology, e.step).await;
            return Err(e);
        }
        Ok(())
    }

    /// Everything `create` does once the legs are attached
    async fn provision(
        &self,
        tenant: &TenantId,
        request: &CreateFwRequest,
        topology: &ServiceTopology,
    ) -> Result<(), SequenceError> {
        const OP: Operation = Operation::CreateFw;
        let router = &request.router_id;
        let name = request.tenant_name.as_str();

        self.push_static_routes(tenant, name, topology, false)
            .await
            .at(OP, Step::StaticRoutes)?;

        match topology.out_leg.gateway {
            Some(gw) => self
                .program_default_gateway(tenant, router, gw)
                .await
                .at(OP, Step::DefaultGateway)?,
            None => debug!("Out leg of tenant {tenant} has no gateway: not setting default route"),
        }

        match topology.in_leg.gateway {
            Some(gw) => self
                .platform
                .program_next_hop_for_all(tenant, router, gw, &topology.exclusion_list())
                .await
                .map_err(FwError::platform("program_next_hop_for_all"))
                .at(OP, Step::NextHops)?,
            None => debug!("In leg of tenant {tenant} has no gateway: not steering tenant networks"),
        }

        self.send_router_port_msg(tenant, name, router, topology, Leg::In, VnicStatus::Up)
            .await
            .at(OP, Step::InLegUp)?;
        self.send_router_port_msg(tenant, name, router, topology, Leg::Out, VnicStatus::Up)
            .await
            .at(OP, Step::OutLegUp)?;
        Ok(())
    }

    /// Undo a partially done `create`. Failures here are only logged.
    async fn unwind_create(
        &self,
        tenant: &TenantId,
        request: &CreateFwRequest,
        topology: &ServiceTopology,
        failed: Step,
    ) {
        let name = request.tenant_name.as_str();
        warn!("Rolling back firewall of tenant {tenant} after failure at {failed}");
        if failed == Step::OutLegUp {
            let router = &request.router_id;
            if let Err(e) = self
                .send_router_port_msg(tenant, name, router, topology, Leg::In, VnicStatus::Down)
                .await
            {
                error!("Rollback of tenant {tenant}: could not withdraw in leg: {e}");
            }
        }
        if let Err(e) = self.detach_interfaces(tenant, name, topology).await {
            error!("Rollback of tenant {tenant}: could not detach service legs: {e}");
        }
        self.tenants.remove(tenant);
    }

    pub(crate) async fn try_delete_fw(
        &self,
        tenant: &TenantId,
        request: &DeleteFwRequest,
    ) -> Result<(), SequenceError> {
        const OP: Operation = Operation::DeleteFw;
        let router = &request.router_id;
        let name = request.tenant_name.as_str();
        let topology = self
            .service_topology(tenant)
            .at(OP, Step::ResolveTopology)?;

        if self.tenants.ensure(tenant, Some(router.clone())) {
            info!("No state for tenant {tenant}: tearing down with router {router}");
        }
        for leg in [Leg::In, Leg::Out] {
            if let Err(e) = self
                .send_router_port_msg(tenant, name, router, &topology, leg, VnicStatus::Down)
                .await
            {
                error!("Teardown of tenant {tenant} goes on without withdrawing {leg} leg: {e}");
            }
        }
        self.detach_interfaces(tenant, name, &topology)
            .await
            .at(OP, Step::DetachInterfaces)?;
        self.tenants.remove(tenant);
        Ok(())
    }

    /// The in-leg gateway, required to steer networks through the firewall
    fn steering_gateway(tenant: &TenantId, topology: &ServiceTopology) -> Result<Ipv4Addr, FwError> {
        topology.in_leg.gateway.ok_or_else(|| {
            FwError::TopologyUnresolved(format!("in leg of tenant {tenant} has no gateway"))
        })
    }

    pub(crate) async fn try_nwk_create(
        &self,
        tenant: &TenantId,
        notif: &NetworkCreateNotif,
    ) -> Result<(), SequenceError> {
        const OP: Operation = Operation::NetworkCreate;
        let name = notif.tenant_name.as_str();
        let router = self
            .router_id(tenant, name)
            .await
            .at(OP, Step::ResolveRouter)?;
        let topology = self
            .service_topology(tenant)
            .at(OP, Step::ResolveTopology)?;
        let gateway = Self::steering_gateway(tenant, &topology).at(OP, Step::ResolveTopology)?;

        self.push_static_routes(tenant, name, &topology, true)
            .await
            .at(OP, Step::StaticRoutes)?;
        self.platform
            .program_next_hop(&router, gateway, notif.cidr)
            .await
            .map_err(FwError::platform("program_next_hop"))
            .at(OP, Step::NextHop)?;
        debug!("Network {} of tenant {tenant} now routed via {gateway}", notif.cidr);
        Ok(())
    }

    pub(crate) async fn try_nwk_delete(
        &self,
        tenant: &TenantId,
        notif: &NetworkDeleteNotif,
    ) -> Result<(), SequenceError> {
        const OP: Operation = Operation::NetworkDelete;
        let name = notif.tenant_name.as_str();
        let router = self
            .router_id(tenant, name)
            .await
            .at(OP, Step::ResolveRouter)?;
        let topology = self
            .service_topology(tenant)
            .at(OP, Step::ResolveTopology)?;
        let gateway = Self::steering_gateway(tenant, &topology).at(OP, Step::ResolveTopology)?;

        self.push_static_routes(tenant, name, &topology, true)
            .await
            .at(OP, Step::StaticRoutes)?;

        let exclude = topology.exclusion_list();
        let remaining = self
            .platform
            .subnets_excluding(tenant, &exclude, true)
            .await
            .map_err(FwError::platform("subnets_excluding"))
            .at(OP, Step::NextHop)?;
        self.platform
            .remove_next_hop(&router, gateway, &remaining, &exclude)
            .await
            .map_err(FwError::platform("remove_next_hop"))
            .at(OP, Step::NextHop)?;
        debug!("Removed route of network {} of tenant {tenant}", notif.network_id);
        Ok(())
    }
}
