// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The virtual network platform: routers, their interfaces and their routes.

use crate::ids::{PortId, RouterId, SubnetId, TenantId};
use async_trait::async_trait;
use ipnet::Ipv4Net;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Platform rejected {op}: {reason}")]
    Rejected { op: &'static str, reason: String },
    #[error("{0} is not ready")]
    NotReady(String),
    #[error("No such router {0}")]
    NoSuchRouter(RouterId),
    #[error("No such subnet {0}")]
    NoSuchSubnet(SubnetId),
    #[error("Platform unreachable: {0}")]
    Unreachable(String),
}

/// A router port, as found on a subnet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouterPort {
    pub port_id: PortId,
    pub mac: String,
    /// host the port is bound to. Empty or absent until the binding completes.
    pub host: Option<String>,
    pub fixed_ips: Vec<Ipv4Addr>,
}

impl RouterPort {
    /// The host this port is bound to, if the binding is complete
    #[must_use]
    pub fn bound_host(&self) -> Option<&str> {
        self.host.as_deref().filter(|h| !h.is_empty())
    }
    #[must_use]
    pub fn first_ip(&self) -> Option<Ipv4Addr> {
        self.fixed_ips.first().copied()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouterInfo {
    pub id: RouterId,
    pub name: String,
}

#[async_trait]
pub trait NetworkPlatform: Send + Sync {
    /// Add one interface per subnet to the router
    async fn attach_router_interfaces(
        &self,
        router: &RouterId,
        tenant: &TenantId,
        subnets: &BTreeSet<SubnetId>,
    ) -> Result<(), PlatformError>;

    /// Remove the interfaces of the router on the given subnets
    async fn detach_router_interfaces(
        &self,
        tenant_name: &str,
        tenant: &TenantId,
        router: &RouterId,
        subnets: &BTreeSet<SubnetId>,
    ) -> Result<(), PlatformError>;

    /// Set the default route of the router
    async fn program_default_gateway(
        &self,
        tenant: &TenantId,
        router: &RouterId,
        gateway: Ipv4Addr,
    ) -> Result<(), PlatformError>;

    /// Route every tenant network via `gateway`, except the subnets whose address is in `exclude`
    async fn program_next_hop_for_all(
        &self,
        tenant: &TenantId,
        router: &RouterId,
        gateway: Ipv4Addr,
        exclude: &[Ipv4Addr],
    ) -> Result<(), PlatformError>;

    /// Route `cidr` via `gateway`
    async fn program_next_hop(
        &self,
        router: &RouterId,
        gateway: Ipv4Addr,
        cidr: Ipv4Net,
    ) -> Result<(), PlatformError>;

    /// Remove the routes via `gateway` for networks not in `subnets`, ignoring the subnets in `exclude`
    async fn remove_next_hop(
        &self,
        router: &RouterId,
        gateway: Ipv4Addr,
        subnets: &[Ipv4Net],
        exclude: &[Ipv4Addr],
    ) -> Result<(), PlatformError>;

    /// The subnets of a tenant, minus the ones whose address is in `exclude`. If `exclude_partition`
    /// is set, subnets of the service partition are left out too.
    async fn subnets_excluding(
        &self,
        tenant: &TenantId,
        exclude: &[Ipv4Addr],
        exclude_partition: bool,
    ) -> Result<Vec<Ipv4Net>, PlatformError>;

    /// The router port attached to a subnet, if any
    async fn router_port_for_subnet(
        &self,
        subnet: &SubnetId,
    ) -> Result<Option<RouterPort>, PlatformError>;

    async fn find_router_by_name(&self, name: &str) -> Result<Vec<RouterInfo>, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_host_is_not_bound() {
        let mut port = RouterPort {
            port_id: "p1".into(),
            mac: "fa:16:3e:00:00:01".to_string(),
            host: Some(String::new()),
            fixed_ips: vec![],
        };
        assert_eq!(port.bound_host(), None);
        assert_eq!(port.first_ip(), None);
        port.host = Some("compute-1".to_string());
        port.fixed_ips.push(Ipv4Addr::new(10, 0, 1, 1));
        assert_eq!(port.bound_host(), Some("compute-1"));
        assert_eq!(port.first_ip(), Some(Ipv4Addr::new(10, 0, 1, 1)));
    }
}
