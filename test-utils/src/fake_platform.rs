// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A [`NetworkPlatform`] that keeps everything in memory

use crate::fault::{Fault, Injected, Verdict};
use async_trait::async_trait;
use ipnet::Ipv4Net;
use parking_lot::Mutex;
use platform::{NetworkPlatform, PlatformError, RouterId, RouterInfo, RouterPort, SubnetId, TenantId};
use std::collections::{BTreeSet, HashMap};
use std::net::Ipv4Addr;

#[allow(unused)]
use tracing::debug;

/// The operations of a [`NetworkPlatform`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlatformOp {
    Attach,
    Detach,
    DefaultGateway,
    NextHopForAll,
    NextHop,
    RemoveNextHop,
    SubnetsExcluding,
    RouterPort,
    FindRouter,
}

impl PlatformOp {
    fn name(self) -> &'static str {
        match self {
            PlatformOp::Attach => "attach_router_interfaces",
            PlatformOp::Detach => "detach_router_interfaces",
            PlatformOp::DefaultGateway => "program_default_gateway",
            PlatformOp::NextHopForAll => "program_next_hop_for_all",
            PlatformOp::NextHop => "program_next_hop",
            PlatformOp::RemoveNextHop => "remove_next_hop",
            PlatformOp::SubnetsExcluding => "subnets_excluding",
            PlatformOp::RouterPort => "router_port_for_subnet",
            PlatformOp::FindRouter => "find_router_by_name",
        }
    }
}

/// A call received by a [`FakePlatform`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformCall {
    Attach {
        router: RouterId,
        subnets: BTreeSet<SubnetId>,
    },
    Detach {
        tenant_name: String,
        router: RouterId,
        subnets: BTreeSet<SubnetId>,
    },
    DefaultGateway {
        router: RouterId,
        gateway: Ipv4Addr,
    },
    NextHopForAll {
        router: RouterId,
        gateway: Ipv4Addr,
        exclude: Vec<Ipv4Addr>,
    },
    NextHop {
        router: RouterId,
        gateway: Ipv4Addr,
        cidr: Ipv4Net,
    },
    RemoveNextHop {
        router: RouterId,
        gateway: Ipv4Addr,
        subnets: Vec<Ipv4Net>,
        exclude: Vec<Ipv4Addr>,
    },
    SubnetsExcluding {
        exclude: Vec<Ipv4Addr>,
        exclude_partition: bool,
    },
    RouterPort(SubnetId),
    FindRouter(String),
}

impl PlatformCall {
    #[must_use]
    pub fn op(&self) -> PlatformOp {
        match self {
            PlatformCall::Attach { .. } => PlatformOp::Attach,
            PlatformCall::Detach { .. } => PlatformOp::Detach,
            PlatformCall::DefaultGateway { .. } => PlatformOp::DefaultGateway,
            PlatformCall::NextHopForAll { .. } => PlatformOp::NextHopForAll,
            PlatformCall::NextHop { .. } => PlatformOp::NextHop,
            PlatformCall::RemoveNextHop { .. } => PlatformOp::RemoveNextHop,
            PlatformCall::SubnetsExcluding { .. } => PlatformOp::SubnetsExcluding,
            PlatformCall::RouterPort(_) => PlatformOp::RouterPort,
            PlatformCall::FindRouter(_) => PlatformOp::FindRouter,
        }
    }
}

/// A router port plus the number of lookups for which it still reports no host
struct ScriptedPort {
    port: RouterPort,
    unbound_lookups: u32,
}

#[derive(Default)]
struct Inner {
    calls: Vec<PlatformCall>,
    faults: HashMap<PlatformOp, Injected>,
    ports: HashMap<SubnetId, ScriptedPort>,
    routers: Vec<RouterInfo>,
    subnets: Vec<Ipv4Net>,
}

#[derive(Default)]
pub struct FakePlatform {
    inner: Mutex<Inner>,
}

impl FakePlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an operation misbehave
    pub fn fail(&self, op: PlatformOp, fault: Fault) {
        self.inner.lock().faults.insert(op, Injected::new(fault));
    }
    pub fn heal(&self, op: PlatformOp) {
        self.inner.lock().faults.remove(&op);
    }

    /// Set the port found on a subnet
    pub fn set_port(&self, subnet: &SubnetId, port: RouterPort) {
        self.inner.lock().ports.insert(
            subnet.clone(),
            ScriptedPort {
                port,
                unbound_lookups: 0,
            },
        );
    }
    /// Have the port of a subnet report an empty host for the next `lookups` lookups
    pub fn set_unbound_lookups(&self, subnet: &SubnetId, lookups: u32) {
        if let Some(scripted) = self.inner.lock().ports.get_mut(subnet) {
            scripted.unbound_lookups = lookups;
        }
    }
    pub fn remove_port(&self, subnet: &SubnetId) {
        self.inner.lock().ports.remove(subnet);
    }
    pub fn add_router(&self, name: &str, id: &str) {
        self.inner.lock().routers.push(RouterInfo {
            id: id.into(),
            name: name.to_owned(),
        });
    }
    /// Set the tenant subnets reported by `subnets_excluding`
    pub fn set_subnets(&self, subnets: Vec<Ipv4Net>) {
        self.inner.lock().subnets = subnets;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.inner.lock().calls.clone()
    }
    /// The operations called, in order
    #[must_use]
    pub fn ops(&self) -> Vec<PlatformOp> {
        self.inner.lock().calls.iter().map(PlatformCall::op).collect()
    }
    #[must_use]
    pub fn count(&self, op: PlatformOp) -> usize {
        self.inner.lock().calls.iter().filter(|c| c.op() == op).count()
    }
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Record a call and tell whether it is to fail
    fn record(&self, call: PlatformCall) -> Result<(), PlatformError> {
        let op = call.op();
        let verdict = {
            let mut inner = self.inner.lock();
            inner.calls.push(call);
            inner
                .faults
                .get_mut(&op)
                .map_or(Verdict::Pass, Injected::verdict)
        };
        match verdict {
            Verdict::Pass => Ok(()),
            Verdict::Fail => {
                debug!("Injected failure of {}", op.name());
                Err(PlatformError::Rejected {
                    op: op.name(),
                    reason: "injected failure".to_string(),
                })
            }
            Verdict::NotReady => Err(PlatformError::NotReady(op.name().to_string())),
            Verdict::Panic => panic!("injected panic in {}", op.name()),
        }
    }
}

#[async_trait]
impl NetworkPlatform for FakePlatform {
    async fn attach_router_interfaces(
        &self,
        router: &RouterId,
        _tenant: &TenantId,
        subnets: &BTreeSet<SubnetId>,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Attach {
            router: router.clone(),
            subnets: subnets.clone(),
        })
    }

    async fn detach_router_interfaces(
        &self,
        tenant_name: &str,
        _tenant: &TenantId,
        router: &RouterId,
        subnets: &BTreeSet<SubnetId>,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Detach {
            tenant_name: tenant_name.to_owned(),
            router: router.clone(),
            subnets: subnets.clone(),
        })
    }

    async fn program_default_gateway(
        &self,
        _tenant: &TenantId,
        router: &RouterId,
        gateway: Ipv4Addr,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::DefaultGateway {
            router: router.clone(),
            gateway,
        })
    }

    async fn program_next_hop_for_all(
        &self,
        _tenant: &TenantId,
        router: &RouterId,
        gateway: Ipv4Addr,
        exclude: &[Ipv4Addr],
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::NextHopForAll {
            router: router.clone(),
            gateway,
            exclude: exclude.to_vec(),
        })
    }

    async fn program_next_hop(
        &self,
        router: &RouterId,
        gateway: Ipv4Addr,
        cidr: Ipv4Net,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::NextHop {
            router: router.clone(),
            gateway,
            cidr,
        })
    }

    async fn remove_next_hop(
        &self,
        router: &RouterId,
        gateway: Ipv4Addr,
        subnets: &[Ipv4Net],
        exclude: &[Ipv4Addr],
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::RemoveNextHop {
            router: router.clone(),
            gateway,
            subnets: subnets.to_vec(),
            exclude: exclude.to_vec(),
        })
    }

    async fn subnets_excluding(
        &self,
        _tenant: &TenantId,
        exclude: &[Ipv4Addr],
        exclude_partition: bool,
    ) -> Result<Vec<Ipv4Net>, PlatformError> {
        self.record(PlatformCall::SubnetsExcluding {
            exclude: exclude.to_vec(),
            exclude_partition,
        })?;
        let subnets = self
            .inner
            .lock()
            .subnets
            .iter()
            .filter(|net| !exclude.contains(&net.network()))
            .copied()
            .collect();
        Ok(subnets)
    }

    async fn router_port_for_subnet(
        &self,
        subnet: &SubnetId,
    ) -> Result<Option<RouterPort>, PlatformError> {
        self.record(PlatformCall::RouterPort(subnet.clone()))?;
        let mut inner = self.inner.lock();
        let Some(scripted) = inner.ports.get_mut(subnet) else {
            return Ok(None);
        };
        let mut port = scripted.port.clone();
        if scripted.unbound_lookups > 0 {
            scripted.unbound_lookups -= 1;
            port.host = Some(String::new());
        }
        Ok(Some(port))
    }

    async fn find_router_by_name(&self, name: &str) -> Result<Vec<RouterInfo>, PlatformError> {
        self.record(PlatformCall::FindRouter(name.to_owned()))?;
        Ok(self
            .inner
            .lock()
            .routers
            .iter()
            .filter(|r| r.name == name)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn port(host: &str) -> RouterPort {
        RouterPort {
            port_id: "port-1".into(),
            mac: "fa:16:3e:00:00:01".to_string(),
            host: Some(host.to_string()),
            fixed_ips: vec![Ipv4Addr::new(10, 0, 1, 2)],
        }
    }

    #[tokio::test]
    async fn scripted_binding() {
        let platform = FakePlatform::new();
        let subnet = SubnetId::from("sub-in");
        platform.set_port(&subnet, port("compute-1"));
        platform.set_unbound_lookups(&subnet, 1);

        let first = platform.router_port_for_subnet(&subnet).await.unwrap().unwrap();
        assert_eq!(first.bound_host(), None);
        let second = platform.router_port_for_subnet(&subnet).await.unwrap().unwrap();
        assert_eq!(second.bound_host(), Some("compute-1"));
        assert!(platform
            .router_port_for_subnet(&"other".into())
            .await
            .unwrap()
            .is_none());
        assert_eq!(platform.count(PlatformOp::RouterPort), 3);
    }

    #[tokio::test]
    async fn injected_failures_are_journaled() {
        let platform = FakePlatform::new();
        platform.fail(PlatformOp::DefaultGateway, Fault::NotReady(1));
        let router = RouterId::from("r1");
        let gw = Ipv4Addr::new(10, 0, 2, 1);
        let tenant = TenantId::from("acme");
        assert_eq!(
            platform.program_default_gateway(&tenant, &router, gw).await,
            Err(PlatformError::NotReady("program_default_gateway".to_string()))
        );
        assert!(platform.program_default_gateway(&tenant, &router, gw).await.is_ok());
        assert_eq!(
            platform.ops(),
            vec![PlatformOp::DefaultGateway, PlatformOp::DefaultGateway]
        );
    }

    #[tokio::test]
    async fn routers_by_name() {
        let platform = FakePlatform::new();
        platform.add_router("FW_RTR_acme", "r1");
        platform.add_router("FW_RTR_globex", "r2");
        let found = platform.find_router_by_name("FW_RTR_acme").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, RouterId::from("r1"));
    }
}
