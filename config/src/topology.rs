// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Service topology of a tenant: the two subnets (legs) the firewall sits between.

use crate::errors::{ConfigError, ConfigResult};
use ipnet::Ipv4Net;
use parking_lot::RwLock;
use platform::{NetworkId, SubnetId, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

#[allow(unused)]
use tracing::{debug, info};

/// One side of the firewall
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Leg {
    In,
    Out,
}

/// A service subnet (ingress or egress side of the firewall)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceLeg {
    pub network_id: NetworkId,
    pub subnet_id: SubnetId,
    pub segment_id: u32,
    pub vlan: u16,
    pub subnet: Ipv4Net,
    pub alloc_start: Ipv4Addr,
    pub alloc_end: Ipv4Addr,
    /// `None` means the leg has no gateway
    #[serde(default)]
    pub gateway: Option<Ipv4Addr>,
    #[serde(default)]
    pub secondary_gateway: Option<Ipv4Addr>,
}

impl ServiceLeg {
    /// The address of the subnet, as used in exclusion lists
    #[must_use]
    pub fn address(&self) -> Ipv4Addr {
        self.subnet.network()
    }

    fn check_inside(
        &self,
        tenant: &TenantId,
        leg: Leg,
        what: &'static str,
        addr: Ipv4Addr,
    ) -> ConfigResult {
        if self.subnet.contains(&addr) {
            Ok(())
        } else {
            Err(ConfigError::OutsideSubnet {
                tenant: tenant.clone(),
                leg,
                what,
                addr,
                subnet: self.subnet,
            })
        }
    }

    fn validate(&self, tenant: &TenantId, leg: Leg) -> ConfigResult {
        self.check_inside(tenant, leg, "allocation start", self.alloc_start)?;
        self.check_inside(tenant, leg, "allocation end", self.alloc_end)?;
        if self.alloc_start > self.alloc_end {
            return Err(ConfigError::InvertedRange {
                tenant: tenant.clone(),
                leg,
                start: self.alloc_start,
                end: self.alloc_end,
            });
        }
        if let Some(gateway) = self.gateway {
            self.check_inside(tenant, leg, "gateway", gateway)?;
        }
        if let Some(gateway) = self.secondary_gateway {
            self.check_inside(tenant, leg, "secondary gateway", gateway)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceTopology {
    pub in_leg: ServiceLeg,
    pub out_leg: ServiceLeg,
    /// the firewall address on the out leg, where the fabric sends tenant traffic
    #[serde(default)]
    pub service_node_ip: Option<Ipv4Addr>,
}

impl ServiceTopology {
    #[must_use]
    pub fn leg(&self, leg: Leg) -> &ServiceLeg {
        match leg {
            Leg::In => &self.in_leg,
            Leg::Out => &self.out_leg,
        }
    }

    /// Subnet addresses of both legs. These never get routed through the firewall.
    #[must_use]
    pub fn exclusion_list(&self) -> Vec<Ipv4Addr> {
        vec![self.in_leg.address(), self.out_leg.address()]
    }

    #[must_use]
    pub fn subnet_ids(&self) -> BTreeSet<SubnetId> {
        BTreeSet::from([self.in_leg.subnet_id.clone(), self.out_leg.subnet_id.clone()])
    }

    pub fn validate(&self, tenant: &TenantId) -> ConfigResult {
        self.in_leg.validate(tenant, Leg::In)?;
        self.out_leg.validate(tenant, Leg::Out)?;
        let (in_net, out_net) = (self.in_leg.subnet, self.out_leg.subnet);
        if in_net.contains(&out_net.network()) || out_net.contains(&in_net.network()) {
            return Err(ConfigError::OverlappingLegs(tenant.clone(), in_net, out_net));
        }
        if self.in_leg.segment_id == self.out_leg.segment_id {
            return Err(ConfigError::SharedSegment(
                tenant.clone(),
                self.in_leg.segment_id,
            ));
        }
        if let Some(node) = self.service_node_ip
            && !out_net.contains(&node)
        {
            return Err(ConfigError::ServiceNodeOutsideSubnet(
                tenant.clone(),
                node,
                out_net,
            ));
        }
        Ok(())
    }
}

/// Where the service topology of a tenant comes from. It is queried for every
/// operation since the topology may change under our feet.
pub trait TopologySource: Send + Sync {
    fn service_topology(&self, tenant: &TenantId) -> Result<ServiceTopology, ConfigError>;
}

/// A [`TopologySource`] backed by the configuration. Topologies can be replaced at runtime.
#[derive(Default)]
pub struct StaticTopology(RwLock<BTreeMap<TenantId, ServiceTopology>>);

impl StaticTopology {
    #[must_use]
    pub fn new(tenants: BTreeMap<TenantId, ServiceTopology>) -> Self {
        Self(RwLock::new(tenants))
    }

    /// Set the topology of a tenant, replacing any prior one
    pub fn set(&self, tenant: TenantId, topology: ServiceTopology) -> ConfigResult {
        topology.validate(&tenant)?;
        info!("Setting service topology of tenant {tenant}");
        self.0.write().insert(tenant, topology);
        Ok(())
    }

    pub fn remove(&self, tenant: &TenantId) -> Option<ServiceTopology> {
        self.0.write().remove(tenant)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }
}

impl TopologySource for StaticTopology {
    fn service_topology(&self, tenant: &TenantId) -> Result<ServiceTopology, ConfigError> {
        self.0
            .read()
            .get(tenant)
            .cloned()
            .ok_or_else(|| ConfigError::NoSuchTenant(tenant.clone()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn sample_leg(octet: u8, segment_id: u32) -> ServiceLeg {
        ServiceLeg {
            network_id: format!("net-{octet}").into(),
            subnet_id: format!("sub-{octet}").into(),
            segment_id,
            vlan: 100 + u16::from(octet),
            subnet: format!("10.0.{octet}.0/24").parse().unwrap(),
            alloc_start: Ipv4Addr::new(10, 0, octet, 2),
            alloc_end: Ipv4Addr::new(10, 0, octet, 253),
            gateway: Some(Ipv4Addr::new(10, 0, octet, 1)),
            secondary_gateway: Some(Ipv4Addr::new(10, 0, octet, 254)),
        }
    }

    pub(crate) fn sample_topology() -> ServiceTopology {
        ServiceTopology {
            in_leg: sample_leg(1, 60001),
            out_leg: sample_leg(2, 60002),
            service_node_ip: Some(Ipv4Addr::new(10, 0, 2, 254)),
        }
    }

    #[test]
    fn exclusion_list_holds_both_leg_addresses() {
        let topology = sample_topology();
        assert_eq!(
            topology.exclusion_list(),
            vec![Ipv4Addr::new(10, 0, 1, 0), Ipv4Addr::new(10, 0, 2, 0)]
        );
        assert_eq!(
            topology.subnet_ids(),
            BTreeSet::from([SubnetId::from("sub-1"), SubnetId::from("sub-2")])
        );
        assert_eq!(topology.leg(Leg::Out).segment_id, 60002);
        assert_eq!(Leg::In.to_string(), "in");
    }

    #[test]
    fn topology_validation() {
        let tenant = TenantId::from("acme");
        assert_eq!(sample_topology().validate(&tenant), Ok(()));

        let mut bad = sample_topology();
        bad.in_leg.gateway = Some(Ipv4Addr::new(10, 9, 9, 1));
        assert!(matches!(
            bad.validate(&tenant),
            Err(ConfigError::OutsideSubnet {
                leg: Leg::In,
                what: "gateway",
                ..
            })
        ));

        let mut bad = sample_topology();
        bad.out_leg.alloc_start = Ipv4Addr::new(10, 0, 2, 200);
        bad.out_leg.alloc_end = Ipv4Addr::new(10, 0, 2, 100);
        assert!(matches!(
            bad.validate(&tenant),
            Err(ConfigError::InvertedRange { leg: Leg::Out, .. })
        ));

        let mut bad = sample_topology();
        bad.out_leg = sample_leg(1, 60002);
        assert!(matches!(
            bad.validate(&tenant),
            Err(ConfigError::OverlappingLegs(..))
        ));

        let mut bad = sample_topology();
        bad.out_leg.segment_id = 60001;
        assert_eq!(
            bad.validate(&tenant),
            Err(ConfigError::SharedSegment(tenant.clone(), 60001))
        );

        let mut bad = sample_topology();
        bad.service_node_ip = Some(Ipv4Addr::new(10, 0, 1, 5));
        assert!(matches!(
            bad.validate(&tenant),
            Err(ConfigError::ServiceNodeOutsideSubnet(..))
        ));
    }

    #[test]
    fn static_topology_serves_fresh_copies() {
        let source = StaticTopology::default();
        let tenant = TenantId::from("acme");
        assert_eq!(
            source.service_topology(&tenant),
            Err(ConfigError::NoSuchTenant(tenant.clone()))
        );
        source.set(tenant.clone(), sample_topology()).unwrap();
        assert_eq!(source.len(), 1);

        let mut changed = sample_topology();
        changed.in_leg.gateway = None;
        source.set(tenant.clone(), changed).unwrap();
        assert_eq!(source.service_topology(&tenant).unwrap().in_leg.gateway, None);

        assert!(source.remove(&tenant).is_some());
        assert!(source.is_empty());
    }
}
