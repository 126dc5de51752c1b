// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A ready-made tenant: "acme", with its legs on 10.0.1.0/24 (in) and 10.0.2.0/24 (out)

use crate::fake_platform::FakePlatform;
use config::{FwConfig, Leg, ServiceLeg, ServiceTopology};
use ipnet::Ipv4Net;
use platform::{RouterPort, TenantId};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

pub const ACME: &str = "acme";
pub const ACME_ROUTER: &str = "router-acme";
pub const ACME_HOST: &str = "compute-7";

fn leg(leg: Leg, octet: u8, segment_id: u32, vlan: u16) -> ServiceLeg {
    ServiceLeg {
        network_id: format!("net-{leg}").into(),
        subnet_id: format!("sub-{leg}").into(),
        segment_id,
        vlan,
        subnet: Ipv4Net::new_assert(Ipv4Addr::new(10, 0, octet, 0), 24),
        alloc_start: Ipv4Addr::new(10, 0, octet, 2),
        alloc_end: Ipv4Addr::new(10, 0, octet, 253),
        gateway: Some(Ipv4Addr::new(10, 0, octet, 1)),
        secondary_gateway: None,
    }
}

#[must_use]
pub fn acme_topology() -> ServiceTopology {
    ServiceTopology {
        in_leg: leg(Leg::In, 1, 60001, 101),
        out_leg: leg(Leg::Out, 2, 60002, 102),
        service_node_ip: Some(Ipv4Addr::new(10, 0, 2, 254)),
    }
}

/// Default config, knowing tenant acme
#[must_use]
pub fn acme_config() -> FwConfig {
    FwConfig {
        tenants: BTreeMap::from([(TenantId::from(ACME), acme_topology())]),
        ..FwConfig::default()
    }
}

/// The router port of a leg, bound to `host`
#[must_use]
pub fn leg_port(topology: &ServiceTopology, leg: Leg, host: &str) -> RouterPort {
    let service_leg = topology.leg(leg);
    let octet = match leg {
        Leg::In => 1,
        Leg::Out => 2,
    };
    RouterPort {
        port_id: format!("port-{leg}").into(),
        mac: format!("fa:16:3e:00:00:0{octet}"),
        host: Some(host.to_owned()),
        fixed_ips: vec![service_leg.alloc_start],
    }
}

/// Attach the router ports of both legs to the platform, bound to `host`
pub fn bind_leg_ports(platform: &FakePlatform, topology: &ServiceTopology, host: &str) {
    for leg in [Leg::In, Leg::Out] {
        platform.set_port(&topology.leg(leg).subnet_id, leg_port(topology, leg, host));
    }
}

/// The tenant networks of acme, service legs included
#[must_use]
pub fn acme_networks() -> Vec<Ipv4Net> {
    ["10.0.1.0/24", "10.0.2.0/24", "192.168.10.0/24", "192.168.20.0/24"]
        .iter()
        .filter_map(|net| net.parse().ok())
        .collect()
}
