// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The fabric controller: it owns organizations, partitions and networks on the
//! fabric. The firewall service only needs to rewrite the static routes of the
//! service partition of a tenant.

use async_trait::async_trait;
use ipnet::Ipv4Net;
use std::fmt::Display;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FabricError {
    #[error("Fabric controller rejected {op}: {reason}")]
    Rejected { op: &'static str, reason: String },
    #[error("Unknown partition {partition} in organization {organization}")]
    UnknownPartition {
        organization: String,
        partition: String,
    },
    #[error("Fabric controller unreachable: {0}")]
    Unreachable(String),
}

/// The full set of static routes a partition should have
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticRouteUpdate {
    /// organization on the fabric: named after the tenant
    pub tenant_name: String,
    pub partition_name: String,
    pub subnets: Vec<Ipv4Net>,
    pub vrf_profile: String,
    pub service_node_ip: Option<Ipv4Addr>,
}

impl Display for StaticRouteUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} profile {} via {} : [",
            self.tenant_name,
            self.partition_name,
            self.vrf_profile,
            self.service_node_ip
                .map_or_else(|| "-".to_string(), |ip| ip.to_string())
        )?;
        for (n, subnet) in self.subnets.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{subnet}")?;
        }
        write!(f, "]")
    }
}

#[async_trait]
pub trait FabricController: Send + Sync {
    /// Replace the static routes of a partition. The update is idempotent.
    async fn update_static_routes(&self, update: &StaticRouteUpdate) -> Result<(), FabricError>;
}
