// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The errors of the configuration

use crate::topology::Leg;
use ipnet::Ipv4Net;
use platform::TenantId;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    ReadFailed(String, String),
    #[error("Failed to parse config: {0}")]
    ParseFailed(String),
    #[error("Missing value: {0}")]
    MissingValue(&'static str),
    #[error("Invalid retry policy for {0}: at least one attempt is required")]
    InvalidRetry(&'static str),
    #[error("No service topology for tenant {0}")]
    NoSuchTenant(TenantId),
    #[error("Tenant {tenant}, {leg} leg: {what} {addr} is outside subnet {subnet}")]
    OutsideSubnet {
        tenant: TenantId,
        leg: Leg,
        what: &'static str,
        addr: Ipv4Addr,
        subnet: Ipv4Net,
    },
    #[error("Tenant {tenant}, {leg} leg: allocation range {start}-{end} is inverted")]
    InvertedRange {
        tenant: TenantId,
        leg: Leg,
        start: Ipv4Addr,
        end: Ipv4Addr,
    },
    #[error("Tenant {0}: in and out subnets overlap ({1} and {2})")]
    OverlappingLegs(TenantId, Ipv4Net, Ipv4Net),
    #[error("Tenant {0}: in and out legs share segment {1}")]
    SharedSegment(TenantId, u32),
    #[error("Tenant {0}: service node {1} is outside the out subnet {2}")]
    ServiceNodeOutsideSubnet(TenantId, Ipv4Addr, Ipv4Net),
}

/// Result of config validation
pub type ConfigResult = Result<(), ConfigError>;
