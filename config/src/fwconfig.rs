// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Top-level configuration object of the native firewall service

use crate::errors::{ConfigError, ConfigResult};
use crate::topology::{Leg, ServiceTopology, StaticTopology};
use platform::TenantId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Name of the fabric partition that carries the static routes towards the firewall
pub const DEFAULT_SERVICE_PARTITION: &str = "CTX-ext";
pub const DEFAULT_SERVICE_PARTITION_VRF_PROFILE: &str = "vrf-common-universal-external-static";
pub const DEFAULT_ROUTER_NAME_PREFIX: &str = "FW_RTR_";
pub const DEFAULT_VM_NAME_PREFIX: &str = "FW_SRVC_RTR_";
pub const DEFAULT_FORWARDING_MODE: &str = "anycast_gateway";
/// Start of the low-priority band of the event queue
pub const PRI_LOW_START: u32 = 30;
pub const DEFAULT_EVENT_PRIORITY: u32 = PRI_LOW_START + 4;
pub const DEFAULT_MAX_QUOTA: u32 = 50;

/// A bounded retry policy: `attempts` tries in total, `delay_ms` apart
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl RetryConfig {
    #[must_use]
    pub const fn new(attempts: u32, delay_ms: u64) -> Self {
        Self { attempts, delay_ms }
    }
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
    fn validate(&self, what: &'static str) -> ConfigResult {
        if self.attempts == 0 {
            return Err(ConfigError::InvalidRetry(what));
        }
        Ok(())
    }
}

/// Wait for a router port to be bound to a host
pub const DEFAULT_HOST_BINDING_RETRY: RetryConfig = RetryConfig::new(4, 3_000);
/// Program the default gateway of a router: first try plus 3 retries
pub const DEFAULT_GATEWAY_RETRY: RetryConfig = RetryConfig::new(4, 5_000);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FwConfig {
    pub service_partition: String,
    pub service_partition_vrf_profile: String,
    pub router_name_prefix: String,
    pub vm_name_prefix: String,
    pub forwarding_mode: String,
    pub event_priority: u32,
    pub host_binding: RetryConfig,
    pub default_gateway: RetryConfig,
    pub max_quota: u32,
    pub mgmt_ip_addr: Option<IpAddr>,
    pub tenants: BTreeMap<TenantId, ServiceTopology>,
}

impl Default for FwConfig {
    fn default() -> Self {
        Self {
            service_partition: DEFAULT_SERVICE_PARTITION.to_string(),
            service_partition_vrf_profile: DEFAULT_SERVICE_PARTITION_VRF_PROFILE.to_string(),
            router_name_prefix: DEFAULT_ROUTER_NAME_PREFIX.to_string(),
            vm_name_prefix: DEFAULT_VM_NAME_PREFIX.to_string(),
            forwarding_mode: DEFAULT_FORWARDING_MODE.to_string(),
            event_priority: DEFAULT_EVENT_PRIORITY,
            host_binding: DEFAULT_HOST_BINDING_RETRY,
            default_gateway: DEFAULT_GATEWAY_RETRY,
            max_quota: DEFAULT_MAX_QUOTA,
            mgmt_ip_addr: None,
            tenants: BTreeMap::new(),
        }
    }
}

impl FwConfig {
    /// Parse a configuration from YAML. The result is not validated.
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        serde_yaml_ng::from_str(input).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading firewall service config from {}...", path.display());
        let input = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.display().to_string(), e.to_string()))?;
        let config = Self::from_yaml(&input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult {
        debug!("Validating firewall service config...");
        if self.service_partition.is_empty() {
            return Err(ConfigError::MissingValue("service_partition"));
        }
        if self.service_partition_vrf_profile.is_empty() {
            return Err(ConfigError::MissingValue("service_partition_vrf_profile"));
        }
        if self.router_name_prefix.is_empty() {
            return Err(ConfigError::MissingValue("router_name_prefix"));
        }
        if self.forwarding_mode.is_empty() {
            return Err(ConfigError::MissingValue("forwarding_mode"));
        }
        self.host_binding.validate("host_binding")?;
        self.default_gateway.validate("default_gateway")?;
        for (tenant, topology) in &self.tenants {
            topology.validate(tenant)?;
        }
        Ok(())
    }

    /// Name of the service router of a tenant
    #[must_use]
    pub fn router_name(&self, tenant_name: &str) -> String {
        format!("{}{tenant_name}", self.router_name_prefix)
    }

    /// Name under which a router port is announced in VNIC events
    #[must_use]
    pub fn vm_name(&self, tenant_name: &str, leg: Leg) -> String {
        format!("{}{tenant_name}_{leg}", self.vm_name_prefix)
    }

    /// A [`StaticTopology`] holding the tenant topologies of this config
    #[must_use]
    pub fn topology_source(&self) -> StaticTopology {
        StaticTopology::new(self.tenants.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TopologySource;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    const SAMPLE: &str = r"
service_partition_vrf_profile: vrf-custom
default_gateway:
  attempts: 2
  delay_ms: 100
mgmt_ip_addr: 192.168.0.10
tenants:
  acme:
    in_leg:
      network_id: net-in
      subnet_id: sub-in
      segment_id: 60001
      vlan: 101
      subnet: 10.0.1.0/24
      alloc_start: 10.0.1.2
      alloc_end: 10.0.1.253
      gateway: 10.0.1.1
    out_leg:
      network_id: net-out
      subnet_id: sub-out
      segment_id: 60002
      vlan: 102
      subnet: 10.0.2.0/24
      alloc_start: 10.0.2.2
      alloc_end: 10.0.2.253
      gateway: 10.0.2.1
      secondary_gateway: 10.0.2.254
    service_node_ip: 10.0.2.254
";

    #[test]
    fn defaults() {
        let config = FwConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.event_priority, 34);
        assert_eq!(config.router_name("acme"), "FW_RTR_acme");
        assert_eq!(config.vm_name("acme", Leg::Out), "FW_SRVC_RTR_acme_out");
        assert_eq!(config.default_gateway.delay(), Duration::from_secs(5));
    }

    #[test]
    fn parse_sample() {
        let config = FwConfig::from_yaml(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.service_partition, DEFAULT_SERVICE_PARTITION);
        assert_eq!(config.service_partition_vrf_profile, "vrf-custom");
        assert_eq!(config.default_gateway, RetryConfig::new(2, 100));
        assert_eq!(config.host_binding, DEFAULT_HOST_BINDING_RETRY);
        assert_eq!(
            config.mgmt_ip_addr,
            Some(IpAddr::V4(Ipv4Addr::new(192, 168, 0, 10)))
        );

        let source = config.topology_source();
        let topology = source.service_topology(&"acme".into()).unwrap();
        assert_eq!(topology.in_leg.gateway, Some(Ipv4Addr::new(10, 0, 1, 1)));
        assert_eq!(topology.in_leg.secondary_gateway, None);
        assert_eq!(topology.out_leg.segment_id, 60002);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_values() {
        assert!(matches!(
            FwConfig::from_yaml("no_such_knob: 1"),
            Err(ConfigError::ParseFailed(_))
        ));

        let config = FwConfig::from_yaml("host_binding: {attempts: 0, delay_ms: 10}").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidRetry("host_binding"))
        );

        let config = FwConfig::from_yaml("service_partition: ''").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingValue("service_partition"))
        );
    }

    #[test]
    fn load_missing_file() {
        let result = FwConfig::load(Path::new("/nonexistent/fwsvc.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadFailed(..))));
    }
}
