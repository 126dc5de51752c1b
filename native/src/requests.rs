// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Requests handled by the firewall driver. Payloads arrive loosely typed
//! ([`FwRequestData`]) and are validated into the typed requests before any work starts.

use crate::errors::FwError;
use ipnet::Ipv4Net;
use platform::{NetworkId, RouterId};
use serde::{Deserialize, Serialize};

/// A firewall request payload, as received
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FwRequestData {
    pub tenant_name: Option<String>,
    pub router_id: Option<RouterId>,
}

/// Insert a firewall for a tenant, using the tenant's (already created) router
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateFwRequest {
    pub tenant_name: String,
    pub router_id: RouterId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteFwRequest {
    pub tenant_name: String,
    pub router_id: RouterId,
}

/// A network was added to a tenant with a firewall
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkCreateNotif {
    pub tenant_name: String,
    pub cidr: Ipv4Net,
}

/// A network was removed from a tenant with a firewall
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkDeleteNotif {
    pub tenant_name: String,
    pub network_id: NetworkId,
}

fn required<T: Clone>(value: Option<&T>, what: &str) -> Result<T, FwError> {
    value
        .cloned()
        .ok_or_else(|| FwError::TopologyUnresolved(format!("request has no {what}")))
}

fn tenant_name(data: &FwRequestData) -> Result<String, FwError> {
    required(data.tenant_name.as_ref(), "tenant name")
        .and_then(|name| {
            if name.is_empty() {
                Err(FwError::TopologyUnresolved("request has an empty tenant name".to_string()))
            } else {
                Ok(name)
            }
        })
}

impl TryFrom<&FwRequestData> for CreateFwRequest {
    type Error = FwError;
    fn try_from(data: &FwRequestData) -> Result<Self, Self::Error> {
        Ok(Self {
            tenant_name: tenant_name(data)?,
            router_id: required(data.router_id.as_ref(), "router id")?,
        })
    }
}

impl TryFrom<&FwRequestData> for DeleteFwRequest {
    type Error = FwError;
    fn try_from(data: &FwRequestData) -> Result<Self, Self::Error> {
        Ok(Self {
            tenant_name: tenant_name(data)?,
            router_id: required(data.router_id.as_ref(), "router id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn payload_validation() {
        let data: FwRequestData =
            serde_json::from_str(r#"{"tenant_name": "acme", "router_id": "r1"}"#).unwrap();
        let request = CreateFwRequest::try_from(&data).unwrap();
        assert_eq!(request.tenant_name, "acme");
        assert_eq!(request.router_id, RouterId::from("r1"));

        let data: FwRequestData = serde_json::from_str(r#"{"tenant_name": "acme"}"#).unwrap();
        assert_eq!(
            DeleteFwRequest::try_from(&data),
            Err(FwError::TopologyUnresolved("request has no router id".to_string()))
        );

        let data = FwRequestData {
            tenant_name: Some(String::new()),
            router_id: Some("r1".into()),
        };
        assert!(CreateFwRequest::try_from(&data).is_err());
    }
}
