// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! VNIC events. These describe the bring-up or tear-down of a router port so that
//! a downstream VNIC discovery protocol (e.g. VDP) can bind it on the leaf.

use crate::ids::{NetworkId, PortId, RouterId};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VnicStatus {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum VnicEventType {
    #[serde(rename = "service.vnic.create")]
    #[strum(serialize = "service.vnic.create")]
    Create,
    #[serde(rename = "service.vnic.delete")]
    #[strum(serialize = "service.vnic.delete")]
    Delete,
}

impl From<VnicStatus> for VnicEventType {
    fn from(status: VnicStatus) -> Self {
        match status {
            VnicStatus::Up => VnicEventType::Create,
            VnicStatus::Down => VnicEventType::Delete,
        }
    }
}

/// The description of one router port, as the VNIC consumer expects it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnicEvent {
    pub status: VnicStatus,
    pub mac: String,
    #[serde(rename = "segid")]
    pub segment_id: u32,
    pub host: String,
    pub port_id: PortId,
    pub network_id: NetworkId,
    pub vm_name: String,
    pub vm_ip: Ipv4Addr,
    pub vm_uuid: RouterId,
    pub gw_mac: Option<String>,
    #[serde(rename = "fwd_mod")]
    pub forwarding_mode: String,
}

impl VnicEvent {
    #[must_use]
    pub fn event_type(&self) -> VnicEventType {
        self.status.into()
    }
}

/// Events are delivered wrapped as `{"service": <event>}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePayload {
    pub service: VnicEvent,
}
