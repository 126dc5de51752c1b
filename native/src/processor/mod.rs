// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Firewall request processor: a task owning a driver, and cloneable clients to talk to it.

pub(crate) mod fw_client;
pub(crate) mod launch;
pub(crate) mod proc;
