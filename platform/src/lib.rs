// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Capabilities the firewall service consumes from the outside world: the fabric
//! controller, the virtual network platform and the event queue feeding VNIC
//! auto-configuration. Only the contracts live here, plus an in-process
//! priority queue implementing [`EventQueue`].

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod event;
pub mod fabric;
pub mod ids;
pub mod network;
pub mod queue;

// re-exports
pub use event::{ServicePayload, VnicEvent, VnicEventType, VnicStatus};
pub use fabric::{FabricController, FabricError, StaticRouteUpdate};
pub use ids::{NetworkId, PortId, RouterId, SubnetId, TenantId};
pub use network::{NetworkPlatform, PlatformError, RouterInfo, RouterPort};
pub use queue::{EventQueue, PriorityEventQueue, QueueError, QueuedEvent};

use tracectl::{LevelFilter, trace_target};
trace_target!("platform", LevelFilter::INFO, &["firewall"]);
