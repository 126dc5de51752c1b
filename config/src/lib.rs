// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration of the native firewall service: the knobs of the sequencer and the
//! service topology (in and out legs) of every tenant.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod errors;
pub mod fwconfig;
pub mod topology;

// re-exports
pub use errors::{ConfigError, ConfigResult};
pub use fwconfig::{FwConfig, RetryConfig};
pub use topology::{Leg, ServiceLeg, ServiceTopology, StaticTopology, TopologySource};

use tracectl::{LevelFilter, trace_target};
trace_target!("config", LevelFilter::INFO, &["firewall"]);
