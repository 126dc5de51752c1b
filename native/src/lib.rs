// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Native firewall service insertion. The firewall of a tenant is the tenant's own router,
//! steered in between two service subnets (the in and out legs). This crate sequences the
//! calls to the network platform, the fabric controller and the VNIC event queue needed to
//! set it up and tear it down, rolling back on failure.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod driver;
pub mod errors;
mod processor;
pub mod requests;
pub mod retry;
pub mod sequencer;
pub mod tenant;
mod vnic;

// re-exports
pub use driver::FwDriver;
pub use errors::{FwError, Operation, SequenceError, Step};
pub use processor::fw_client::{FwChannelRequest, FwClient, FwProcessorError, FwRequest};
pub use processor::launch::start_fw_processor;
pub use processor::proc::{DEFAULT_FW_CHANNEL_SIZE, FwProcessor};
pub use requests::{
    CreateFwRequest, DeleteFwRequest, FwRequestData, NetworkCreateNotif, NetworkDeleteNotif,
};
pub use sequencer::{NativeFw, NativeFwParams, NativeFwParamsBuilder, NativeFwParamsBuilderError};
pub use tenant::{TenantLocks, TenantServiceState, TenantStateTable};

use tracectl::{LevelFilter, trace_target};
trace_target!("native", LevelFilter::DEBUG, &["firewall"]);
