// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Crate to control tracing dynamically at runtime

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod control;
mod display;
pub mod targets;

// re-exports
pub use control::DEFAULT_DEFAULT_LOGLEVEL;
pub use control::{TraceCtlError, TracingControl, get_trace_ctl};
pub use targets::TraceTarget;
pub use tracing_subscriber::filter::LevelFilter;

#[doc(hidden)]
pub use linkme;

crate::trace_target!("tracectl", LevelFilter::INFO, &[]);
