// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! In-memory stand-ins for the collaborators of the firewall service. They record every
//! call they get and can be told to fail (or panic) on chosen operations.

pub mod fake_fabric;
pub mod fake_platform;
pub mod fault;
pub mod fixtures;
pub mod recording_queue;

// re-exports
pub use fake_fabric::FakeFabric;
pub use fake_platform::{FakePlatform, PlatformCall, PlatformOp};
pub use fault::Fault;
pub use recording_queue::RecordingQueue;
