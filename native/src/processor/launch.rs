// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::driver::FwDriver;
use crate::processor::fw_client::FwClient;
use crate::processor::proc::FwProcessor;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[allow(unused)]
use tracing::debug;

/// Start a firewall processor on the current tokio runtime. The processor stops
/// once the returned client and all its clones are dropped.
#[must_use]
pub fn start_fw_processor(
    driver: Arc<dyn FwDriver>,
    channel_size: usize,
) -> (FwClient, JoinHandle<()>) {
    debug!("Starting firewall processor for driver {}", driver.name());
    let (processor, client) = FwProcessor::new(driver, channel_size);
    let handle = tokio::spawn(async move { processor.run().await });
    (client, handle)
}
