// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![allow(dead_code)]

use config::FwConfig;
use fwsvc_native::{FwRequestData, NativeFw, NativeFwParamsBuilder};
use platform::TenantId;
use std::sync::Arc;
use test_utils::fixtures::{ACME, ACME_HOST, ACME_ROUTER, acme_config, acme_networks, bind_leg_ports};
use test_utils::{FakeFabric, FakePlatform, RecordingQueue};

/// A sequencer wired to fakes, with tenant acme ready to go
pub struct Harness {
    pub fw: Arc<NativeFw>,
    pub platform: Arc<FakePlatform>,
    pub fabric: Arc<FakeFabric>,
    pub queue: Arc<RecordingQueue>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(acme_config())
    }

    pub fn with_config(config: FwConfig) -> Self {
        let platform = Arc::new(FakePlatform::new());
        let fabric = Arc::new(FakeFabric::new());
        let queue = Arc::new(RecordingQueue::new());
        let topology = Arc::new(config.topology_source());
        if let Some(acme) = config.tenants.get(&TenantId::from(ACME)) {
            bind_leg_ports(&platform, acme, ACME_HOST);
        }
        platform.set_subnets(acme_networks());

        let params = NativeFwParamsBuilder::default()
            .config(config)
            .topology(topology)
            .platform(platform.clone())
            .fabric(fabric.clone())
            .queue(queue.clone())
            .build()
            .unwrap();
        let fw = Arc::new(NativeFw::new(params).unwrap());
        Self {
            fw,
            platform,
            fabric,
            queue,
        }
    }
}

pub fn acme() -> TenantId {
    TenantId::from(ACME)
}

pub fn acme_request() -> FwRequestData {
    FwRequestData {
        tenant_name: Some(ACME.to_string()),
        router_id: Some(ACME_ROUTER.into()),
    }
}
