// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

mod common;

use common::{Harness, acme, acme_request};
use config::Leg;
use fwsvc_native::{FwDriver, FwRequestData, TenantServiceState};
use platform::{NetworkId, RouterId, StaticRouteUpdate, SubnetId, VnicEventType, VnicStatus};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::time::Duration;
use test_utils::fixtures::{ACME_HOST, ACME_ROUTER, acme_config, acme_topology};
use test_utils::{Fault, PlatformCall, PlatformOp};
use tokio::time::Instant;
use tracing_test::traced_test;

fn vm(leg: Leg) -> String {
    format!("FW_SRVC_RTR_acme_{leg}")
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn acme_scenario() {
    let h = Harness::new();
    assert!(h.fw.create_fw(&acme(), &acme_request()).await);

    assert_eq!(
        h.fw.tenant_state(&acme()),
        Some(TenantServiceState {
            router_id: Some(ACME_ROUTER.into()),
            bound_host: Some(ACME_HOST.to_string()),
        })
    );

    let router = RouterId::from(ACME_ROUTER);
    let calls = h.platform.calls();
    assert_eq!(
        calls[..4].to_vec(),
        vec![
            PlatformCall::Attach {
                router: router.clone(),
                subnets: BTreeSet::from([SubnetId::from("sub-in"), SubnetId::from("sub-out")]),
            },
            PlatformCall::SubnetsExcluding {
                exclude: vec![Ipv4Addr::new(10, 0, 1, 0), Ipv4Addr::new(10, 0, 2, 0)],
                exclude_partition: false,
            },
            PlatformCall::DefaultGateway {
                router: router.clone(),
                gateway: Ipv4Addr::new(10, 0, 2, 1),
            },
            PlatformCall::NextHopForAll {
                router: router.clone(),
                gateway: Ipv4Addr::new(10, 0, 1, 1),
                exclude: vec![Ipv4Addr::new(10, 0, 1, 0), Ipv4Addr::new(10, 0, 2, 0)],
            },
        ]
    );
    assert_eq!(
        h.platform.ops()[4..].to_vec(),
        vec![PlatformOp::RouterPort, PlatformOp::RouterPort]
    );

    assert_eq!(
        h.fabric.updates(),
        vec![StaticRouteUpdate {
            tenant_name: "acme".to_string(),
            partition_name: "CTX-ext".to_string(),
            subnets: vec!["192.168.10.0/24".parse().unwrap(), "192.168.20.0/24".parse().unwrap()],
            vrf_profile: "vrf-common-universal-external-static".to_string(),
            service_node_ip: Some(Ipv4Addr::new(10, 0, 2, 254)),
        }]
    );

    assert_eq!(
        h.queue.summary(),
        vec![(vm(Leg::In), VnicStatus::Up), (vm(Leg::Out), VnicStatus::Up)]
    );
    let events = h.queue.submitted();
    assert!(events.iter().all(|e| e.priority == 34));
    assert!(events.iter().all(|e| e.event_type == VnicEventType::Create));
    let vnic = &events[0].payload.service;
    assert_eq!(vnic.host, ACME_HOST);
    assert_eq!(vnic.segment_id, 60001);
    assert_eq!(vnic.vm_ip, Ipv4Addr::new(10, 0, 1, 2));
    assert_eq!(vnic.vm_uuid, router);
    assert_eq!(vnic.network_id, NetworkId::from("net-in"));
    assert_eq!(vnic.gw_mac, None);
    assert_eq!(vnic.forwarding_mode, "anycast_gateway");

    // equal priorities pop in submission order
    let first = h.queue.queue().try_pop().unwrap();
    let second = h.queue.queue().try_pop().unwrap();
    assert_eq!(first.payload.service.vm_name, vm(Leg::In));
    assert_eq!(second.payload.service.vm_name, vm(Leg::Out));
    assert!(logs_contain("create-fw succeeded for tenant acme"));
}

#[tokio::test(start_paused = true)]
async fn attach_failure_leaves_nothing() {
    let h = Harness::new();
    h.platform.fail(PlatformOp::Attach, Fault::Always);
    assert!(!h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(h.fw.tenant_state(&acme()), None);
    assert_eq!(h.platform.ops(), vec![PlatformOp::Attach]);
    assert_eq!(h.fabric.count(), 0);
    assert!(h.queue.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn static_route_failure_detaches_once() {
    let h = Harness::new();
    h.fabric.fail(Fault::Always);
    assert!(!h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(h.platform.count(PlatformOp::Detach), 1);
    assert_eq!(h.platform.count(PlatformOp::DefaultGateway), 0);
    assert_eq!(h.fw.tenant_state(&acme()), None);
    assert!(matches!(
        h.platform.calls().last(),
        Some(PlatformCall::Detach { router, tenant_name, .. })
            if *router == RouterId::from(ACME_ROUTER) && tenant_name == "acme"
    ));
    assert!(logs_contain("create-fw failed at step static-routes"));
}

#[tokio::test(start_paused = true)]
async fn gateway_programmed_on_fourth_attempt() {
    let h = Harness::new();
    h.platform.fail(PlatformOp::DefaultGateway, Fault::NotReady(3));
    let start = Instant::now();
    assert!(h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(h.platform.count(PlatformOp::DefaultGateway), 4);
    assert_eq!(start.elapsed(), Duration::from_secs(15));
    assert!(h.fw.tenant_state(&acme()).is_some());
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn gateway_gives_up_after_four_attempts() {
    let h = Harness::new();
    h.platform.fail(PlatformOp::DefaultGateway, Fault::NotReady(u32::MAX));
    assert!(!h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(h.platform.count(PlatformOp::DefaultGateway), 4);
    assert_eq!(h.platform.count(PlatformOp::NextHopForAll), 0);
    assert_eq!(h.platform.count(PlatformOp::Detach), 1);
    assert_eq!(h.fw.tenant_state(&acme()), None);
    assert!(logs_contain("default gateway: gave up after 4 attempts"));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn rejected_gateway_is_not_retried() {
    let h = Harness::new();
    h.platform.fail(PlatformOp::DefaultGateway, Fault::Always);
    let start = Instant::now();
    assert!(!h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(h.platform.count(PlatformOp::DefaultGateway), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(h.platform.count(PlatformOp::NextHopForAll), 0);
    assert_eq!(h.platform.count(PlatformOp::Detach), 1);
    assert_eq!(h.fw.tenant_state(&acme()), None);
    assert!(logs_contain(
        "create-fw failed at step default-gateway: Network platform call program_default_gateway failed"
    ));
}

#[tokio::test(start_paused = true)]
async fn out_leg_failure_withdraws_in_leg() {
    let h = Harness::new();
    h.queue.reject_nth(1);
    assert!(!h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(
        h.queue.summary(),
        vec![
            (vm(Leg::In), VnicStatus::Up),
            (vm(Leg::Out), VnicStatus::Up),
            (vm(Leg::In), VnicStatus::Down),
        ]
    );
    assert_eq!(
        h.queue.submitted()[2].event_type,
        VnicEventType::Delete
    );
    assert_eq!(h.platform.count(PlatformOp::Detach), 1);
    assert_eq!(h.fw.tenant_state(&acme()), None);
}

#[tokio::test(start_paused = true)]
async fn in_leg_failure_detaches() {
    let h = Harness::new();
    h.queue.reject_nth(0);
    assert!(!h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(h.queue.summary(), vec![(vm(Leg::In), VnicStatus::Up)]);
    assert_eq!(h.platform.count(PlatformOp::Detach), 1);
    assert_eq!(h.fw.tenant_state(&acme()), None);
}

#[tokio::test(start_paused = true)]
async fn waits_for_port_binding() {
    let h = Harness::new();
    h.platform.set_unbound_lookups(&"sub-in".into(), 2);
    let start = Instant::now();
    assert!(h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(h.platform.count(PlatformOp::RouterPort), 4);
    assert_eq!(start.elapsed(), Duration::from_secs(6));
    assert!(h.queue.submitted().iter().all(|e| e.payload.service.host == ACME_HOST));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn unbound_port_without_cached_host_fails() {
    let h = Harness::new();
    h.platform.set_unbound_lookups(&"sub-in".into(), 10);
    assert!(!h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(h.platform.count(PlatformOp::RouterPort), 4);
    assert!(h.queue.submitted().is_empty());
    assert_eq!(h.platform.count(PlatformOp::Detach), 1);
    assert_eq!(h.fw.tenant_state(&acme()), None);
    assert!(logs_contain("Unknown host for port port-in of tenant acme"));
}

#[tokio::test(start_paused = true)]
async fn missing_port_fails_immediately() {
    let h = Harness::new();
    h.platform.remove_port(&"sub-out".into());
    assert!(!h.fw.create_fw(&acme(), &acme_request()).await);
    // in leg announced, then withdrawn by the rollback
    assert_eq!(
        h.queue.summary(),
        vec![(vm(Leg::In), VnicStatus::Up), (vm(Leg::In), VnicStatus::Down)]
    );
    assert_eq!(h.fw.tenant_state(&acme()), None);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn invalid_requests_do_nothing() {
    let h = Harness::new();
    let no_router = FwRequestData {
        tenant_name: Some("acme".to_string()),
        router_id: None,
    };
    assert!(!h.fw.create_fw(&acme(), &no_router).await);
    assert!(!h.fw.create_fw(&acme(), &FwRequestData::default()).await);
    assert!(h.platform.calls().is_empty());
    assert!(logs_contain("create-fw failed at step validate"));
}

#[tokio::test(start_paused = true)]
async fn unknown_tenant_fails() {
    let h = Harness::new();
    assert!(!h.fw.create_fw(&"globex".into(), &acme_request()).await);
    assert!(h.platform.calls().is_empty());
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn panic_is_contained() {
    let h = Harness::new();
    h.platform.fail(PlatformOp::NextHopForAll, Fault::Panic);
    assert!(!h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(h.fw.tenant_state(&acme()), None);
    assert!(logs_contain("injected panic in program_next_hop_for_all"));
    assert!(logs_contain("Rolling back firewall of tenant acme after failure at unexpected"));

    // the legs attached before the panic are detached again
    assert_eq!(h.platform.count(PlatformOp::Attach), 1);
    assert_eq!(h.platform.count(PlatformOp::Detach), 1);
    assert!(matches!(
        h.platform.calls().last(),
        Some(PlatformCall::Detach { router, .. }) if *router == RouterId::from(ACME_ROUTER)
    ));
    assert!(h.queue.submitted().is_empty());

    // the tenant lock was released
    h.platform.heal(PlatformOp::NextHopForAll);
    assert!(h.fw.create_fw(&acme(), &acme_request()).await);
}

#[tokio::test(start_paused = true)]
async fn no_out_gateway_no_default_route() {
    let mut config = acme_config();
    let mut topology = acme_topology();
    topology.out_leg.gateway = None;
    config.tenants.insert(acme(), topology);
    let h = Harness::with_config(config);
    assert!(h.fw.create_fw(&acme(), &acme_request()).await);
    assert_eq!(h.platform.count(PlatformOp::DefaultGateway), 0);
    assert_eq!(h.platform.count(PlatformOp::NextHopForAll), 1);
}

#[tokio::test]
async fn driver_properties() {
    let h = Harness::new();
    assert_eq!(h.fw.name(), "native");
    assert!(h.fw.is_device_virtual());
    assert_eq!(h.fw.max_quota(), 50);
    assert!(h.fw.modify_fw(&acme(), &acme_request()).await);
    assert!(h.platform.calls().is_empty());
}
