// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The firewall processor

use crate::driver::FwDriver;
use crate::processor::fw_client::{FwChannelRequest, FwClient, FwRequest};
use futures::future::OptionFuture;
use platform::TenantId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[allow(unused)]
use tracing::{debug, error, info, warn};

/// Default size of the request channel
pub const DEFAULT_FW_CHANNEL_SIZE: usize = 64;

/// The task serving the requests of one tenant, and the queue feeding it
struct TenantWorker {
    tx: mpsc::UnboundedSender<FwChannelRequest>,
    handle: JoinHandle<()>,
}

/// Handles the requests of [`FwClient`]s with a firewall driver. The requests of a tenant
/// are served one at a time, in the order they were received; distinct tenants are served
/// concurrently.
pub struct FwProcessor {
    driver: Arc<dyn FwDriver>,
    rx: mpsc::Receiver<FwChannelRequest>,
    workers: HashMap<TenantId, TenantWorker>,
}

async fn dispatch(driver: &dyn FwDriver, request: FwRequest) -> bool {
    match request {
        FwRequest::CreateFw(tenant, data) => driver.create_fw(&tenant, &data).await,
        FwRequest::DeleteFw(tenant, data) => driver.delete_fw(&tenant, &data).await,
        FwRequest::ModifyFw(tenant, data) => driver.modify_fw(&tenant, &data).await,
        FwRequest::NetworkCreate(tenant, notif) => driver.nwk_create_notif(&tenant, &notif).await,
        FwRequest::NetworkDelete(tenant, notif) => driver.nwk_delete_notif(&tenant, &notif).await,
    }
}

/// Serve a single request and answer it
async fn serve(driver: Arc<dyn FwDriver>, channel_request: FwChannelRequest) {
    let FwChannelRequest { request, reply_tx } = channel_request;
    let what = request.to_string();
    debug!("Handling request {what}");
    let task = tokio::spawn(async move { dispatch(driver.as_ref(), request).await });
    let outcome = task.await.unwrap_or_else(|e| {
        error!("Request {what} did not complete: {e}");
        false
    });
    if reply_tx.send(outcome).is_err() {
        warn!("Requester of {what} is gone (outcome was {outcome})");
    }
}

/// Serve the queue of a tenant until it runs dry. The queue is closed before leaving, so
/// nothing can be queued that would not be served.
async fn serve_tenant(driver: Arc<dyn FwDriver>, mut rx: mpsc::UnboundedReceiver<FwChannelRequest>) {
    while let Ok(request) = rx.try_recv() {
        serve(driver.clone(), request).await;
    }
    rx.close();
    while let Ok(request) = rx.try_recv() {
        serve(driver.clone(), request).await;
    }
}

impl FwProcessor {
    /// Create a processor and a client to talk to it
    #[must_use]
    pub fn new(driver: Arc<dyn FwDriver>, channel_size: usize) -> (Self, FwClient) {
        let (tx, rx) = mpsc::channel(channel_size.max(1));
        let processor = Self {
            driver,
            rx,
            workers: HashMap::new(),
        };
        (processor, FwClient::new(tx))
    }

    fn handle(&mut self, channel_request: FwChannelRequest) {
        self.workers.retain(|_, worker| !worker.handle.is_finished());
        let tenant = channel_request.request.tenant().clone();

        // queue behind the requests of the tenant still pending
        let channel_request = match self.workers.get(&tenant) {
            Some(worker) => match worker.tx.send(channel_request) {
                Ok(()) => return,
                Err(mpsc::error::SendError(channel_request)) => channel_request,
            },
            None => channel_request,
        };

        // the worker of the tenant, if any, is done taking requests: start a new one once
        // it has served the last of them
        let previous = self.workers.remove(&tenant).map(|worker| worker.handle);
        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(channel_request).is_err() {
            error!("Could not queue request of tenant {tenant}");
            return;
        }
        let driver = self.driver.clone();
        let name = tenant.clone();
        let handle = tokio::spawn(async move {
            if let Some(Err(e)) = OptionFuture::from(previous).await {
                error!("Previous worker of tenant {name} failed: {e}");
            }
            serve_tenant(driver, rx).await;
        });
        self.workers.insert(tenant, TenantWorker { tx, handle });
    }

    /// Serve requests until all the clients are dropped
    pub async fn run(mut self) {
        info!("Firewall processor started (driver {})", self.driver.name());
        while let Some(request) = self.rx.recv().await {
            self.handle(request);
        }
        info!("Firewall processor exiting: no clients left");
    }
}
