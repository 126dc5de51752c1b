// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Interface to the firewall processor

use crate::requests::{FwRequestData, NetworkCreateNotif, NetworkDeleteNotif};
use platform::TenantId;
use std::fmt::Display;
use tokio::sync::mpsc::Sender;
use tokio::sync::oneshot;
use tokio::sync::oneshot::Receiver;

#[allow(unused)]
use tracing::{debug, error, info};

use thiserror::Error;

/// A request to the [`crate::FwProcessor`]
#[derive(Debug, Clone)]
pub enum FwRequest {
    CreateFw(TenantId, FwRequestData),
    DeleteFw(TenantId, FwRequestData),
    ModifyFw(TenantId, FwRequestData),
    NetworkCreate(TenantId, NetworkCreateNotif),
    NetworkDelete(TenantId, NetworkDeleteNotif),
}

impl FwRequest {
    #[must_use]
    pub fn tenant(&self) -> &TenantId {
        match self {
            FwRequest::CreateFw(tenant, _)
            | FwRequest::DeleteFw(tenant, _)
            | FwRequest::ModifyFw(tenant, _)
            | FwRequest::NetworkCreate(tenant, _)
            | FwRequest::NetworkDelete(tenant, _) => tenant,
        }
    }
}

impl Display for FwRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FwRequest::CreateFw(tenant, _) => write!(f, "create-fw tenant {tenant}"),
            FwRequest::DeleteFw(tenant, _) => write!(f, "delete-fw tenant {tenant}"),
            FwRequest::ModifyFw(tenant, _) => write!(f, "modify-fw tenant {tenant}"),
            FwRequest::NetworkCreate(tenant, notif) => {
                write!(f, "network-create tenant {tenant} cidr {}", notif.cidr)
            }
            FwRequest::NetworkDelete(tenant, notif) => {
                write!(f, "network-delete tenant {tenant} network {}", notif.network_id)
            }
        }
    }
}

/// A request to the processor plus the channel to answer it
pub struct FwChannelRequest {
    pub(crate) request: FwRequest,
    pub(crate) reply_tx: oneshot::Sender<bool>,
}
impl FwChannelRequest {
    #[must_use]
    pub fn new(request: FwRequest) -> (Self, Receiver<bool>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        (Self { request, reply_tx }, reply_rx)
    }
}

/// The type of errors that can happen when issuing requests to a [`crate::FwProcessor`]
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum FwProcessorError {
    #[error("Failure sending request to firewall processor: {0}")]
    SendRequestError(#[from] tokio::sync::mpsc::error::SendError<FwChannelRequest>),
    #[error("Failure receiving response from firewall processor: {0}")]
    RecvResponseError(#[from] tokio::sync::oneshot::error::RecvError),
}

/// A cloneable object that allows sending requests to a [`crate::FwProcessor`].
#[derive(Clone)]
pub struct FwClient {
    tx: Sender<FwChannelRequest>,
}

impl FwClient {
    #[must_use]
    pub fn new(channel_tx: Sender<FwChannelRequest>) -> Self {
        Self { tx: channel_tx }
    }

    /// Submit a request and wait for its outcome.
    ///
    /// # Errors
    /// Fails if the processor is gone, before or while handling the request.
    pub async fn request(&self, request: FwRequest) -> Result<bool, FwProcessorError> {
        let (req, rx) = FwChannelRequest::new(request);
        self.tx.send(req).await?;
        Ok(rx.await?)
    }

    async fn outcome(&self, request: FwRequest) -> bool {
        let what = request.to_string();
        self.request(request).await.unwrap_or_else(|e| {
            error!("Request {what} failed: {e}");
            false
        })
    }

    pub async fn create_fw(&self, tenant: TenantId, data: FwRequestData) -> bool {
        self.outcome(FwRequest::CreateFw(tenant, data)).await
    }
    pub async fn delete_fw(&self, tenant: TenantId, data: FwRequestData) -> bool {
        self.outcome(FwRequest::DeleteFw(tenant, data)).await
    }
    pub async fn modify_fw(&self, tenant: TenantId, data: FwRequestData) -> bool {
        self.outcome(FwRequest::ModifyFw(tenant, data)).await
    }
    pub async fn nwk_create_notif(&self, tenant: TenantId, notif: NetworkCreateNotif) -> bool {
        self.outcome(FwRequest::NetworkCreate(tenant, notif)).await
    }
    pub async fn nwk_delete_notif(&self, tenant: TenantId, notif: NetworkDeleteNotif) -> bool {
        self.outcome(FwRequest::NetworkDelete(tenant, notif)).await
    }
}
