// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors of the firewall sequencer. Callers of the driver only ever see a boolean;
//! these types exist so that every failure is logged with the step that caused it.

use config::{ConfigError, Leg};
use futures::FutureExt;
use platform::{FabricError, PlatformError, PortId, SubnetId, TenantId};
use std::any::Any;
use std::panic::AssertUnwindSafe;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FwError {
    #[error("Service topology unresolved: {0}")]
    TopologyUnresolved(String),
    #[error("Network platform call {op} failed: {source}")]
    PlatformCallFailed {
        op: &'static str,
        source: PlatformError,
    },
    #[error("Fabric controller call failed: {0}")]
    FabricCallFailed(#[from] FabricError),
    #[error("Failed to emit event for {leg} leg: {reason}")]
    EventEmitFailed { leg: Leg, reason: String },
    #[error("{what}: gave up after {attempts} attempts, last error: {last}")]
    RetryExhausted {
        what: &'static str,
        attempts: u32,
        last: String,
    },
    #[error("No router found for tenant {0}")]
    RouterNotFound(TenantId),
    #[error("No router port on subnet {0}")]
    PortNotFound(SubnetId),
    #[error("Router port {0} has no fixed address")]
    PortWithoutAddress(PortId),
    #[error("Unknown host for port {port} of tenant {tenant}")]
    HostUnresolved { tenant: TenantId, port: PortId },
    #[error("Internal failure: {0}")]
    Internal(String),
}

impl From<ConfigError> for FwError {
    fn from(error: ConfigError) -> Self {
        FwError::TopologyUnresolved(error.to_string())
    }
}

impl FwError {
    /// Build a closure mapping a [`PlatformError`] of operation `op`
    pub(crate) fn platform(op: &'static str) -> impl FnOnce(PlatformError) -> FwError {
        move |source| FwError::PlatformCallFailed { op, source }
    }
}

/// The operations of the sequencer
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
    CreateFw,
    DeleteFw,
    NetworkCreate,
    NetworkDelete,
}

/// The step of an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Step {
    Validate,
    ResolveTopology,
    ResolveRouter,
    AttachInterfaces,
    StaticRoutes,
    DefaultGateway,
    NextHops,
    InLegUp,
    OutLegUp,
    DetachInterfaces,
    NextHop,
    /// a fault outside of any expected failure (e.g. a panicking collaborator)
    Unexpected,
}

/// A failed operation, with the step that failed
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{op} failed at step {step}: {source}")]
pub struct SequenceError {
    pub op: Operation,
    pub step: Step,
    pub source: FwError,
}

/// Tag the error of a fallible step with the operation and step it belongs to
pub(crate) trait AtStep<T> {
    fn at(self, op: Operation, step: Step) -> Result<T, SequenceError>;
}

impl<T, E: Into<FwError>> AtStep<T> for Result<T, E> {
    fn at(self, op: Operation, step: Step) -> Result<T, SequenceError> {
        self.map_err(|e| SequenceError {
            op,
            step,
            source: e.into(),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run (part of) an operation, turning a panic into an error at [`Step::Unexpected`]
pub(crate) async fn catch_fault<F>(op: Operation, operation: F) -> Result<(), SequenceError>
where
    F: Future<Output = Result<(), SequenceError>>,
{
    AssertUnwindSafe(operation)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(SequenceError {
                op,
                step: Step::Unexpected,
                source: FwError::Internal(panic_message(&*panic)),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_error_display() {
        let result: Result<(), PlatformError> = Err(PlatformError::NotReady("gw".to_string()));
        let error = result
            .map_err(FwError::platform("program_default_gateway"))
            .at(Operation::CreateFw, Step::DefaultGateway)
            .unwrap_err();
        assert_eq!(error.step, Step::DefaultGateway);
        assert_eq!(
            error.to_string(),
            "create-fw failed at step default-gateway: Network platform call program_default_gateway failed: gw is not ready"
        );
    }

    async fn crash() -> Result<(), SequenceError> {
        panic!("boom")
    }

    #[tokio::test]
    async fn panics_become_unexpected_failures() {
        let error = catch_fault(Operation::DeleteFw, crash()).await.unwrap_err();
        assert_eq!(error.step, Step::Unexpected);
        assert_eq!(error.source, FwError::Internal("boom".to_string()));
        let fine = async { Ok::<(), SequenceError>(()) };
        assert_eq!(catch_fault(Operation::DeleteFw, fine).await, Ok(()));
    }

    #[test]
    fn config_errors_mean_unresolved_topology() {
        let error = FwError::from(ConfigError::NoSuchTenant("acme".into()));
        assert_eq!(
            error,
            FwError::TopologyUnresolved("No service topology for tenant acme".to_string())
        );
    }
}
