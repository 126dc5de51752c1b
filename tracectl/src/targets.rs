// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link-time registry of trace targets.
//!
//! Each crate declares its target once, at its root, with [`trace_target!`](crate::trace_target).
//! The target name is what operators use to tune levels; the module path recorded with it is what
//! the tracing filter matches against.

use linkme::distributed_slice;
use tracing_subscriber::filter::LevelFilter;

/// A named set of tracing events, identified by the module path prefix that emits them.
#[derive(Debug)]
pub struct TraceTarget {
    pub name: &'static str,
    pub path: &'static str,
    pub level: LevelFilter,
    pub tags: &'static [&'static str],
}

impl TraceTarget {
    #[must_use]
    pub const fn new(
        name: &'static str,
        path: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            path,
            level,
            tags,
        }
    }
}

#[distributed_slice]
pub static TRACE_TARGETS: [TraceTarget];

/// Register a trace target for the module where the macro is invoked.
///
/// ```ignore
/// use tracectl::{LevelFilter, trace_target};
/// trace_target!("native", LevelFilter::DEBUG, &["firewall"]);
/// ```
#[macro_export]
macro_rules! trace_target {
    ($name:expr, $level:expr, $tags:expr) => {
        #[$crate::linkme::distributed_slice($crate::targets::TRACE_TARGETS)]
        #[linkme(crate = $crate::linkme)]
        static _TRACE_TARGET: $crate::targets::TraceTarget =
            $crate::targets::TraceTarget::new($name, module_path!(), $level, $tags);
    };
}

#[cfg(test)]
mod tests {
    use super::TRACE_TARGETS;

    #[test]
    fn own_target_is_registered() {
        let target = TRACE_TARGETS
            .iter()
            .find(|t| t.name == "tracectl")
            .expect("tracectl target should be registered");
        assert_eq!(target.path, "fwsvc_tracectl");
    }
}
