// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runtime control of tracing levels per registered target

use crate::targets::{TRACE_TARGETS, TraceTarget};
use ordermap::OrderMap;
use parking_lot::Mutex;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Registry, fmt, reload};

/// Level applied to events that do not belong to any registered target
pub const DEFAULT_DEFAULT_LOGLEVEL: LevelFilter = LevelFilter::INFO;

/// Keyword selecting the default level in a tracing configuration string
const DEFAULT_KEY: &str = "default";
/// Prefix selecting a tag in a tracing configuration string
const TAG_PREFIX: &str = "tag:";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TraceCtlError {
    #[error("Unknown trace target '{0}'")]
    UnknownTarget(String),
    #[error("Unknown trace tag '{0}'")]
    UnknownTag(String),
    #[error("Invalid log level '{0}'")]
    InvalidLevel(String),
    #[error("Invalid tracing directive '{0}': expected <target|tag:name|default>=<level>")]
    InvalidDirective(String),
    #[error("Failed to build tracing filter: {0}")]
    FilterError(String),
    #[error("Failed to reload tracing filter: {0}")]
    ReloadFailed(String),
}

#[derive(Clone, Debug)]
pub(crate) struct TargetCfg {
    pub(crate) name: &'static str,
    pub(crate) path: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
}

/// The current level of every registered target
#[derive(Clone, Debug)]
pub(crate) struct TraceDb {
    pub(crate) default: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
}

fn parse_level(level: &str) -> Result<LevelFilter, TraceCtlError> {
    LevelFilter::from_str(level.trim()).map_err(|_| TraceCtlError::InvalidLevel(level.to_owned()))
}

impl TraceDb {
    pub(crate) fn from_targets(targets: &[TraceTarget]) -> Self {
        let mut sorted: Vec<&TraceTarget> = targets.iter().collect();
        sorted.sort_by_key(|t| t.name);
        let targets = sorted
            .into_iter()
            .map(|t| {
                let cfg = TargetCfg {
                    name: t.name,
                    path: t.path,
                    level: t.level,
                    tags: t.tags,
                };
                (t.name, cfg)
            })
            .collect();
        Self {
            default: DEFAULT_DEFAULT_LOGLEVEL,
            targets,
        }
    }

    fn set_level(&mut self, name: &str, level: LevelFilter) -> Result<(), TraceCtlError> {
        let target = self
            .targets
            .get_mut(name)
            .ok_or_else(|| TraceCtlError::UnknownTarget(name.to_owned()))?;
        target.level = level;
        Ok(())
    }

    fn set_tag_level(&mut self, tag: &str, level: LevelFilter) -> Result<(), TraceCtlError> {
        let mut found = false;
        let tagged = self
            .targets
            .values_mut()
            .filter(|t| t.tags.iter().any(|x| *x == tag));
        for target in tagged {
            target.level = level;
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(TraceCtlError::UnknownTag(tag.to_owned()))
        }
    }

    /// Apply a comma-separated list of `key=level` directives
    fn apply_string(&mut self, input: &str) -> Result<(), TraceCtlError> {
        for directive in input.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let (key, level) = directive
                .split_once('=')
                .ok_or_else(|| TraceCtlError::InvalidDirective(directive.to_owned()))?;
            let key = key.trim();
            let level = parse_level(level)?;
            if key == DEFAULT_KEY {
                self.default = level;
            } else if let Some(tag) = key.strip_prefix(TAG_PREFIX) {
                self.set_tag_level(tag, level)?;
            } else if key.is_empty() {
                return Err(TraceCtlError::InvalidDirective(directive.to_owned()));
            } else {
                self.set_level(key, level)?;
            }
        }
        Ok(())
    }

    /// Directives understood by `EnvFilter`
    pub(crate) fn directives(&self) -> String {
        let mut out = self.default.to_string();
        for target in self.targets.values() {
            out.push_str(&format!(",{}={}", target.path, target.level));
        }
        out
    }

    /// Directives understood by [`TracingControl::setup_from_string`]
    pub(crate) fn config_string(&self) -> String {
        let mut out = format!("{DEFAULT_KEY}={}", self.default);
        for target in self.targets.values() {
            out.push_str(&format!(",{}={}", target.name, target.level));
        }
        out
    }

    fn filter(&self) -> Result<EnvFilter, TraceCtlError> {
        EnvFilter::try_new(self.directives()).map_err(|e| TraceCtlError::FilterError(e.to_string()))
    }
}

/// Object to control the tracing levels of the process
pub struct TracingControl {
    db: Mutex<TraceDb>,
    reload: Option<reload::Handle<EnvFilter, Registry>>,
}

static TRACE_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get the process-wide [`TracingControl`]. The first call installs the global subscriber.
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACE_CTL.get_or_init(TracingControl::install)
}

impl TracingControl {
    fn install() -> Self {
        let db = TraceDb::from_targets(&TRACE_TARGETS);
        let filter = db
            .filter()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DEFAULT_LOGLEVEL.to_string()));
        let (layer, handle) = reload::Layer::new(filter);

        // someone else (e.g. a test harness) may own the global subscriber already
        let reload = tracing_subscriber::registry()
            .with(layer)
            .with(fmt::layer().with_target(true))
            .try_init()
            .ok()
            .map(|()| handle);
        if reload.is_none() {
            tracing::warn!("A global subscriber was already set: tracing control is detached");
        }
        Self {
            db: Mutex::new(db),
            reload,
        }
    }

    #[cfg(test)]
    pub(crate) fn detached(targets: &[TraceTarget]) -> Self {
        Self {
            db: Mutex::new(TraceDb::from_targets(targets)),
            reload: None,
        }
    }

    /// Tell if this object controls the global subscriber
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.reload.is_some()
    }

    fn commit(&self, db: &TraceDb) -> Result<(), TraceCtlError> {
        if let Some(handle) = &self.reload {
            let filter = db.filter()?;
            handle
                .reload(filter)
                .map_err(|e| TraceCtlError::ReloadFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn update<F>(&self, change: F) -> Result<(), TraceCtlError>
    where
        F: FnOnce(&mut TraceDb) -> Result<(), TraceCtlError>,
    {
        let mut db = self.db.lock();
        let mut updated = db.clone();
        change(&mut updated)?;
        self.commit(&updated)?;
        *db = updated;
        Ok(())
    }

    /// Set the level for events outside of registered targets
    pub fn set_default_level(&self, level: LevelFilter) -> Result<(), TraceCtlError> {
        self.update(|db| {
            db.default = level;
            Ok(())
        })
    }

    /// Set the level of the target called `target`
    pub fn set_level(&self, target: &str, level: LevelFilter) -> Result<(), TraceCtlError> {
        self.update(|db| db.set_level(target, level))
    }

    /// Set the level of all targets carrying `tag`
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) -> Result<(), TraceCtlError> {
        self.update(|db| db.set_tag_level(tag, level))
    }

    /// Configure levels from a string like `default=info,native=debug,tag:firewall=trace`.
    /// The configuration is applied atomically: nothing changes if any directive is invalid.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        self.update(|db| db.apply_string(input))
    }

    #[must_use]
    pub fn default_level(&self) -> LevelFilter {
        self.db.lock().default
    }

    #[must_use]
    pub fn level(&self, target: &str) -> Option<LevelFilter> {
        self.db.lock().targets.get(target).map(|t| t.level)
    }

    /// Targets and their levels, one per line
    #[must_use]
    pub fn as_string(&self) -> String {
        self.db.lock().to_string()
    }

    /// Targets grouped by tag
    #[must_use]
    pub fn as_string_by_tag(&self) -> String {
        self.db.lock().by_tag()
    }

    /// The current levels as a string that [`TracingControl::setup_from_string`] accepts
    #[must_use]
    pub fn as_config_string(&self) -> String {
        self.db.lock().config_string()
    }
}
