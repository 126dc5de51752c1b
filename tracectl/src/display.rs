// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display of tracing targets

use crate::control::TraceDb;
use ordermap::OrderMap;
use std::fmt::Display;

macro_rules! TARGET_FMT {
    ($name:expr, $level:expr, $path:expr, $tags:expr) => {
        format_args!("  {:<16} {:<6} {:<28} {}", $name, $level, $path, $tags)
    };
}

impl Display for TraceDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, " default level: {}", self.default)?;
        writeln!(f, "{}", TARGET_FMT!("target", "level", "path", "tags"))?;
        for target in self.targets.values() {
            writeln!(
                f,
                "{}",
                TARGET_FMT!(
                    target.name,
                    target.level.to_string(),
                    target.path,
                    target.tags.join(",")
                )
            )?;
        }
        Ok(())
    }
}

impl TraceDb {
    pub(crate) fn by_tag(&self) -> String {
        let mut tags: OrderMap<&str, Vec<&str>> = OrderMap::new();
        for target in self.targets.values() {
            for tag in target.tags {
                tags.entry(*tag).or_default().push(target.name);
            }
        }
        tags.sort_keys();
        let mut out = String::new();
        for (tag, names) in &tags {
            out.push_str(&format!(" {tag}: {}\n", names.join(", ")));
        }
        out
    }
}
