//! Per-build context
//!
//! Owns the records a build step accumulates while installing runtimes:
//! cache hits and misses, the runtime versions that were installed and the
//! bill-of-materials entries reported to the platform. One context is created
//! by the top-level invocation and passed by reference to every install.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::BuildConfig;

/// Result of checking a layer against a fresh resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutcome {
    Hit,
    Miss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEvent {
    pub layer: String,
    pub outcome: CacheOutcome,
}

/// Bill-of-materials entry for an installed runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BomEntry {
    pub name: String,
    pub version: String,
    pub launch: bool,
    pub build: bool,
}

#[derive(Debug, Clone)]
pub struct BuildContext {
    stack_id: String,
    config: BuildConfig,
    cache_events: Vec<CacheEvent>,
    installed: BTreeMap<String, String>,
    bom: Vec<BomEntry>,
}

impl BuildContext {
    pub fn new(stack_id: impl Into<String>, config: BuildConfig) -> Self {
        Self {
            stack_id: stack_id.into(),
            config,
            cache_events: Vec::new(),
            installed: BTreeMap::new(),
            bom: Vec::new(),
        }
    }

    /// Forget everything recorded so far, keeping stack and configuration
    pub fn reset(&mut self) {
        self.cache_events.clear();
        self.installed.clear();
        self.bom.clear();
    }

    pub fn stack_id(&self) -> &str {
        &self.stack_id
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn cache_hit(&mut self, layer: &str) {
        self.record_cache(layer, CacheOutcome::Hit);
    }

    pub fn cache_miss(&mut self, layer: &str) {
        self.record_cache(layer, CacheOutcome::Miss);
    }

    fn record_cache(&mut self, layer: &str, outcome: CacheOutcome) {
        self.cache_events.push(CacheEvent {
            layer: layer.to_string(),
            outcome,
        });
    }

    pub fn cache_events(&self) -> &[CacheEvent] {
        &self.cache_events
    }

    /// Latest outcome recorded for a layer
    pub fn cache_outcome(&self, layer: &str) -> Option<CacheOutcome> {
        self.cache_events
            .iter()
            .rev()
            .find(|event| event.layer == layer)
            .map(|event| event.outcome)
    }

    pub fn set_installed_version(&mut self, runtime: &str, version: &str) {
        self.installed
            .insert(runtime.to_string(), version.to_string());
    }

    pub fn installed_version(&self, runtime: &str) -> Option<&str> {
        self.installed.get(runtime).map(String::as_str)
    }

    pub fn installed_versions(&self) -> &BTreeMap<String, String> {
        &self.installed
    }

    /// Record an installed runtime in the bill of materials.
    /// A later entry for the same name replaces the earlier one.
    pub fn add_bom_entry(&mut self, entry: BomEntry) {
        self.bom.retain(|existing| existing.name != entry.name);
        self.bom.push(entry);
    }

    pub fn bom(&self) -> &[BomEntry] {
        &self.bom
    }
}
