/// Widget registry: resolves configured widget names to constructors
///
/// The set of kinds is closed (`WidgetKind`). The registry only maps
/// user-facing names onto those kinds, case-insensitively, and knows how to
/// build the matching metric source for the current platform.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::error::{DashboardError, DashboardResult};
use super::metrics::{
    now_playing::DEFAULT_PLAYER_SERVICE, CpuInfoSource, LoadSource, MemorySource, MetricSource,
    NowPlayingSource, Platform, StaticLinks,
};
use super::widget::{Widget, WidgetKind};

/// Builds metric sources; holds everything a source needs beyond its kind
#[derive(Debug, Clone)]
pub struct SourceFactory {
    pub platform: Platform,
    pub player_service: String,
    pub player_timeout: Duration,
}

impl Default for SourceFactory {
    fn default() -> Self {
        Self {
            platform: Platform::detect(),
            player_service: DEFAULT_PLAYER_SERVICE.to_string(),
            player_timeout: Duration::from_secs(2),
        }
    }
}

impl SourceFactory {
    pub fn source(&self, kind: WidgetKind) -> Arc<dyn MetricSource> {
        match kind {
            WidgetKind::Memory => Arc::new(MemorySource::new(self.platform)),
            WidgetKind::CpuInfo => Arc::new(CpuInfoSource::new(self.platform)),
            WidgetKind::Load => Arc::new(LoadSource::new(self.platform)),
            WidgetKind::NowPlaying => Arc::new(NowPlayingSource::mpris(
                self.player_service.clone(),
                self.player_timeout,
            )),
            WidgetKind::Links => Arc::new(StaticLinks),
        }
    }
}

/// Zero-argument constructor for one widget kind
#[derive(Debug, Clone, Copy)]
pub struct Constructor<'a> {
    kind: WidgetKind,
    factory: &'a SourceFactory,
}

impl Constructor<'_> {
    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    /// Build a fresh widget with its own source
    pub fn build(&self) -> Widget {
        Widget::new(self.kind, self.factory.source(self.kind))
    }
}

impl PartialEq for Constructor<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

pub struct WidgetRegistry {
    entries: HashMap<String, WidgetKind>,
    factory: SourceFactory,
}

impl WidgetRegistry {
    pub fn new(factory: SourceFactory) -> Self {
        Self {
            entries: HashMap::new(),
            factory,
        }
    }

    /// Registry with every built-in widget name
    pub fn builtin(factory: SourceFactory) -> Self {
        let mut registry = Self::new(factory);
        registry.register("memory", WidgetKind::Memory);
        registry.register("mem", WidgetKind::Memory);
        registry.register("cpu", WidgetKind::CpuInfo);
        registry.register("cpuinfo", WidgetKind::CpuInfo);
        registry.register("load", WidgetKind::Load);
        registry.register("music", WidgetKind::NowPlaying);
        registry.register("nowplaying", WidgetKind::NowPlaying);
        registry.register("links", WidgetKind::Links);
        registry
    }

    pub fn register(&mut self, name: &str, kind: WidgetKind) {
        self.entries.insert(name.trim().to_lowercase(), kind);
    }

    pub fn resolve(&self, name: &str) -> DashboardResult<Constructor<'_>> {
        self.entries
            .get(&name.trim().to_lowercase())
            .map(|kind| Constructor {
                kind: *kind,
                factory: &self.factory,
            })
            .ok_or_else(|| DashboardError::UnknownWidgetKind(name.to_string()))
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn factory(&self) -> &SourceFactory {
        &self.factory
    }
}
