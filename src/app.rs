/// Application context
///
/// Built once at startup and shared (behind an `Arc`) with the HTTP handlers
/// and CLI commands. It owns the widget registry, the current layout snapshot,
/// the assembler and the history store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::core::{
    ConfigLoader, DashboardAssembler, DashboardContext, DashboardResult, Environment, HistoryStore,
    Layout, PeriodicSampler, SampleRow, SampleSink, SourceFactory, WidgetKind, WidgetRegistry,
};
use crate::core::metrics::Platform;
use crate::utils::AppConfig;

pub struct AppContext {
    config: AppConfig,
    registry: WidgetRegistry,
    loader: ConfigLoader,
    layout: RwLock<Arc<Layout>>,
    assembler: DashboardAssembler,
    history: Option<Arc<HistoryStore>>,
}

impl AppContext {
    /// Probe the platform, load the layout and open the history store.
    ///
    /// Fails if the layout cannot be loaded: the server must not start
    /// without one.
    pub fn new(config: AppConfig) -> Result<Self> {
        let platform = Platform::detect();
        tracing::info!(?platform, "platform probed");

        let registry = WidgetRegistry::builtin(SourceFactory {
            platform,
            player_service: config.now_playing.service.clone(),
            player_timeout: config.now_playing.timeout,
        });

        let history = if config.sampler.enabled {
            let path = config.sampler.store_path()?;
            let store = HistoryStore::open(&path)
                .with_context(|| format!("Failed to open history store at {}", path.display()))?;
            Some(Arc::new(store))
        } else {
            None
        };

        let environment = Environment::detect(config.theme.clone());
        Self::with_parts(config, registry, environment, history)
    }

    /// Assemble a context from already-built parts
    pub fn with_parts(
        config: AppConfig,
        registry: WidgetRegistry,
        environment: Environment,
        history: Option<Arc<HistoryStore>>,
    ) -> Result<Self> {
        let loader = ConfigLoader::new(&config.layout);
        let layout = loader
            .load(&registry)
            .with_context(|| format!("Failed to load layout from {}", loader.path().display()))?;

        Ok(Self {
            config,
            registry,
            loader,
            layout: RwLock::new(Arc::new(layout)),
            assembler: DashboardAssembler::new(environment),
            history,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    /// Current layout. Callers keep this snapshot for the whole render even if
    /// a reload happens meanwhile.
    pub fn layout(&self) -> Arc<Layout> {
        Arc::clone(&self.layout.read())
    }

    /// Re-read the layout file and swap it in. On failure the old layout
    /// stays in place.
    pub fn reload_layout(&self) -> DashboardResult<Arc<Layout>> {
        let layout = Arc::new(self.loader.load(&self.registry)?);
        *self.layout.write() = Arc::clone(&layout);
        Ok(layout)
    }

    pub async fn render(&self) -> DashboardContext {
        let layout = self.layout();
        self.assembler.render_context(&layout).await
    }

    pub fn history_enabled(&self) -> bool {
        self.history.is_some()
    }

    /// Stored samples since `since`; empty when the sampler is disabled
    pub fn history_since(&self, since: DateTime<Utc>) -> DashboardResult<Vec<SampleRow>> {
        match &self.history {
            Some(store) => store.load_since(since),
            None => Ok(Vec::new()),
        }
    }

    /// Background sampler writing to this context's store, if enabled
    pub fn build_sampler(&self) -> Result<Option<PeriodicSampler>> {
        let Some(store) = &self.history else {
            return Ok(None);
        };

        let factory = self.registry.factory();
        let sink: Arc<dyn SampleSink> = Arc::clone(store) as Arc<dyn SampleSink>;
        let sampler = PeriodicSampler::new(
            self.config.sampler.settings(),
            factory.source(WidgetKind::Memory),
            factory.source(WidgetKind::Load),
            sink,
        )?;

        Ok(Some(sampler))
    }
}

/// Context over a temporary layout file, with fixed user and host
#[cfg(test)]
pub(crate) fn test_context(dir: &std::path::Path, layout: &str, history: bool) -> AppContext {
    test_context_with(dir, layout, history, AppConfig::default())
}

/// Like `test_context`, starting from the given settings
#[cfg(test)]
pub(crate) fn test_context_with(
    dir: &std::path::Path,
    layout: &str,
    history: bool,
    mut config: AppConfig,
) -> AppContext {
    let layout_path = dir.join("layout.cfg");
    std::fs::write(&layout_path, layout).unwrap();

    config.layout = layout_path;
    config.sampler.store_path = Some(dir.join("history.jsonl"));

    let store = history.then(|| Arc::new(HistoryStore::open(dir.join("history.jsonl")).unwrap()));
    let registry = WidgetRegistry::builtin(SourceFactory {
        platform: Platform::Procfs,
        ..SourceFactory::default()
    });
    let environment = Environment {
        user: "operator".to_string(),
        host: "box".to_string(),
        theme: crate::core::Theme::default(),
    };

    AppContext::with_parts(config, registry, environment, store).unwrap()
}
