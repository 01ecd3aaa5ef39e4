/// Widgets: one metric source plus the metadata needed to place it on the page

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::metrics::{MetricSnapshot, MetricSource, Sample};

/// Every widget kind the dashboard knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Memory,
    CpuInfo,
    Load,
    NowPlaying,
    Links,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 5] = [
        WidgetKind::Memory,
        WidgetKind::CpuInfo,
        WidgetKind::Load,
        WidgetKind::NowPlaying,
        WidgetKind::Links,
    ];

    /// Template section the page renders this widget with
    pub fn template_id(&self) -> &'static str {
        match self {
            WidgetKind::Memory => "memory.html",
            WidgetKind::CpuInfo => "cpu.html",
            WidgetKind::Load => "load.html",
            WidgetKind::NowPlaying => "music.html",
            WidgetKind::Links => "links.html",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WidgetKind::Memory => "memory",
            WidgetKind::CpuInfo => "cpu",
            WidgetKind::Load => "load",
            WidgetKind::NowPlaying => "music",
            WidgetKind::Links => "links",
        };
        f.pad(name)
    }
}

/// A snapshot together with the context key it is rendered under
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledData {
    pub key: Option<&'static str>,
    pub snapshot: MetricSnapshot,
}

pub struct Widget {
    kind: WidgetKind,
    size: u8,
    source: Arc<dyn MetricSource>,
}

impl Widget {
    pub fn new(kind: WidgetKind, source: Arc<dyn MetricSource>) -> Self {
        Self {
            kind,
            size: super::layout::SPAN,
            source,
        }
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn template_id(&self) -> &'static str {
        self.kind.template_id()
    }

    /// Only the row width pass should call this
    pub(crate) fn set_size(&mut self, size: u8) {
        self.size = size;
    }

    pub(crate) fn source(&self) -> Arc<dyn MetricSource> {
        Arc::clone(&self.source)
    }

    /// Sample the source. `None` means this widget's section is left out of
    /// the render context.
    pub async fn produce(&self) -> Option<LabeledData> {
        produce_from(self.kind, self.source.as_ref()).await
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("kind", &self.kind)
            .field("size", &self.size)
            .finish()
    }
}

/// Shared by `Widget::produce` and the assembler, which runs it on a
/// spawned task against a cloned source handle
pub(crate) async fn produce_from(kind: WidgetKind, source: &dyn MetricSource) -> Option<LabeledData> {
    match source.sample().await {
        Sample::Data(snapshot) => Some(LabeledData {
            key: snapshot.context_key(),
            snapshot,
        }),
        Sample::Unavailable(reason) => {
            tracing::debug!(widget = %kind, %reason, "omitting widget section");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::{LoadAverage, MockMetricSource, StaticLinks};

    #[tokio::test]
    async fn test_produce_labels_snapshot() {
        let mut source = MockMetricSource::new();
        source
            .expect_sample()
            .returning(|| Sample::Data(MetricSnapshot::Load(LoadAverage::default())));

        let widget = Widget::new(WidgetKind::Load, Arc::new(source));
        let data = widget.produce().await.unwrap();
        assert_eq!(data.key, Some("load_data"));
    }

    #[tokio::test]
    async fn test_unavailable_produces_nothing() {
        let mut source = MockMetricSource::new();
        source
            .expect_sample()
            .times(1)
            .returning(|| Sample::unavailable("no player"));

        let widget = Widget::new(WidgetKind::NowPlaying, Arc::new(source));
        assert_eq!(widget.produce().await, None);
    }

    #[tokio::test]
    async fn test_links_have_no_key() {
        let widget = Widget::new(WidgetKind::Links, Arc::new(StaticLinks));
        let data = widget.produce().await.unwrap();
        assert_eq!(data.key, None);
        assert_eq!(widget.template_id(), "links.html");
    }
}
