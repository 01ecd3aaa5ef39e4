/// Dashboard assembly: samples every widget in a layout and builds the
/// context the page is rendered from
///
/// Each widget is sampled on its own task, so a panicking or failing source
/// only loses its own section. Rendering itself never fails.

use chrono::Local;
use serde::{Deserialize, Serialize};
use sysinfo::System;

use super::layout::{Layout, RowView};
use super::metrics::{CpuInfo, LoadAverage, MemoryStats, MetricSnapshot, Track};
use super::widget::{produce_from, LabeledData};

const TIME_FORMAT: &str = "%A %b %d at %H:%M:%S";

/// Chart and page colors handed to the page as `settings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub background_color: String,
    pub colors: Vec<String>,
    pub title_color: String,
    pub border_color: String,
    pub axis_color: String,
    pub axis_background_color: String,
    pub font_name: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background_color: "#111".to_string(),
            colors: vec![
                "#E84F4F".to_string(),
                "#9B64FB".to_string(),
                "#526f33".to_string(),
            ],
            title_color: "#fff".to_string(),
            border_color: "#333".to_string(),
            axis_color: "#333".to_string(),
            axis_background_color: "#333".to_string(),
            font_name: "monospace".to_string(),
        }
    }
}

/// Who and where we are; resolved once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub user: String,
    pub host: String,
    pub theme: Theme,
}

impl Environment {
    pub fn detect(theme: Theme) -> Self {
        let user = ["USER", "LOGNAME", "USERNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| "unknown".to_string());

        let host = System::host_name().unwrap_or_else(|| "localhost".to_string());

        Self { user, host, theme }
    }
}

/// Everything the page needs for one render.
///
/// Widget sections are `None` (and left out of the JSON) when the widget is
/// not in the layout or had no data this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardContext {
    pub rows: Vec<RowView>,
    pub settings: Theme,
    pub user: String,
    pub host: String,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_data: Option<MemoryStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_info: Option<CpuInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_data: Option<LoadAverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<Track>,
}

impl DashboardContext {
    fn new(rows: Vec<RowView>, env: &Environment) -> Self {
        Self {
            rows,
            settings: env.theme.clone(),
            user: env.user.clone(),
            host: env.host.clone(),
            time: Local::now().format(TIME_FORMAT).to_string(),
            overview: None,
            mem_data: None,
            cpu_info: None,
            load_data: None,
            music: None,
        }
    }

    /// Later widgets win when two fill the same section
    fn merge(&mut self, data: LabeledData) {
        let LabeledData { key, snapshot } = data;
        let Some(key) = key else {
            return;
        };

        match snapshot {
            MetricSnapshot::Memory(stats) => fill(&mut self.mem_data, stats, key),
            MetricSnapshot::Cpu(info) => fill(&mut self.cpu_info, info, key),
            MetricSnapshot::Load(load) => fill(&mut self.load_data, load, key),
            MetricSnapshot::NowPlaying(track) => fill(&mut self.music, track, key),
            MetricSnapshot::Empty => {}
        }
    }
}

fn fill<T>(slot: &mut Option<T>, value: T, key: &'static str) {
    if slot.replace(value).is_some() {
        tracing::warn!(key, "more than one widget fills this section; keeping the last");
    }
}

pub struct DashboardAssembler {
    environment: Environment,
}

impl DashboardAssembler {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub async fn render_context(&self, layout: &Layout) -> DashboardContext {
        // Start every sample before awaiting any of them
        let tasks: Vec<_> = layout
            .widgets()
            .map(|widget| {
                let kind = widget.kind();
                let source = widget.source();
                let task = tokio::spawn(async move { produce_from(kind, source.as_ref()).await });
                (kind, task)
            })
            .collect();

        let mut context = DashboardContext::new(layout.view(), &self.environment);

        for (kind, task) in tasks {
            match task.await {
                Ok(Some(data)) => context.merge(data),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(widget = %kind, "widget sampling task failed: {}", e);
                }
            }
        }

        context.overview = context.load_data.map(|load| load.one);
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::Row;
    use crate::core::metrics::{MockMetricSource, Sample, StaticLinks};
    use crate::core::widget::{Widget, WidgetKind};
    use std::sync::Arc;

    fn environment() -> Environment {
        Environment {
            user: "operator".to_string(),
            host: "box".to_string(),
            theme: Theme::default(),
        }
    }

    fn fixed(sample: Sample) -> Arc<MockMetricSource> {
        let mut source = MockMetricSource::new();
        source.expect_sample().returning(move || sample.clone());
        Arc::new(source)
    }

    fn memory() -> Sample {
        Sample::Data(MetricSnapshot::Memory(MemoryStats {
            free: 1024,
            active: 2048,
            ..Default::default()
        }))
    }

    fn load(one: f64) -> Sample {
        Sample::Data(MetricSnapshot::Load(LoadAverage { one, five: 0.5, fifteen: 0.25 }))
    }

    fn layout(widgets: Vec<Widget>) -> Layout {
        Layout::new(vec![Row::new("row0", widgets).unwrap()]).unwrap()
    }

    #[tokio::test]
    async fn test_unavailable_section_is_omitted() {
        let layout = layout(vec![
            Widget::new(WidgetKind::Memory, fixed(memory())),
            Widget::new(WidgetKind::NowPlaying, fixed(Sample::unavailable("no player"))),
            Widget::new(WidgetKind::Links, Arc::new(StaticLinks)),
        ]);

        let context = DashboardAssembler::new(environment()).render_context(&layout).await;
        assert!(context.mem_data.is_some());
        assert!(context.music.is_none());

        let json = serde_json::to_value(&context).unwrap();
        assert!(json.get("mem_data").is_some());
        assert!(json.get("music").is_none());
        assert_eq!(json["rows"][0]["widgets"].as_array().unwrap().len(), 3);
        assert_eq!(json["user"], "operator");
        assert_eq!(json["host"], "box");
        assert_eq!(json["settings"]["backgroundColor"], "#111");
    }

    #[tokio::test]
    async fn test_every_widget_failing_still_renders() {
        let mut panicking = MockMetricSource::new();
        panicking.expect_sample().returning(|| panic!("sensor exploded"));

        let layout = layout(vec![
            Widget::new(WidgetKind::Memory, fixed(Sample::unavailable("no procfs"))),
            Widget::new(WidgetKind::Load, Arc::new(panicking)),
        ]);

        let context = DashboardAssembler::new(environment()).render_context(&layout).await;
        assert_eq!(context.mem_data, None);
        assert_eq!(context.load_data, None);
        assert_eq!(context.overview, None);
        assert_eq!(context.rows[0].widgets.len(), 2);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let layout = layout(vec![
            Widget::new(WidgetKind::Load, fixed(load(1.0))),
            Widget::new(WidgetKind::Load, fixed(load(2.0))),
        ]);

        let context = DashboardAssembler::new(environment()).render_context(&layout).await;
        assert_eq!(context.load_data.map(|l| l.one), Some(2.0));
        assert_eq!(context.overview, Some(2.0));
    }

    #[tokio::test]
    async fn test_render_is_idempotent() {
        let layout = layout(vec![
            Widget::new(WidgetKind::Memory, fixed(memory())),
            Widget::new(WidgetKind::Load, fixed(load(0.75))),
        ]);
        let assembler = DashboardAssembler::new(environment());

        let first = assembler.render_context(&layout).await;
        let mut second = assembler.render_context(&layout).await;
        second.time = first.time.clone();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_sections_appear_under_their_context_keys() {
        let samples = vec![
            (WidgetKind::Memory, memory()),
            (WidgetKind::CpuInfo, Sample::Data(MetricSnapshot::Cpu(CpuInfo::default()))),
            (WidgetKind::Load, load(0.1)),
            (
                WidgetKind::NowPlaying,
                Sample::Data(MetricSnapshot::NowPlaying(Track {
                    title: "Xtal".to_string(),
                    artist: "Aphex Twin".to_string(),
                    album: None,
                    art_url: None,
                })),
            ),
        ];

        for (kind, sample) in samples {
            let Sample::Data(snapshot) = sample.clone() else {
                unreachable!()
            };
            let key = snapshot.context_key().unwrap();

            let layout = layout(vec![Widget::new(kind, fixed(sample))]);
            let context = DashboardAssembler::new(environment()).render_context(&layout).await;
            let json = serde_json::to_value(&context).unwrap();

            assert!(json.get(key).is_some(), "{} missing for {}", key, kind);
        }
    }

    #[test]
    fn test_theme_defaults_and_overrides() {
        let theme: Theme = toml::from_str("backgroundColor = \"#000\"").unwrap();
        assert_eq!(theme.background_color, "#000");
        assert_eq!(theme.font_name, "monospace");
    }
}
