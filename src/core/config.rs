/// Layout configuration loading
///
/// The layout file is INI-style: each `[section]` is one row, and each
/// `key = kind` line under it adds a widget, left to right in file order.
///
/// ```text
/// [top]
/// a = memory
/// b = links
///
/// [bottom]
/// c = cpu
/// ```

use std::fs;
use std::path::{Path, PathBuf};

use super::error::{DashboardError, DashboardResult};
use super::layout::{Layout, Row, SPAN};
use super::registry::WidgetRegistry;

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetEntry {
    pub key: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionConfig {
    pub name: String,
    pub widgets: Vec<WidgetEntry>,
}

/// Parsed but unresolved layout: rows of widget-kind names
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub sections: Vec<SectionConfig>,
}

impl LayoutConfig {
    pub fn parse(content: &str) -> DashboardResult<Self> {
        let mut sections: Vec<SectionConfig> = Vec::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip comments and blank lines
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        DashboardError::MalformedConfiguration(format!(
                            "line {}: invalid section header '{}'",
                            number + 1,
                            line
                        ))
                    })?;

                sections.push(SectionConfig {
                    name: name.to_string(),
                    widgets: Vec::new(),
                });
                continue;
            }

            let (key, kind) = line
                .split_once('=')
                .or_else(|| line.split_once(':'))
                .ok_or_else(|| {
                    DashboardError::MalformedConfiguration(format!(
                        "line {}: expected 'key = widget', got '{}'",
                        number + 1,
                        line
                    ))
                })?;

            let section = sections.last_mut().ok_or_else(|| {
                DashboardError::MalformedConfiguration(format!(
                    "line {}: widget '{}' appears before any section",
                    number + 1,
                    key.trim()
                ))
            })?;

            section.widgets.push(WidgetEntry {
                key: key.trim().to_string(),
                kind: kind.trim().to_string(),
            });
        }

        if sections.is_empty() {
            return Err(DashboardError::MalformedConfiguration(
                "no sections defined".to_string(),
            ));
        }

        Ok(Self { sections })
    }

    /// Resolve widget names and build the layout.
    ///
    /// Unknown widget kinds are logged and skipped, and a row left with no
    /// widgets is dropped. It is an error if nothing at all survives.
    pub fn build_layout(&self, registry: &WidgetRegistry) -> DashboardResult<Layout> {
        let mut rows = Vec::with_capacity(self.sections.len());

        for section in &self.sections {
            let mut widgets = Vec::with_capacity(section.widgets.len());

            for entry in &section.widgets {
                match registry.resolve(&entry.kind) {
                    Ok(constructor) => widgets.push(constructor.build()),
                    Err(e) => {
                        tracing::warn!(row = %section.name, key = %entry.key, "skipping widget: {}", e);
                    }
                }
            }

            if widgets.is_empty() {
                tracing::warn!(row = %section.name, "skipping row with no usable widgets");
                continue;
            }
            if widgets.len() > SPAN as usize {
                return Err(DashboardError::MalformedConfiguration(format!(
                    "row '{}' has {} widgets, at most {} fit",
                    section.name,
                    widgets.len(),
                    SPAN
                )));
            }

            rows.push(Row::new(section.name.clone(), widgets)?);
        }

        Layout::new(rows)
    }
}

/// Reads the layout file and turns it into a `Layout`
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> DashboardResult<LayoutConfig> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            DashboardError::MalformedConfiguration(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))
        })?;
        LayoutConfig::parse(&content)
    }

    pub fn load(&self, registry: &WidgetRegistry) -> DashboardResult<Layout> {
        let layout = self.read()?.build_layout(registry)?;
        tracing::info!(
            path = %self.path.display(),
            rows = layout.rows().len(),
            widgets = layout.widget_count(),
            "layout loaded"
        );
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::Platform;
    use crate::core::registry::SourceFactory;
    use crate::core::widget::WidgetKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn registry() -> WidgetRegistry {
        WidgetRegistry::builtin(SourceFactory {
            platform: Platform::Procfs,
            ..SourceFactory::default()
        })
    }

    fn layout(content: &str) -> DashboardResult<Layout> {
        LayoutConfig::parse(content)?.build_layout(&registry())
    }

    #[test]
    fn test_parse_sections_in_order() {
        let config = LayoutConfig::parse(
            "# dashboard\n[top]\na = memory\nb=links\n\n; second row\n[bottom]\nc: cpu\n",
        )
        .unwrap();

        assert_eq!(config.sections.len(), 2);
        assert_eq!(config.sections[0].name, "top");
        assert_eq!(
            config.sections[0].widgets,
            vec![
                WidgetEntry { key: "a".to_string(), kind: "memory".to_string() },
                WidgetEntry { key: "b".to_string(), kind: "links".to_string() },
            ]
        );
        assert_eq!(config.sections[1].widgets[0].kind, "cpu");
    }

    #[test]
    fn test_zero_sections_is_fatal() {
        assert!(matches!(
            LayoutConfig::parse("# nothing here\n"),
            Err(DashboardError::MalformedConfiguration(_))
        ));
        assert!(matches!(
            LayoutConfig::parse("a = memory\n"),
            Err(DashboardError::MalformedConfiguration(_))
        ));
        assert!(LayoutConfig::parse("[]\n").is_err());
    }

    #[test]
    fn test_single_widget() {
        let layout = layout("[row0]\na = memory\n").unwrap();
        assert_eq!(layout.rows().len(), 1);
        assert_eq!(layout.rows()[0].widgets().len(), 1);
        assert_eq!(layout.rows()[0].widths(), vec![12]);
    }

    #[test]
    fn test_two_widgets_split_evenly() {
        let layout = layout("[row0]\na=memory\nb=links\n").unwrap();
        let row = &layout.rows()[0];

        let kinds: Vec<_> = row.widgets().iter().map(|w| w.kind()).collect();
        assert_eq!(kinds, vec![WidgetKind::Memory, WidgetKind::Links]);
        assert_eq!(row.widths(), vec![6, 6]);
    }

    #[test]
    fn test_three_and_five_widgets() {
        let three = layout("[row0]\na=memory\nb=links\nc=cpu\n").unwrap();
        assert_eq!(three.rows()[0].widths(), vec![4, 4, 4]);

        let five = layout("[row0]\na=memory\nb=links\nc=cpu\nd=load\ne=links\n").unwrap();
        assert_eq!(five.rows()[0].widths(), vec![4, 2, 2, 2, 2]);
    }

    #[test]
    fn test_unknown_kinds_are_skipped() {
        let layout = layout("[row0]\na=memory\nb=bogus\n[row1]\nc=nope\n[row2]\nd=Load\n").unwrap();

        // row1 only had an unknown widget and is dropped
        assert_eq!(layout.rows().len(), 2);
        assert_eq!(layout.rows()[0].widths(), vec![12]);
        assert_eq!(layout.rows()[1].name(), "row2");
    }

    #[test]
    fn test_nothing_usable_is_fatal() {
        assert!(matches!(
            layout("[row0]\na=bogus\n"),
            Err(DashboardError::MalformedConfiguration(_))
        ));
    }

    #[test]
    fn test_loader_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[row0]").unwrap();
        writeln!(file, "a = memory").unwrap();
        writeln!(file, "b = load").unwrap();

        let layout = ConfigLoader::new(file.path()).load(&registry()).unwrap();
        assert_eq!(layout.widget_count(), 2);
    }

    #[test]
    fn test_loader_missing_file() {
        let err = ConfigLoader::new("/nonexistent/newtab.cfg").read().unwrap_err();
        assert!(matches!(err, DashboardError::MalformedConfiguration(_)));
    }
}
