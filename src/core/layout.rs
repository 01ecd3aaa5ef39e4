/// Grid layout: rows of widgets on a fixed 12-unit span

use serde::Serialize;

use super::error::{DashboardError, DashboardResult};
use super::widget::{Widget, WidgetKind};

/// Total width every row's widgets add up to
pub const SPAN: u8 = 12;

/// Split `span` across `count` widgets.
///
/// Every widget gets `span / count`; the first one also takes the remainder.
/// Returns an empty vec for `count == 0`.
pub fn compute_widths(count: usize, span: u8) -> Vec<u8> {
    if count == 0 {
        return Vec::new();
    }

    let span = span as usize;
    let base = span / count;
    let remainder = span % count;

    (0..count)
        .map(|i| {
            let width = if i == 0 { base + remainder } else { base };
            width as u8
        })
        .collect()
}

#[derive(Debug)]
pub struct Row {
    name: String,
    widgets: Vec<Widget>,
}

impl Row {
    /// Build a row and assign widget widths.
    ///
    /// A row must hold between 1 and `SPAN` widgets so that every widget ends
    /// up at least one unit wide.
    pub fn new(name: impl Into<String>, mut widgets: Vec<Widget>) -> DashboardResult<Self> {
        let name = name.into();

        if widgets.is_empty() {
            return Err(DashboardError::MalformedConfiguration(format!(
                "row '{}' has no widgets",
                name
            )));
        }
        if widgets.len() > SPAN as usize {
            return Err(DashboardError::MalformedConfiguration(format!(
                "row '{}' has {} widgets, at most {} fit",
                name,
                widgets.len(),
                SPAN
            )));
        }

        let widths = compute_widths(widgets.len(), SPAN);
        for (widget, width) in widgets.iter_mut().zip(widths) {
            widget.set_size(width);
        }

        Ok(Self { name, widgets })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn widths(&self) -> Vec<u8> {
        self.widgets.iter().map(Widget::size).collect()
    }
}

/// The whole page grid. Never mutated once built; a reload builds a new one.
#[derive(Debug)]
pub struct Layout {
    rows: Vec<Row>,
}

impl Layout {
    pub fn new(rows: Vec<Row>) -> DashboardResult<Self> {
        if rows.is_empty() {
            return Err(DashboardError::MalformedConfiguration(
                "layout has no rows".to_string(),
            ));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.rows.iter().flat_map(|row| row.widgets.iter())
    }

    pub fn widget_count(&self) -> usize {
        self.widgets().count()
    }

    /// Serializable description of the grid for the render context
    pub fn view(&self) -> Vec<RowView> {
        self.rows
            .iter()
            .map(|row| RowView {
                name: row.name.clone(),
                widgets: row
                    .widgets
                    .iter()
                    .map(|w| WidgetView {
                        kind: w.kind(),
                        size: w.size(),
                        template: w.template_id(),
                    })
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub name: String,
    pub widgets: Vec<WidgetView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetView {
    pub kind: WidgetKind,
    pub size: u8,
    pub template: &'static str,
}
