/// CLI argument parsing and command output

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::app::AppContext;
use crate::core::{window_start, Layout, SampleRow};

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

pub fn get_version() -> &'static str {
    VERSION_WITH_BUILD
}

#[derive(Parser)]
#[command(name = "newtab-server")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Address to bind to (overrides the settings file)
    #[arg(short, long, global = true)]
    pub bind_host: Option<String>,

    /// Port to listen on (overrides the settings file)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Layout file (INI sections of widgets)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Settings file (TOML)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the dashboard server (default)
    #[cfg(feature = "server")]
    Serve {
        /// Enable CORS for cross-origin requests
        #[arg(long)]
        cors: bool,
    },

    /// Validate the layout file and print its rows
    Check,

    /// Print one render context as JSON
    Snapshot,

    /// Print recorded samples
    History {
        /// How far back to look
        #[arg(short, long, default_value = "60")]
        minutes: i64,
    },
}

// ============================================================================
// Command output
// ============================================================================

/// Table of every widget in the layout, as printed by `check`
pub fn layout_report(layout: &Layout, path: &Path) -> String {
    let mut lines = vec![
        format!("✓ Layout {} is valid\n", path.display()),
        format!("{:<20} {:<12} {:<6} {:<15}", "Row", "Widget", "Size", "Template"),
        "-".repeat(55),
    ];

    for row in layout.view() {
        for widget in &row.widgets {
            lines.push(format!(
                "{:<20} {:<12} {:<6} {:<15}",
                row.name, widget.kind, widget.size, widget.template
            ));
        }
    }

    lines.push(format!(
        "\n{} rows, {} widgets",
        layout.rows().len(),
        layout.widget_count()
    ));
    lines.join("\n")
}

/// One render context as pretty JSON, as printed by `snapshot`
pub async fn snapshot_json(ctx: &AppContext) -> Result<String> {
    let context = ctx.render().await;
    serde_json::to_string_pretty(&context).context("Failed to serialize render context")
}

/// Start of the `history --minutes` window
pub fn history_since(minutes: i64) -> Result<DateTime<Utc>> {
    window_start(minutes)
        .with_context(|| format!("--minutes must be positive and within range, got {}", minutes))
}

/// Sample table, as printed by `history`
pub fn history_report(rows: &[SampleRow], minutes: i64) -> String {
    if rows.is_empty() {
        return format!("No samples in the last {} minutes", minutes);
    }

    let mut lines = vec![
        format!(
            "{:<22} {:>7} {:>7} {:>7} {:>12} {:>12}",
            "Time", "1m", "5m", "15m", "Free kB", "Active kB"
        ),
        "-".repeat(72),
    ];

    for row in rows {
        lines.push(format!(
            "{:<22} {:>7.2} {:>7.2} {:>7.2} {:>12} {:>12}",
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.load_1,
            row.load_5,
            row.load_15,
            row.mem_free,
            row.mem_active
        ));
    }
    lines.join("\n")
}
