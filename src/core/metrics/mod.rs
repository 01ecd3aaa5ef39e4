/// Metric sources
///
/// Each source samples one category of system (or external) state and hands
/// back a typed snapshot. Sources never fail outright: anything that goes
/// wrong is reported as `Sample::Unavailable` so the widget can drop its
/// section for this render.

pub mod cpu;
pub mod load;
pub mod memory;
pub mod now_playing;

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

pub use cpu::{CpuInfo, CpuInfoSource};
pub use load::{LoadAverage, LoadSource};
pub use memory::{MemorySource, MemoryStats};
pub use now_playing::{MprisBackend, NowPlayingSource, PlayerBackend, Track};

/// Capability contract for producing one metric snapshot.
///
/// Implementations must be read-only against OS state so they can be called
/// concurrently with themselves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn sample(&self) -> Sample;
}

/// Result of one `sample()` call
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Data(MetricSnapshot),
    /// No data this cycle. Carries a human-readable reason for the logs.
    Unavailable(String),
}

impl Sample {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Sample::Unavailable(reason.into())
    }
}

/// One immutable snapshot, tagged by the metric kind that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricSnapshot {
    Memory(MemoryStats),
    Cpu(CpuInfo),
    Load(LoadAverage),
    NowPlaying(Track),
    /// Presentation-only widgets have nothing to sample
    Empty,
}

impl MetricSnapshot {
    /// Key under which this snapshot appears in the render context
    pub fn context_key(&self) -> Option<&'static str> {
        match self {
            MetricSnapshot::Memory(_) => Some("mem_data"),
            MetricSnapshot::Cpu(_) => Some("cpu_info"),
            MetricSnapshot::Load(_) => Some("load_data"),
            MetricSnapshot::NowPlaying(_) => Some("music"),
            MetricSnapshot::Empty => None,
        }
    }
}

/// Which family of OS readers to use, probed once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux-style `/proc` files
    Procfs,
    /// Native OS APIs via sysinfo
    Native,
}

impl Platform {
    pub fn detect() -> Self {
        Self::detect_at(Path::new("/proc"))
    }

    fn detect_at(proc_root: &Path) -> Self {
        let readable = ["meminfo", "loadavg", "cpuinfo"]
            .iter()
            .all(|f| std::fs::metadata(proc_root.join(f)).is_ok());

        if readable {
            Platform::Procfs
        } else {
            Platform::Native
        }
    }
}

/// Presentation-only source behind the links widget
pub struct StaticLinks;

#[async_trait]
impl MetricSource for StaticLinks {
    async fn sample(&self) -> Sample {
        Sample::Data(MetricSnapshot::Empty)
    }
}

/// Split a `/proc`-style `key : value` line, skipping blank lines
pub(crate) fn proc_fields(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
}
