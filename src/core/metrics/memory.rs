/// Memory statistics, all numbers in kilobytes

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use sysinfo::System;

use super::{proc_fields, MetricSnapshot, MetricSource, Platform, Sample};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub free: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<u64>,
    pub active: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffers: Option<u64>,
    #[serde(rename = "swap", skip_serializing_if = "Option::is_none")]
    pub swap_cached: Option<u64>,
}

pub struct MemorySource {
    platform: Platform,
    meminfo_path: PathBuf,
}

impl MemorySource {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            meminfo_path: PathBuf::from("/proc/meminfo"),
        }
    }

    /// Read from a specific meminfo file instead of `/proc/meminfo`
    pub fn with_meminfo_path(path: impl Into<PathBuf>) -> Self {
        Self {
            platform: Platform::Procfs,
            meminfo_path: path.into(),
        }
    }

    async fn read_procfs(&self) -> Result<MemoryStats> {
        let content = tokio::fs::read_to_string(&self.meminfo_path)
            .await
            .with_context(|| format!("Failed to read {}", self.meminfo_path.display()))?;
        parse_meminfo(&content)
    }

    fn read_native() -> Result<MemoryStats> {
        let mut sys = System::new();
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err(anyhow!("native memory API reported zero total memory"));
        }

        let free = sys.available_memory();
        Ok(MemoryStats {
            free: free / 1024,
            cache: None,
            active: total.saturating_sub(free) / 1024,
            total: Some(total / 1024),
            buffers: None,
            swap_cached: None,
        })
    }
}

#[async_trait]
impl MetricSource for MemorySource {
    async fn sample(&self) -> Sample {
        tracing::debug!(platform = ?self.platform, "sampling memory");

        let stats = match self.platform {
            Platform::Procfs => self.read_procfs().await,
            Platform::Native => Self::read_native(),
        };

        match stats {
            Ok(stats) => Sample::Data(MetricSnapshot::Memory(stats)),
            Err(e) => Sample::unavailable(format!("memory: {:#}", e)),
        }
    }
}

/// Parse the contents of `/proc/meminfo`
pub fn parse_meminfo(content: &str) -> Result<MemoryStats> {
    let mut free = None;
    let mut active = None;
    let mut stats = MemoryStats::default();

    for (key, value) in proc_fields(content) {
        let kb = || -> Result<u64> {
            value
                .trim_end_matches("kB")
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid value for {}: {}", key, value))
        };

        match key {
            "MemTotal" => stats.total = Some(kb()?),
            "MemFree" => free = Some(kb()?),
            "Buffers" => stats.buffers = Some(kb()?),
            "Cached" => stats.cache = Some(kb()?),
            "SwapCached" => stats.swap_cached = Some(kb()?),
            "Active" => active = Some(kb()?),
            _ => {}
        }
    }

    stats.free = free.ok_or_else(|| anyhow!("MemFree missing from meminfo"))?;
    stats.active = active.ok_or_else(|| anyhow!("Active missing from meminfo"))?;
    Ok(stats)
}
