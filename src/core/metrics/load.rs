/// System load averages over the last 1, 5 and 15 minutes

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use sysinfo::System;

use super::{MetricSnapshot, MetricSource, Platform, Sample};

/// Serialized with the minute offset as key: `{"1": .., "5": .., "15": ..}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAverage {
    #[serde(rename = "1")]
    pub one: f64,
    #[serde(rename = "5")]
    pub five: f64,
    #[serde(rename = "15")]
    pub fifteen: f64,
}

pub struct LoadSource {
    platform: Platform,
    loadavg_path: PathBuf,
}

impl LoadSource {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            loadavg_path: PathBuf::from("/proc/loadavg"),
        }
    }

    pub fn with_loadavg_path(path: impl Into<PathBuf>) -> Self {
        Self {
            platform: Platform::Procfs,
            loadavg_path: path.into(),
        }
    }

    async fn read_procfs(&self) -> Result<LoadAverage> {
        let content = tokio::fs::read_to_string(&self.loadavg_path)
            .await
            .with_context(|| format!("Failed to read {}", self.loadavg_path.display()))?;
        parse_loadavg(&content)
    }

    fn read_native() -> LoadAverage {
        let load = System::load_average();
        LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        }
    }
}

#[async_trait]
impl MetricSource for LoadSource {
    async fn sample(&self) -> Sample {
        tracing::debug!(platform = ?self.platform, "sampling load average");

        let load = match self.platform {
            Platform::Procfs => self.read_procfs().await,
            Platform::Native => Ok(Self::read_native()),
        };

        match load {
            Ok(load) => Sample::Data(MetricSnapshot::Load(load)),
            Err(e) => Sample::unavailable(format!("load: {:#}", e)),
        }
    }
}

/// Parse the first three fields of `/proc/loadavg`
pub fn parse_loadavg(content: &str) -> Result<LoadAverage> {
    let mut fields = content.split_whitespace();
    let mut next = |label: &str| -> Result<f64> {
        fields
            .next()
            .ok_or_else(|| anyhow!("loadavg is missing the {} minute field", label))?
            .parse::<f64>()
            .with_context(|| format!("Invalid {} minute load", label))
    };

    Ok(LoadAverage {
        one: next("1")?,
        five: next("5")?,
        fifteen: next("15")?,
    })
}
