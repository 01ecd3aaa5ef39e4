/// Processor information aggregated over all logical CPUs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

use super::{proc_fields, MetricSnapshot, MetricSource, Platform, Sample};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuInfo {
    #[serde(rename = "proc_count")]
    pub processor_count: usize,
    #[serde(rename = "model", skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(rename = "speed", skip_serializing_if = "Option::is_none")]
    pub clock_speed: Option<String>,
    #[serde(rename = "cache", skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<String>,
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub hardware: Option<String>,
    #[serde(rename = "address", skip_serializing_if = "Option::is_none")]
    pub address_sizes: Option<String>,
}

pub struct CpuInfoSource {
    platform: Platform,
    cpuinfo_path: PathBuf,
}

impl CpuInfoSource {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            cpuinfo_path: PathBuf::from("/proc/cpuinfo"),
        }
    }

    async fn read_procfs(&self) -> Result<CpuInfo> {
        let content = tokio::fs::read_to_string(&self.cpuinfo_path)
            .await
            .with_context(|| format!("Failed to read {}", self.cpuinfo_path.display()))?;
        Ok(parse_cpuinfo(&content))
    }

    fn read_native() -> Result<CpuInfo> {
        let sys = System::new_with_specifics(
            RefreshKind::new().with_cpu(CpuRefreshKind::new().with_frequency()),
        );

        let cpus = sys.cpus();
        let first = cpus
            .first()
            .ok_or_else(|| anyhow!("native CPU API reported no processors"))?;

        Ok(CpuInfo {
            processor_count: cpus.len(),
            model_name: Some(first.brand().trim().to_string()).filter(|s| !s.is_empty()),
            clock_speed: Some(format!("{} MHz", first.frequency())),
            cache_size: None,
            hardware: None,
            address_sizes: None,
        })
    }
}

#[async_trait]
impl MetricSource for CpuInfoSource {
    async fn sample(&self) -> Sample {
        tracing::debug!(platform = ?self.platform, "sampling cpu info");

        let info = match self.platform {
            Platform::Procfs => self.read_procfs().await,
            Platform::Native => Self::read_native(),
        };

        match info {
            Ok(info) => Sample::Data(MetricSnapshot::Cpu(info)),
            Err(e) => Sample::unavailable(format!("cpu: {:#}", e)),
        }
    }
}

/// Parse `/proc/cpuinfo`.
///
/// The processor count goes up once per `processor` entry. Every other field
/// keeps the last value seen, so differing values across processors overwrite
/// each other.
pub fn parse_cpuinfo(content: &str) -> CpuInfo {
    let mut info = CpuInfo::default();

    for (key, value) in proc_fields(content) {
        let value = value.to_string();
        match key {
            "processor" => info.processor_count += 1,
            "model name" => info.model_name = Some(value),
            "cache size" => info.cache_size = Some(value),
            "address sizes" => info.address_sizes = Some(value),
            k if k.eq_ignore_ascii_case("bogomips") => info.clock_speed = Some(value),
            k if k.eq_ignore_ascii_case("hardware") => info.hardware = Some(value),
            _ => {}
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpuinfo_counts_processors() {
        let content = "processor\t: 0\n\
                       model name\t: Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz\n\
                       cache size\t: 6144 KB\n\
                       bogomips\t: 3600.00\n\
                       address sizes\t: 39 bits physical, 48 bits virtual\n\
                       \n\
                       processor\t: 1\n\
                       model name\t: Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz\n\
                       cache size\t: 6144 KB\n\
                       bogomips\t: 3601.50\n";

        let info = parse_cpuinfo(content);
        assert_eq!(info.processor_count, 2);
        assert_eq!(info.model_name.as_deref(), Some("Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz"));
        assert_eq!(info.cache_size.as_deref(), Some("6144 KB"));
        // last processor wins
        assert_eq!(info.clock_speed.as_deref(), Some("3601.50"));
        assert_eq!(info.address_sizes.as_deref(), Some("39 bits physical, 48 bits virtual"));
        assert_eq!(info.hardware, None);
    }

    #[test]
    fn test_parse_cpuinfo_arm_keys() {
        let content = "processor : 0\nBogoMIPS : 38.40\n\nprocessor : 1\nBogoMIPS : 38.40\nHardware : BCM2835\n";

        let info = parse_cpuinfo(content);
        assert_eq!(info.processor_count, 2);
        assert_eq!(info.clock_speed.as_deref(), Some("38.40"));
        assert_eq!(info.hardware.as_deref(), Some("BCM2835"));
    }

    #[test]
    fn test_serialized_keys() {
        let info = CpuInfo {
            processor_count: 4,
            model_name: Some("x".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["proc_count"], 4);
        assert_eq!(json["model"], "x");
        assert!(json.get("cache").is_none());
    }
}
