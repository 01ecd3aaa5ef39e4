/// Persistent sample history
///
/// Samples are appended as JSON lines. Rows are never updated in place; the
/// only removal path is the retention sweep, which rewrites the file without
/// the expired rows.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::error::{DashboardError, DashboardResult};
use super::metrics::{LoadAverage, MemoryStats};

/// Start of a look-back window of `minutes` ending now.
///
/// `None` when `minutes` is not positive or the window reaches past the
/// earliest representable timestamp.
pub fn window_start(minutes: i64) -> Option<DateTime<Utc>> {
    if minutes <= 0 {
        return None;
    }
    chrono::Duration::try_minutes(minutes).and_then(|window| Utc::now().checked_sub_signed(window))
}

/// One timestamped record written by the background sampler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub timestamp: DateTime<Utc>,
    pub load_1: f64,
    pub load_5: f64,
    pub load_15: f64,
    pub mem_free: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_cache: Option<u64>,
    pub mem_active: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_buffers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_swap_cached: Option<u64>,
}

impl SampleRow {
    pub fn new(timestamp: DateTime<Utc>, load: &LoadAverage, memory: &MemoryStats) -> Self {
        Self {
            timestamp,
            load_1: load.one,
            load_5: load.five,
            load_15: load.fifteen,
            mem_free: memory.free,
            mem_cache: memory.cache,
            mem_active: memory.active,
            mem_total: memory.total,
            mem_buffers: memory.buffers,
            mem_swap_cached: memory.swap_cached,
        }
    }
}

/// Where the sampler writes its rows
pub trait SampleSink: Send + Sync {
    fn append(&self, row: &SampleRow) -> DashboardResult<()>;

    /// Drop rows older than `cutoff`, returning how many were removed
    fn sweep(&self, cutoff: DateTime<Utc>) -> DashboardResult<usize>;
}

/// JSON-lines file store. Writers are serialized by an internal lock.
pub struct HistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn open(path: impl Into<PathBuf>) -> DashboardResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows with a timestamp at or after `since`, oldest first
    pub fn load_since(&self, since: DateTime<Utc>) -> DashboardResult<Vec<SampleRow>> {
        Ok(self
            .read_rows()?
            .into_iter()
            .filter(|row| row.timestamp >= since)
            .collect())
    }

    pub fn load_all(&self) -> DashboardResult<Vec<SampleRow>> {
        self.read_rows()
    }

    fn read_rows(&self) -> DashboardResult<Vec<SampleRow>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // A torn final line from a crash should not hide the rest of the history
            match serde_json::from_str::<SampleRow>(&line) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), line = number + 1, "skipping unreadable sample: {}", e)
                }
            }
        }
        Ok(rows)
    }
}

impl SampleSink for HistoryStore {
    fn append(&self, row: &SampleRow) -> DashboardResult<()> {
        let _guard = self.write_lock.lock();

        let line = serde_json::to_string(row)
            .map_err(|e| DashboardError::StoreWriteFailure(e.to_string()))?;

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", line))
            .map_err(|e| {
                DashboardError::StoreWriteFailure(format!("{}: {}", self.path.display(), e))
            })
    }

    fn sweep(&self, cutoff: DateTime<Utc>) -> DashboardResult<usize> {
        let _guard = self.write_lock.lock();

        let rows = self.read_rows()?;
        let before = rows.len();
        let kept: Vec<_> = rows.into_iter().filter(|row| row.timestamp >= cutoff).collect();
        let removed = before - kept.len();

        if removed == 0 {
            return Ok(0);
        }

        // Write the survivors next to the store and swap them in
        let tmp_path = self.path.with_extension("jsonl.tmp");
        let write = || -> std::io::Result<()> {
            let mut tmp = File::create(&tmp_path)?;
            for row in &kept {
                let line = serde_json::to_string(row)?;
                writeln!(tmp, "{}", line)?;
            }
            tmp.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        };

        write().map_err(|e| {
            DashboardError::StoreWriteFailure(format!("sweep of {}: {}", self.path.display(), e))
        })?;

        Ok(removed)
    }
}
