/// Background sampler that records memory and load into the history store
///
/// Lifecycle: `Stopped -> Running -> Stopping -> Stopped`. The stop signal is
/// only observed while the loop waits between iterations, so a sample that
/// is being written always completes.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::error::{DashboardError, DashboardResult};
use super::history::{SampleRow, SampleSink};
use super::metrics::{MetricSnapshot, MetricSource, Sample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Stopped,
    Running,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    pub interval: Duration,
    /// How long rows are kept
    pub retention: Duration,
    /// How often the retention sweep runs
    pub sweep_every: Duration,
}

impl SamplerSettings {
    pub fn validate(&self) -> DashboardResult<()> {
        if self.interval.is_zero() {
            return Err(DashboardError::MalformedConfiguration(
                "sampler interval must be greater than zero".to_string(),
            ));
        }
        if self.retention.is_zero() {
            return Err(DashboardError::MalformedConfiguration(
                "sampler retention must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            retention: Duration::from_secs(24 * 60 * 60),
            sweep_every: Duration::from_secs(60 * 60),
        }
    }
}

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct PeriodicSampler {
    settings: SamplerSettings,
    memory: Arc<dyn MetricSource>,
    load: Arc<dyn MetricSource>,
    sink: Arc<dyn SampleSink>,
    state: Arc<Mutex<SamplerState>>,
    running: Option<Running>,
}

impl PeriodicSampler {
    pub fn new(
        settings: SamplerSettings,
        memory: Arc<dyn MetricSource>,
        load: Arc<dyn MetricSource>,
        sink: Arc<dyn SampleSink>,
    ) -> DashboardResult<Self> {
        settings.validate()?;

        Ok(Self {
            settings,
            memory,
            load,
            sink,
            state: Arc::new(Mutex::new(SamplerState::Stopped)),
            running: None,
        })
    }

    pub fn state(&self) -> SamplerState {
        *self.state.lock()
    }

    /// Spawn the sampling loop. Does nothing if it is already running.
    pub fn start(&mut self) {
        if self.running.is_some() {
            tracing::debug!("sampler already running");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        *self.state.lock() = SamplerState::Running;

        let worker = Worker {
            settings: self.settings,
            memory: Arc::clone(&self.memory),
            load: Arc::clone(&self.load),
            sink: Arc::clone(&self.sink),
        };
        let handle = tokio::spawn(worker.run(stop_rx));

        tracing::info!(
            interval = %humantime::format_duration(self.settings.interval),
            retention = %humantime::format_duration(self.settings.retention),
            "sampler started"
        );
        self.running = Some(Running { stop_tx, handle });
    }

    /// Ask the loop to exit after its current iteration and wait for it
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        *self.state.lock() = SamplerState::Stopping;
        let _ = running.stop_tx.send(true);

        if let Err(e) = running.handle.await {
            tracing::error!("sampler task ended abnormally: {}", e);
        }

        *self.state.lock() = SamplerState::Stopped;
        tracing::info!("sampler stopped");
    }
}

struct Worker {
    settings: SamplerSettings,
    memory: Arc<dyn MetricSource>,
    load: Arc<dyn MetricSource>,
    sink: Arc<dyn SampleSink>,
}

impl Worker {
    async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let mut last_sweep: Option<DateTime<Utc>> = None;

        loop {
            self.record_once().await;

            let now = Utc::now();
            let sweep_due = last_sweep
                .map(|at| (now - at).to_std().unwrap_or_default() >= self.settings.sweep_every)
                .unwrap_or(true);
            if sweep_due {
                self.sweep(now).await;
                last_sweep = Some(now);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                changed = stop_rx.changed() => {
                    // A dropped sender means the owner is gone as well
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn record_once(&self) {
        let (memory, load) = tokio::join!(self.memory.sample(), self.load.sample());

        let row = match (memory, load) {
            (
                Sample::Data(MetricSnapshot::Memory(memory)),
                Sample::Data(MetricSnapshot::Load(load)),
            ) => SampleRow::new(Utc::now(), &load, &memory),
            (memory, load) => {
                tracing::warn!(?memory, ?load, "skipping history sample, sources unavailable");
                return;
            }
        };

        let sink = Arc::clone(&self.sink);
        let (load_1, mem_free) = (row.load_1, row.mem_free);

        // Store I/O is blocking
        match tokio::task::spawn_blocking(move || sink.append(&row)).await {
            Ok(Ok(())) => tracing::debug!(load_1, mem_free, "recorded sample"),
            Ok(Err(e)) => tracing::error!("{}", e),
            Err(e) => tracing::error!("history append task failed: {}", e),
        }
    }

    async fn sweep(&self, now: DateTime<Utc>) {
        let cutoff = chrono::Duration::from_std(self.settings.retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention));
        let Some(cutoff) = cutoff else {
            tracing::error!(
                retention = %humantime::format_duration(self.settings.retention),
                "retention out of range, skipping sweep"
            );
            return;
        };

        let sink = Arc::clone(&self.sink);
        match tokio::task::spawn_blocking(move || sink.sweep(cutoff)).await {
            Ok(Ok(0)) => {}
            Ok(Ok(removed)) => tracing::info!(removed, "expired samples swept"),
            Ok(Err(e)) => tracing::error!("{}", e),
            Err(e) => tracing::error!("history sweep task failed: {}", e),
        }
    }
}
