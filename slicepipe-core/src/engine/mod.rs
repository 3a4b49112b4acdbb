//! `TransferEngine`: drives producer and consumer workers over one pipeline.
//!
//! ## Lifecycle
//!
//! ```text
//! TransferEngine::new(config)
//!     └─► start()   → chargers + readers spawned, status = Running
//!         └─► stop() → running=false, workers joined, status = Stopped
//! ```
//!
//! `start()`/`stop()` in the wrong state return an error rather than
//! panicking. The engine can be restarted after `stop()`; the pipeline and
//! its slice states persist across runs.

pub mod worker;

use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::{
    buffering::{SignalFrame, Tone},
    error::{PipelineError, Result},
    events::{EngineStatus, EngineStatusEvent, FrameDelivered},
    pipeline::{
        AgentId, Charger, DiagnosticsSnapshot, PipelineConfig, Reader, SlicePipeline,
        SliceSnapshot,
    },
};

pub use worker::spawn_worker;

/// Status broadcast capacity.
const BROADCAST_CAP: usize = 64;

/// Delivered-frame events buffered before readers start dropping them.
const FRAME_CHANNEL_CAP: usize = 256;

const MAX_WORKERS: usize = 64;

/// Configuration for `TransferEngine`. Loaded from JSON; every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct EngineConfig {
    pub pipeline: PipelineConfig,
    /// Producer worker count. Default: 1.
    pub chargers: usize,
    /// Consumer worker count. Default: 1.
    pub readers: usize,
    /// Sleep after an idle call, in microseconds. 0 yields instead. Default: 50.
    pub idle_sleep_us: u64,
    /// Source signal charged by every producer worker.
    pub tone: Tone,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            chargers: 1,
            readers: 1,
            idle_sleep_us: 50,
            tone: Tone::default(),
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    ///
    /// # Errors
    /// `PipelineError::Io` on read failure, `PipelineError::Config` on bad JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let mut config: EngineConfig = serde_json::from_str(&raw)?;
        config.normalize();
        Ok(config)
    }

    pub fn normalize(&mut self) {
        self.chargers = self.chargers.clamp(1, MAX_WORKERS);
        self.readers = self.readers.clamp(1, MAX_WORKERS);
        self.tone.amplitude = self.tone.amplitude.clamp(0.0, 1.0);
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_micros(self.idle_sleep_us)
    }
}

/// The top-level engine handle.
///
/// `TransferEngine` is `Send + Sync`; all mutable state is behind atomics or
/// a `parking_lot::Mutex`.
pub struct TransferEngine {
    config: EngineConfig,
    pipeline: Arc<SlicePipeline>,
    /// `true` while workers are looping.
    running: Arc<AtomicBool>,
    status: Mutex<EngineStatus>,
    status_tx: broadcast::Sender<EngineStatusEvent>,
    frame_tx: Sender<FrameDelivered>,
    frame_rx: Receiver<FrameDelivered>,
    /// Delivered-frame sequence counter, shared by all readers.
    seq: Arc<AtomicU64>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TransferEngine {
    /// Build the engine and its pipeline. Does not start any worker.
    ///
    /// # Errors
    /// `PipelineError::InvalidConfiguration` if the pipeline shape is invalid.
    pub fn new(mut config: EngineConfig) -> Result<Self> {
        config.normalize();
        let pipeline = Arc::new(SlicePipeline::new(config.pipeline)?);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_CHANNEL_CAP);

        Ok(Self {
            config,
            pipeline,
            running: Arc::new(AtomicBool::new(false)),
            status: Mutex::new(EngineStatus::Idle),
            status_tx,
            frame_tx,
            frame_rx,
            seq: Arc::new(AtomicU64::new(0)),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Spawn the configured charger and reader workers.
    ///
    /// # Errors
    /// - `PipelineError::AlreadyRunning` if already started.
    /// - `PipelineError::WorkerSpawn` if a thread cannot be created; any
    ///   workers already spawned are stopped again.
    pub fn start(&self) -> Result<()> {
        // Held for the whole transition so a concurrent `stop()` observes
        // either no run at all or a fully started one.
        let mut workers = self.workers.lock();
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::AlreadyRunning);
        }

        let ctx = worker::WorkerContext {
            pipeline: Arc::clone(&self.pipeline),
            running: Arc::clone(&self.running),
            idle_sleep: self.config.idle_sleep(),
            seq: Arc::clone(&self.seq),
            frame_tx: self.frame_tx.clone(),
        };
        let source = SignalFrame::sine(self.pipeline.size(), &self.config.tone);

        if let Err(e) = self.spawn_all(&mut workers, &ctx, &source) {
            error!("worker spawn failed: {e}");
            self.running.store(false, Ordering::SeqCst);
            Self::join_all(&mut workers);
            return Err(e);
        }

        let detail = format!(
            "{} charger(s), {} reader(s)",
            self.config.chargers, self.config.readers
        );
        info!("engine started: {detail}");
        self.set_status(EngineStatus::Running, Some(detail));
        Ok(())
    }

    /// Signal all workers to exit and wait for them.
    ///
    /// # Errors
    /// `PipelineError::NotRunning` if not currently running.
    pub fn stop(&self) -> Result<()> {
        let mut workers = self.workers.lock();
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::NotRunning);
        }

        Self::join_all(&mut workers);
        self.set_status(EngineStatus::Stopped, None);
        info!("engine stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> EngineStatus {
        *self.status.lock()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared pipeline, for manual charge/read calls alongside the workers.
    pub fn pipeline(&self) -> &Arc<SlicePipeline> {
        &self.pipeline
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<EngineStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Receiver of delivered-frame events. Clones share one queue.
    pub fn frames(&self) -> Receiver<FrameDelivered> {
        self.frame_rx.clone()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.pipeline.diagnostics().snapshot()
    }

    pub fn reset_diagnostics(&self) {
        self.pipeline.diagnostics().reset();
    }

    pub fn slices(&self) -> Vec<SliceSnapshot> {
        self.pipeline.snapshot()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn spawn_all(
        &self,
        workers: &mut Vec<JoinHandle<()>>,
        ctx: &worker::WorkerContext,
        source: &SignalFrame,
    ) -> Result<()> {
        for n in 0..self.config.chargers {
            let ctx = ctx.clone();
            let source = source.clone();
            let charger = Charger::new(AgentId(n as u32));
            workers.push(spawn_worker(format!("slicepipe-charger-{n}"), move || {
                worker::run_charger(ctx, charger, source)
            })?);
        }

        for n in 0..self.config.readers {
            let ctx = ctx.clone();
            let reader = Reader::new(AgentId(n as u32));
            workers.push(spawn_worker(format!("slicepipe-reader-{n}"), move || {
                worker::run_reader(ctx, reader)
            })?);
        }

        Ok(())
    }

    fn join_all(workers: &mut Vec<JoinHandle<()>>) {
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }
    }

    fn set_status(&self, new_status: EngineStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(EngineStatusEvent {
            status: new_status,
            detail,
        });
    }
}

impl Drop for TransferEngine {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        Self::join_all(self.workers.get_mut());
    }
}
