//! Worker threads: the spawn helper plus the producer and consumer loops.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, error, warn};

use crate::{
    buffering::SignalFrame,
    error::{PipelineError, Result},
    events::FrameDelivered,
    pipeline::{Charger, Progress, Reader, SlicePipeline},
};

/// Run `f` on a new named OS thread.
///
/// # Errors
/// `PipelineError::WorkerSpawn` if the OS refuses to create the thread.
pub fn spawn_worker<F>(name: impl Into<String>, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let name = name.into();
    thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|source| PipelineError::WorkerSpawn { name, source })
}

/// State shared by every worker of one engine run.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub pipeline: Arc<SlicePipeline>,
    pub running: Arc<AtomicBool>,
    pub idle_sleep: Duration,
    pub seq: Arc<AtomicU64>,
    pub frame_tx: Sender<FrameDelivered>,
}

impl WorkerContext {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn back_off(&self) {
        if self.idle_sleep.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(self.idle_sleep);
        }
    }
}

/// Charge `source` into the pipeline until `running` is cleared.
pub(crate) fn run_charger(ctx: WorkerContext, charger: Charger, source: SignalFrame) {
    debug!(charger = ?charger.id(), "charger started");

    while ctx.is_running() {
        match charger.charge(&ctx.pipeline, &source) {
            Ok(Progress::Transferred { .. }) => {}
            Ok(Progress::Idle) => ctx.back_off(),
            Err(e) => {
                error!(charger = ?charger.id(), "charger stopped: {e}");
                break;
            }
        }
    }

    debug!(charger = ?charger.id(), "charger exited");
}

/// Read slices into a private frame until `running` is cleared, emitting a
/// `FrameDelivered` after every `slice_count` successful reads.
pub(crate) fn run_reader(ctx: WorkerContext, reader: Reader) {
    debug!(reader = ?reader.id(), "reader started");

    let mut dest = ctx.pipeline.blank_frame();
    let per_frame = ctx.pipeline.slice_count();
    let mut slices_read = 0usize;

    while ctx.is_running() {
        match reader.read(&ctx.pipeline, &mut dest) {
            Ok(Progress::Transferred { .. }) => {
                slices_read += 1;
                if slices_read == per_frame {
                    slices_read = 0;
                    deliver(&ctx, reader, &dest);
                }
            }
            Ok(Progress::Idle) => ctx.back_off(),
            Err(e) => {
                error!(reader = ?reader.id(), "reader stopped: {e}");
                break;
            }
        }
    }

    debug!(reader = ?reader.id(), "reader exited");
}

fn deliver(ctx: &WorkerContext, reader: Reader, dest: &SignalFrame) {
    let Some(id) = reader.id() else {
        return;
    };
    let event = FrameDelivered {
        reader: id,
        seq: ctx.seq.fetch_add(1, Ordering::Relaxed),
        rms: dest.rms(),
    };
    match ctx.frame_tx.try_send(event) {
        Ok(()) => {}
        // Nobody is draining; dropping keeps the reader non-blocking.
        Err(TrySendError::Full(_)) => {}
        Err(TrySendError::Disconnected(_)) => {
            warn!(reader = %id, "frame channel disconnected");
        }
    }
}
