//! Lock-free sliced frame pipeline.
//!
//! ## Layout
//!
//! ```text
//!  buffer: | slice 0 | slice 1 | ... | slice S-1 |      (size samples per channel)
//!  states: [ SliceState; S ]                           (one state machine each)
//! ```
//!
//! Slice `i` governs samples `[i·L, (i+1)·L)` with `L = size / slices`.
//!
//! ## Protocol
//!
//! A [`Charger`] call scans slices in index order and tries each one up to
//! `max_try` times. The first `Free`/`Listed` slice it wins via CAS is filled
//! from the source frame and published as `Valid`; the call then returns.
//! A [`Reader`] call does the same for `Valid` slices, copying into the
//! destination frame and publishing `Listed`. A call that wins nothing
//! returns [`Progress::Idle`] without touching any state or frame.
//!
//! Every call performs at most `slices * max_try` state loads and never
//! blocks. Wrapping around to rescan is left to the caller's loop.

pub mod charger;
pub mod diagnostics;
pub mod reader;
pub mod slice;

use std::sync::atomic::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use charger::Charger;
pub use diagnostics::{DiagnosticsSnapshot, PipelineDiagnostics};
pub use reader::Reader;
pub use slice::{AgentId, MainState, SliceSnapshot, SliceState};

use crate::{
    buffering::{AtomicFrame, SignalFrame},
    error::{PipelineError, Result},
};

/// Default total samples per channel.
pub const DEFAULT_PIPELINE_SIZE: usize = 2048;

/// Default number of slices.
pub const DEFAULT_PIPELINE_SLICES: usize = 8;

/// Default claim attempts per slice before moving to the next index.
pub const MAX_TRY: usize = 4;

/// Shape of a [`SlicePipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct PipelineConfig {
    /// Total samples per channel. Must be a multiple of `slices`.
    pub size: usize,
    /// Number of independently synchronised slices.
    pub slices: usize,
    /// Claim attempts per slice per call.
    pub max_try: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_PIPELINE_SIZE,
            slices: DEFAULT_PIPELINE_SLICES,
            max_try: MAX_TRY,
        }
    }
}

impl PipelineConfig {
    pub fn new(size: usize, slices: usize) -> Self {
        Self {
            size,
            slices,
            ..Self::default()
        }
    }

    /// # Errors
    /// `PipelineError::InvalidConfiguration` for zero sizes, a zero retry
    /// bound, or a size that does not divide evenly into slices.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.slices == 0 {
            Some("slice count must be non-zero".to_string())
        } else if self.size == 0 {
            Some("pipeline size must be non-zero".to_string())
        } else if self.size % self.slices != 0 {
            Some(format!(
                "pipeline size {} is not divisible by slice count {}",
                self.size, self.slices
            ))
        } else if self.max_try == 0 {
            Some("max_try must be at least 1".to_string())
        } else {
            None
        };

        match reason {
            Some(reason) => Err(PipelineError::InvalidConfiguration { reason }),
            None => Ok(()),
        }
    }

    /// Samples per slice. Only meaningful after `validate()` succeeds.
    pub fn slice_len(&self) -> usize {
        self.size / self.slices
    }
}

/// Outcome of one `charge` / `read` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Exactly one slice was claimed and fully transferred.
    Transferred { slice: usize },
    /// No slice was claimable for this role; nothing changed.
    Idle,
}

impl Progress {
    pub fn is_transferred(self) -> bool {
        matches!(self, Progress::Transferred { .. })
    }
}

/// A claimed slice: its index and its (now exclusively held) state machine.
pub(crate) struct Claim<'a> {
    pub index: usize,
    pub slice: &'a SliceState,
}

/// Shared frame buffer plus its slice state machines.
///
/// `SlicePipeline` is `Send + Sync`; share it with `Arc<SlicePipeline>`.
/// Any number of chargers and readers may operate on it concurrently.
#[derive(Debug)]
pub struct SlicePipeline {
    config: PipelineConfig,
    buffer: AtomicFrame,
    slices: Box<[SliceState]>,
    diagnostics: PipelineDiagnostics,
}

impl SlicePipeline {
    /// Build a pipeline with every slice `Free`, counters at zero and no owners.
    ///
    /// # Errors
    /// `PipelineError::InvalidConfiguration` if `config` fails validation.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            size = config.size,
            slices = config.slices,
            max_try = config.max_try,
            "slice pipeline created"
        );
        Ok(Self {
            config,
            buffer: AtomicFrame::silence(config.size),
            slices: (0..config.slices).map(|_| SliceState::new()).collect(),
            diagnostics: PipelineDiagnostics::default(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Total samples per channel.
    pub fn size(&self) -> usize {
        self.config.size
    }

    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }

    pub fn slice_len(&self) -> usize {
        self.config.slice_len()
    }

    pub fn slice(&self, index: usize) -> Option<&SliceState> {
        self.slices.get(index)
    }

    pub fn slices(&self) -> &[SliceState] {
        &self.slices
    }

    /// Current state of every slice, in index order.
    pub fn snapshot(&self) -> Vec<SliceSnapshot> {
        self.slices
            .iter()
            .enumerate()
            .map(|(i, s)| s.snapshot(i))
            .collect()
    }

    pub fn diagnostics(&self) -> &PipelineDiagnostics {
        &self.diagnostics
    }

    /// A silent frame shaped to this pipeline.
    pub fn blank_frame(&self) -> SignalFrame {
        SignalFrame::silence(self.size())
    }

    /// Anonymous charge: same as `Charger::default().charge(self, source)`.
    pub fn charge(&self, source: &SignalFrame) -> Result<Progress> {
        Charger::default().charge(self, source)
    }

    /// Anonymous read: same as `Reader::default().read(self, dest)`.
    pub fn read(&self, dest: &mut SignalFrame) -> Result<Progress> {
        Reader::default().read(self, dest)
    }

    pub(crate) fn buffer(&self) -> &AtomicFrame {
        &self.buffer
    }

    pub(crate) fn check_frame(&self, frame: &SignalFrame) -> Result<()> {
        if frame.len() != self.size() {
            return Err(PipelineError::FrameLengthMismatch {
                expected: self.size(),
                actual: frame.len(),
            });
        }
        Ok(())
    }

    /// Sample range governed by slice `index`.
    pub(crate) fn range(&self, index: usize) -> std::ops::Range<usize> {
        let len = self.slice_len();
        index * len..(index + 1) * len
    }

    /// Single linear pass over all slices, `max_try` attempts each. Returns the
    /// first slice moved from an `accept`ed state into `target`.
    pub(crate) fn claim_one(
        &self,
        accept: impl Fn(MainState) -> bool,
        target: MainState,
    ) -> Option<Claim<'_>> {
        let mut attempts = 0usize;
        let mut conflicts = 0usize;
        let mut claimed = None;

        'scan: for (index, slice) in self.slices.iter().enumerate() {
            for _ in 0..self.config.max_try {
                attempts += 1;
                let observed = slice.state();
                if !accept(observed) {
                    continue;
                }
                if slice.try_claim(observed, target) {
                    claimed = Some(Claim { index, slice });
                    break 'scan;
                }
                conflicts += 1;
            }
        }

        self.diagnostics
            .claim_attempts
            .fetch_add(attempts, Ordering::Relaxed);
        if conflicts > 0 {
            self.diagnostics
                .claim_conflicts
                .fetch_add(conflicts, Ordering::Relaxed);
        }
        claimed
    }
}
