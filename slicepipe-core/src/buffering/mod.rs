//! Stereo frame storage shared by callers and the slice pipeline.
//!
//! `SignalFrame` is the caller-owned side of a transfer: a plain pair of
//! channel vectors. `AtomicFrame` is the pipeline-owned side: the same shape,
//! but every sample lives in an `AtomicU32` (f32 bit pattern) so that the
//! buffer can be shared between threads without `unsafe`.

pub mod frame;

use std::sync::atomic::{AtomicU32, Ordering};

pub use frame::{SignalFrame, Tone};

/// Audio sample type carried on both channels.
pub type Sample = f32;

/// Stereo sample buffer with per-sample atomic cells.
///
/// Individual sample accesses are `Relaxed`; visibility across threads is
/// established by the slice state machine (release store of `Valid`/`Listed`
/// paired with the acquire load/CAS of the next owner).
pub struct AtomicFrame {
    left: Box<[AtomicU32]>,
    right: Box<[AtomicU32]>,
}

impl AtomicFrame {
    /// Allocate a silent frame of `len` samples per channel.
    pub fn silence(len: usize) -> Self {
        let zero = 0.0f32.to_bits();
        Self {
            left: (0..len).map(|_| AtomicU32::new(zero)).collect(),
            right: (0..len).map(|_| AtomicU32::new(zero)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    #[inline]
    pub(crate) fn store(&self, idx: usize, left: Sample, right: Sample) {
        self.left[idx].store(left.to_bits(), Ordering::Relaxed);
        self.right[idx].store(right.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn load(&self, idx: usize) -> (Sample, Sample) {
        (
            f32::from_bits(self.left[idx].load(Ordering::Relaxed)),
            f32::from_bits(self.right[idx].load(Ordering::Relaxed)),
        )
    }
}

impl std::fmt::Debug for AtomicFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicFrame")
            .field("len", &self.len())
            .finish()
    }
}
