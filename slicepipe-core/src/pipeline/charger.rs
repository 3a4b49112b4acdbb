//! Producer side: move one slice from a source frame into the pipeline.

use std::sync::atomic::Ordering;

use tracing::trace;

use super::{AgentId, MainState, Progress, SlicePipeline};
use crate::{buffering::SignalFrame, error::Result};

/// Writer handle. Carries the identity recorded as `builder_id` on the
/// slices it claims; `Charger::default()` charges anonymously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Charger {
    id: Option<AgentId>,
}

impl Charger {
    pub fn new(id: AgentId) -> Self {
        Self { id: Some(id) }
    }

    pub fn id(&self) -> Option<AgentId> {
        self.id
    }

    /// Transfer at most one slice of `source` into `pipeline`.
    ///
    /// Claims the first `Free`/`Listed` slice in index order, copies its
    /// sample range, publishes it as `Valid` and returns. Returns
    /// `Progress::Idle` with no side effects when nothing is claimable.
    ///
    /// # Errors
    /// `PipelineError::FrameLengthMismatch` if `source` is not exactly
    /// `pipeline.size()` samples long. Checked before any claim.
    pub fn charge(&self, pipeline: &SlicePipeline, source: &SignalFrame) -> Result<Progress> {
        pipeline.check_frame(source)?;

        let Some(claim) = pipeline.claim_one(MainState::is_writable, MainState::InUseW) else {
            pipeline
                .diagnostics()
                .idle_charges
                .fetch_add(1, Ordering::Relaxed);
            return Ok(Progress::Idle);
        };

        let slice = claim.slice;
        slice.begin_write(self.id);

        let buffer = pipeline.buffer();
        let (left, right) = (source.left(), source.right());
        for idx in pipeline.range(claim.index) {
            buffer.store(idx, left[idx], right[idx]);
            slice.tick();
        }

        slice.publish(MainState::Valid);
        pipeline
            .diagnostics()
            .charges
            .fetch_add(1, Ordering::Relaxed);
        trace!(slice = claim.index, builder = ?self.id, "slice charged");

        Ok(Progress::Transferred { slice: claim.index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::PipelineError,
        pipeline::{PipelineConfig, Reader},
    };

    fn pipeline() -> SlicePipeline {
        SlicePipeline::new(PipelineConfig::new(16, 4)).unwrap()
    }

    fn ramp() -> SignalFrame {
        let left: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let right: Vec<f32> = (0..16).map(|v| -(v as f32)).collect();
        SignalFrame::from_channels(left, right).unwrap()
    }

    #[test]
    fn charge_claims_lowest_free_slice() {
        let pl = pipeline();
        let charger = Charger::new(AgentId(7));
        assert_eq!(
            charger.charge(&pl, &ramp()).unwrap(),
            Progress::Transferred { slice: 0 }
        );
        let snap = pl.slices()[0].snapshot(0);
        assert_eq!(snap.state, MainState::Valid);
        assert_eq!(snap.builder_id, Some(AgentId(7)));
        assert_eq!(snap.processed, 4);
        assert_eq!(pl.slices()[1].state(), MainState::Free);
    }

    #[test]
    fn charge_copies_only_its_range() {
        let pl = pipeline();
        pl.charge(&ramp()).unwrap();
        assert_eq!(pl.buffer().load(3), (3.0, -3.0));
        assert_eq!(pl.buffer().load(4), (0.0, 0.0));
    }

    #[test]
    fn saturated_pipeline_is_a_no_op() {
        let pl = pipeline();
        let source = ramp();
        for _ in 0..4 {
            assert!(pl.charge(&source).unwrap().is_transferred());
        }
        let before = pl.snapshot();

        assert_eq!(pl.charge(&source).unwrap(), Progress::Idle);
        assert_eq!(pl.snapshot(), before);
        assert_eq!(pl.diagnostics().snapshot().idle_charges, 1);
    }

    #[test]
    fn locked_and_valid_slices_are_all_skipped() {
        let pl = pipeline();
        for _ in 0..3 {
            assert!(pl.charge(&ramp()).unwrap().is_transferred());
        }
        // Slice 2 held by a reader, slice 3 held by another writer.
        assert!(pl.slices()[2].try_claim(MainState::Valid, MainState::InUseR));
        assert!(pl.slices()[3].try_claim(MainState::Free, MainState::InUseW));

        let before = pl.snapshot();
        let buffer_before: Vec<_> = (0..16).map(|i| pl.buffer().load(i)).collect();

        let other = SignalFrame::from_channels(vec![9.0; 16], vec![9.0; 16]).unwrap();
        assert_eq!(
            Charger::new(AgentId(4)).charge(&pl, &other).unwrap(),
            Progress::Idle
        );

        assert_eq!(pl.snapshot(), before);
        let buffer_after: Vec<_> = (0..16).map(|i| pl.buffer().load(i)).collect();
        assert_eq!(buffer_after, buffer_before);
    }

    #[test]
    fn listed_slice_is_recharged() {
        let pl = pipeline();
        let source = ramp();
        let mut dest = pl.blank_frame();
        pl.charge(&source).unwrap();
        Reader::default().read(&pl, &mut dest).unwrap();
        assert_eq!(pl.slices()[0].state(), MainState::Listed);

        assert_eq!(
            pl.charge(&source).unwrap(),
            Progress::Transferred { slice: 0 }
        );
        assert_eq!(pl.slices()[0].state(), MainState::Valid);
        assert_eq!(pl.slices()[0].processed(), 4);
    }

    #[test]
    fn wrong_length_source_is_rejected_untouched() {
        let pl = pipeline();
        let short = SignalFrame::silence(8);
        let err = pl.charge(&short).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FrameLengthMismatch {
                expected: 16,
                actual: 8
            }
        ));
        assert!(pl.slices().iter().all(|s| s.state() == MainState::Free));
    }
}
