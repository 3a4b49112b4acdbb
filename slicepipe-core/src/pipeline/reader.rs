//! Consumer side: move one ready slice from the pipeline into a frame.

use std::sync::atomic::Ordering;

use tracing::trace;

use super::{AgentId, MainState, Progress, SlicePipeline};
use crate::{buffering::SignalFrame, error::Result};

/// Reader handle. Carries the identity recorded as `checker_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reader {
    id: Option<AgentId>,
}

impl Reader {
    pub fn new(id: AgentId) -> Self {
        Self { id: Some(id) }
    }

    pub fn id(&self) -> Option<AgentId> {
        self.id
    }

    /// Transfer at most one `Valid` slice from `pipeline` into `dest`.
    ///
    /// The slice is published as `Listed` once copied, making it claimable
    /// by the next charger. Only the slice's range of `dest` is written.
    ///
    /// # Errors
    /// `PipelineError::FrameLengthMismatch` if `dest` is not exactly
    /// `pipeline.size()` samples long. Checked before any claim.
    pub fn read(&self, pipeline: &SlicePipeline, dest: &mut SignalFrame) -> Result<Progress> {
        pipeline.check_frame(dest)?;

        let Some(claim) = pipeline.claim_one(MainState::is_readable, MainState::InUseR) else {
            pipeline
                .diagnostics()
                .idle_reads
                .fetch_add(1, Ordering::Relaxed);
            return Ok(Progress::Idle);
        };

        let slice = claim.slice;
        slice.begin_read(self.id);

        let buffer = pipeline.buffer();
        for idx in pipeline.range(claim.index) {
            let (l, r) = buffer.load(idx);
            dest.left_mut()[idx] = l;
            dest.right_mut()[idx] = r;
            slice.tick();
        }

        slice.publish(MainState::Listed);
        pipeline.diagnostics().reads.fetch_add(1, Ordering::Relaxed);
        trace!(slice = claim.index, checker = ?self.id, "slice read");

        Ok(Progress::Transferred { slice: claim.index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Charger, PipelineConfig};

    fn pipeline() -> SlicePipeline {
        SlicePipeline::new(PipelineConfig::new(8, 2)).unwrap()
    }

    #[test]
    fn read_on_empty_pipeline_leaves_dest_untouched() {
        let pl = pipeline();
        let mut dest = SignalFrame::from_channels(vec![9.0; 8], vec![9.0; 8]).unwrap();
        let before = dest.clone();

        assert_eq!(Reader::new(AgentId(1)).read(&pl, &mut dest).unwrap(), Progress::Idle);
        assert_eq!(dest, before);
        assert!(pl.slices().iter().all(|s| s.state() == MainState::Free));
    }

    #[test]
    fn no_valid_slice_means_no_read() {
        let pl = SlicePipeline::new(PipelineConfig::new(16, 4)).unwrap();
        let source = SignalFrame::from_channels(vec![0.25; 16], vec![0.25; 16]).unwrap();
        let mut scratch = pl.blank_frame();

        pl.charge(&source).unwrap();
        pl.charge(&source).unwrap();
        pl.read(&mut scratch).unwrap();
        // Slice 0 Listed, slice 1 held by another reader, slice 2 held by a
        // writer, slice 3 still Free.
        assert!(pl.slices()[1].try_claim(MainState::Valid, MainState::InUseR));
        assert!(pl.slices()[2].try_claim(MainState::Free, MainState::InUseW));

        let before = pl.snapshot();
        let mut dest = SignalFrame::from_channels(vec![7.0; 16], vec![7.0; 16]).unwrap();
        let dest_before = dest.clone();

        assert_eq!(
            Reader::new(AgentId(3)).read(&pl, &mut dest).unwrap(),
            Progress::Idle
        );
        assert_eq!(dest, dest_before);
        assert_eq!(pl.snapshot(), before);
        assert_eq!(pl.diagnostics().snapshot().idle_reads, 1);
    }

    #[test]
    fn read_records_checker_and_progress() {
        let pl = pipeline();
        let source = SignalFrame::from_channels(vec![0.5; 8], vec![-0.5; 8]).unwrap();
        Charger::new(AgentId(2)).charge(&pl, &source).unwrap();

        let mut dest = pl.blank_frame();
        let progress = Reader::new(AgentId(5)).read(&pl, &mut dest).unwrap();
        assert_eq!(progress, Progress::Transferred { slice: 0 });

        let snap = pl.slices()[0].snapshot(0);
        assert_eq!(snap.state, MainState::Listed);
        assert_eq!(snap.builder_id, Some(AgentId(2)));
        assert_eq!(snap.checker_id, Some(AgentId(5)));
        assert_eq!(snap.processed, 4);

        assert_eq!(&dest.left()[..4], &[0.5; 4]);
        assert_eq!(&dest.right()[..4], &[-0.5; 4]);
        // Second slice never charged, so its range stays silent.
        assert_eq!(&dest.left()[4..], &[0.0; 4]);
    }

    #[test]
    fn listed_slice_is_not_read_twice() {
        let pl = pipeline();
        let source = pl.blank_frame();
        let mut dest = pl.blank_frame();
        pl.charge(&source).unwrap();
        assert!(pl.read(&mut dest).unwrap().is_transferred());
        assert_eq!(pl.read(&mut dest).unwrap(), Progress::Idle);
    }

    #[test]
    fn reader_skips_to_later_valid_slice() {
        let pl = pipeline();
        let source = pl.blank_frame();
        let mut dest = pl.blank_frame();

        pl.charge(&source).unwrap();
        pl.charge(&source).unwrap();
        pl.read(&mut dest).unwrap();

        // Slice 0 is Listed, slice 1 still Valid.
        assert_eq!(
            pl.read(&mut dest).unwrap(),
            Progress::Transferred { slice: 1 }
        );
    }
}
