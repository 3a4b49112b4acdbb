//! Caller-owned stereo frames.

use serde::{Deserialize, Serialize};

use super::Sample;
use crate::error::{PipelineError, Result};

/// Sine generator parameters used to synthesise test and engine source frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct Tone {
    /// Frequency in Hz.
    pub frequency: f32,
    /// Peak amplitude in [0.0, 1.0].
    pub amplitude: f32,
    /// Phase offset in radians.
    pub phase: f32,
    /// Sample rate in Hz.
    pub sample_rate: f32,
}

impl Default for Tone {
    fn default() -> Self {
        Self {
            frequency: 770.0,
            amplitude: 1.0,
            phase: 0.0,
            sample_rate: 44_110.0,
        }
    }
}

/// One span of stereo audio: left and right channels of equal length.
///
/// Frames passed to the pipeline are borrowed for the duration of a single
/// call and never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalFrame {
    left: Vec<Sample>,
    right: Vec<Sample>,
}

impl SignalFrame {
    /// A frame of `len` zero samples on both channels.
    pub fn silence(len: usize) -> Self {
        Self {
            left: vec![0.0; len],
            right: vec![0.0; len],
        }
    }

    /// Build a frame from two channel vectors.
    ///
    /// # Errors
    /// `PipelineError::ChannelLengthMismatch` if the channels differ in length.
    pub fn from_channels(left: Vec<Sample>, right: Vec<Sample>) -> Result<Self> {
        if left.len() != right.len() {
            return Err(PipelineError::ChannelLengthMismatch {
                left: left.len(),
                right: right.len(),
            });
        }
        Ok(Self { left, right })
    }

    /// A frame carrying the same sine wave on both channels.
    pub fn sine(len: usize, tone: &Tone) -> Self {
        let step = std::f32::consts::TAU * tone.frequency / tone.sample_rate.max(1.0);
        let left: Vec<Sample> = (0..len)
            .map(|n| tone.amplitude * (step * n as f32 + tone.phase).sin())
            .collect();
        Self {
            right: left.clone(),
            left,
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn left(&self) -> &[Sample] {
        &self.left
    }

    pub fn right(&self) -> &[Sample] {
        &self.right
    }

    pub fn left_mut(&mut self) -> &mut [Sample] {
        &mut self.left
    }

    pub fn right_mut(&mut self) -> &mut [Sample] {
        &mut self.right
    }

    /// Root-mean-square level across both channels.
    pub fn rms(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = self
            .left
            .iter()
            .chain(self.right.iter())
            .map(|s| s * s)
            .sum();
        (sum_sq / (2 * self.len()) as f32).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn silence_has_equal_channels() {
        let frame = SignalFrame::silence(16);
        assert_eq!(frame.len(), 16);
        assert_eq!(frame.left(), frame.right());
        assert_eq!(frame.rms(), 0.0);
    }

    #[test]
    fn mismatched_channels_are_rejected() {
        let err = SignalFrame::from_channels(vec![0.0; 4], vec![0.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ChannelLengthMismatch { left: 4, right: 3 }
        ));
    }

    #[test]
    fn sine_starts_at_phase() {
        let tone = Tone {
            frequency: 1.0,
            amplitude: 0.5,
            phase: std::f32::consts::FRAC_PI_2,
            sample_rate: 4.0,
        };
        let frame = SignalFrame::sine(4, &tone);
        assert_abs_diff_eq!(frame.left()[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(frame.left()[1], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(frame.left()[2], -0.5, epsilon = 1e-6);
        assert_eq!(frame.left(), frame.right());
    }

    #[test]
    fn rms_of_full_scale_square() {
        let left: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let frame = SignalFrame::from_channels(left.clone(), left).unwrap();
        assert_abs_diff_eq!(frame.rms(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn empty_frame_rms_is_zero() {
        assert_eq!(SignalFrame::silence(0).rms(), 0.0);
    }
}
