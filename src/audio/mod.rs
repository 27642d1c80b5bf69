//! Local voice capture helpers for text-mode answers

pub mod silence;

pub use silence::{capture_until_silence, normalized_rms, CapturedAudio, SilenceDetector, StopReason};

/// Audio frame from a local capture source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Playback length of this frame
    pub fn duration_ms(&self) -> u64 {
        let per_channel = self.samples.len() as u64 / self.channels.max(1) as u64;
        if self.sample_rate == 0 {
            return 0;
        }
        per_channel * 1000 / self.sample_rate as u64
    }
}
