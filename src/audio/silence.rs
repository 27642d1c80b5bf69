//! Silence-based auto-stop for voice answers captured outside the room.
//!
//! Uses a fixed normalized-RMS threshold. Silence before the first speech never
//! stops capture.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::AudioFrame;
use crate::config::CaptureConfig;

/// Root mean square of a frame, normalized to 0.0..=1.0
pub fn normalized_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Detects sustained silence after speech.
pub struct SilenceDetector {
    threshold: f32,
    hold_ms: u64,
    has_seen_speech: bool,
    /// Timestamp of the first silent frame in the current run
    silence_started_ms: Option<u64>,
    triggered: bool,
}

impl SilenceDetector {
    pub fn new(threshold: f32, hold: Duration) -> Self {
        debug!(
            "SilenceDetector created: threshold={}, hold={}ms",
            threshold,
            hold.as_millis()
        );
        Self {
            threshold,
            hold_ms: hold.as_millis() as u64,
            has_seen_speech: false,
            silence_started_ms: None,
            triggered: false,
        }
    }

    pub fn from_config(cfg: &CaptureConfig) -> Self {
        Self::new(
            cfg.silence_threshold,
            Duration::from_millis(cfg.silence_hold_ms),
        )
    }

    /// Process one frame.
    ///
    /// Returns `true` once, when silence has lasted `hold` after speech.
    pub fn on_frame(&mut self, frame: &AudioFrame) -> bool {
        let level = normalized_rms(&frame.samples);

        if level >= self.threshold {
            if self.silence_started_ms.is_some() {
                debug!("Speech resumed at {}ms (level {:.3})", frame.timestamp_ms, level);
            }
            self.has_seen_speech = true;
            self.silence_started_ms = None;
            self.triggered = false;
            return false;
        }

        if !self.has_seen_speech || self.triggered {
            return false;
        }

        let started = *self.silence_started_ms.get_or_insert(frame.timestamp_ms);
        let end_ms = frame.timestamp_ms + frame.duration_ms();
        if end_ms.saturating_sub(started) >= self.hold_ms {
            self.triggered = true;
            debug!("Silence detected from {}ms to {}ms", started, end_ms);
            return true;
        }

        false
    }

    pub fn has_seen_speech(&self) -> bool {
        self.has_seen_speech
    }

    pub fn reset(&mut self) {
        self.has_seen_speech = false;
        self.silence_started_ms = None;
        self.triggered = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Silence,
    MaxDuration,
    /// The frame source closed
    StreamEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u64,
    pub stop: StopReason,
}

/// Collect frames until silence after speech, the duration cap, or the end of
/// the stream
pub async fn capture_until_silence(
    frames: &mut mpsc::Receiver<AudioFrame>,
    detector: &mut SilenceDetector,
    max_duration: Duration,
) -> CapturedAudio {
    let max_ms = max_duration.as_millis() as u64;
    let mut captured = CapturedAudio {
        samples: Vec::new(),
        sample_rate: 0,
        channels: 0,
        duration_ms: 0,
        stop: StopReason::StreamEnded,
    };

    while let Some(frame) = frames.recv().await {
        if captured.sample_rate == 0 {
            captured.sample_rate = frame.sample_rate;
            captured.channels = frame.channels;
        }
        captured.samples.extend_from_slice(&frame.samples);
        captured.duration_ms += frame.duration_ms();

        if detector.on_frame(&frame) {
            captured.stop = StopReason::Silence;
            break;
        }
        if captured.duration_ms >= max_ms {
            captured.stop = StopReason::MaxDuration;
            break;
        }
    }

    info!(
        "Voice capture stopped after {}ms ({:?})",
        captured.duration_ms, captured.stop
    );
    captured
}
