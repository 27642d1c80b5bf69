//! Transcript stream normalization
//!
//! Consumes text streams from the room and materializes final transcript lines:
//! - Chunk reassembly per stream id
//! - Transcription marker and finality filtering
//! - Speaker classification (human, agent, excluded proxy)
//! - De-duplication of redelivered lines within a short window

mod classify;
mod fragment;
mod normalizer;

pub use classify::{classify_speaker, AgentNaming, SpeakerClass};
pub use fragment::{
    SpeakerRole, TranscriptFragment, ATTR_SEGMENT_ID, ATTR_TRANSCRIBED_TRACK_ID,
    ATTR_TRANSCRIPTION_FINAL,
};
pub use normalizer::{NormalizerConfig, NormalizerStats, TranscriptNormalizer};
