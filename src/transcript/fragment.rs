use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stream attribute carrying the transcription segment id
pub const ATTR_SEGMENT_ID: &str = "lk.segment_id";

/// Stream attribute carrying `"true"`/`"false"` finality
pub const ATTR_TRANSCRIPTION_FINAL: &str = "lk.transcription_final";

/// Stream attribute referencing the audio track that was transcribed
pub const ATTR_TRANSCRIBED_TRACK_ID: &str = "lk.transcribed_track_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    Human,
    Agent,
}

/// One materialized unit of speech-to-text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub speaker_role: SpeakerRole,

    /// Final text, never empty
    pub text: String,

    pub is_final: bool,

    /// When the fragment was received; only used for de-duplication
    pub produced_at: DateTime<Utc>,

    /// Segment id from the stream attributes, if any
    pub segment_id: Option<String>,

    /// Identity of the participant the stream came from
    pub participant_identity: String,
}
