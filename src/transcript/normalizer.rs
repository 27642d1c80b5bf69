use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::debug;

use super::classify::{classify_speaker, AgentNaming, SpeakerClass};
use super::fragment::{
    SpeakerRole, TranscriptFragment, ATTR_SEGMENT_ID, ATTR_TRANSCRIBED_TRACK_ID, ATTR_TRANSCRIPTION_FINAL,
};
use crate::config::{TranscriptConfig, TransportConfig};
use crate::room::transport::{ParticipantInfo, RoomEvent, TextStreamHeader};

/// Configuration for transcript normalization
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Text stream topic carrying transcriptions
    pub topic: String,

    /// Two identical lines from the same role closer than this are one line
    pub dedup_tolerance: Duration,

    /// Number of recent fragments scanned for duplicates
    pub dedup_window: usize,

    /// Open streams kept while waiting for their closing frame.
    /// The oldest is dropped when exceeded.
    pub max_open_streams: usize,

    pub naming: AgentNaming,
}

impl NormalizerConfig {
    pub fn from_config(transport: &TransportConfig, transcript: &TranscriptConfig) -> Self {
        Self {
            topic: transport.text_stream_topic.clone(),
            dedup_tolerance: Duration::from_millis(transcript.dedup_tolerance_ms),
            dedup_window: transcript.dedup_window.max(1),
            max_open_streams: transcript.max_open_streams.max(1),
            naming: AgentNaming::from_config(transcript),
        }
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default(), &TranscriptConfig::default())
    }
}

/// Counters for what happened to incoming streams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizerStats {
    pub materialized: usize,
    pub duplicates: usize,
    pub interim: usize,
    pub not_transcription: usize,
    pub excluded: usize,
    pub malformed: usize,
}

struct PendingStream {
    header: TextStreamHeader,
    text: String,
}

/// Turns raw room text streams into the visible transcript.
///
/// Reassembles chunked streams, keeps only final transcriptions from the human
/// or the agent, and drops redelivered duplicates. Output order is stream
/// close order; nothing is reordered.
pub struct TranscriptNormalizer {
    config: NormalizerConfig,
    local_identity: String,
    open: HashMap<String, PendingStream>,
    open_order: VecDeque<String>,
    recent: VecDeque<TranscriptFragment>,
    stats: NormalizerStats,
}

impl TranscriptNormalizer {
    pub fn new(config: NormalizerConfig, local_identity: impl Into<String>) -> Self {
        Self {
            config,
            local_identity: local_identity.into(),
            open: HashMap::new(),
            open_order: VecDeque::new(),
            recent: VecDeque::new(),
            stats: NormalizerStats::default(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    pub fn stats(&self) -> NormalizerStats {
        self.stats
    }

    /// Classify a participant the same way transcript lines are attributed
    pub fn classify(&self, participant: &ParticipantInfo) -> SpeakerClass {
        classify_speaker(participant, &self.local_identity, &self.config.naming)
    }

    /// Feed one room event; returns a fragment when a stream completes into a
    /// visible transcript line.
    pub fn handle(&mut self, event: &RoomEvent) -> Option<TranscriptFragment> {
        self.handle_at(event, Utc::now())
    }

    pub fn handle_at(
        &mut self,
        event: &RoomEvent,
        received_at: DateTime<Utc>,
    ) -> Option<TranscriptFragment> {
        match event {
            RoomEvent::TextStreamOpened(header) => {
                self.open_stream(header.clone());
                None
            }
            RoomEvent::TextStreamChunk { stream_id, text } => {
                match self.open.get_mut(stream_id) {
                    Some(pending) => pending.text.push_str(text),
                    None => {
                        debug!("Chunk for unknown text stream {}", stream_id);
                        self.stats.malformed += 1;
                    }
                }
                None
            }
            RoomEvent::TextStreamClosed { stream_id } => {
                let pending = match self.open.remove(stream_id) {
                    Some(p) => p,
                    None => {
                        debug!("Close for unknown text stream {}", stream_id);
                        self.stats.malformed += 1;
                        return None;
                    }
                };
                self.open_order.retain(|id| id != stream_id);
                self.accept_stream(&pending.header, &pending.text, received_at)
            }
            _ => None,
        }
    }

    /// Decide whether a complete text stream becomes a transcript line
    pub fn accept_stream(
        &mut self,
        header: &TextStreamHeader,
        text: &str,
        received_at: DateTime<Utc>,
    ) -> Option<TranscriptFragment> {
        let attrs = &header.attributes;
        let is_transcription = attrs.contains_key(ATTR_SEGMENT_ID)
            || attrs.contains_key(ATTR_TRANSCRIPTION_FINAL)
            || attrs.contains_key(ATTR_TRANSCRIBED_TRACK_ID);
        if !is_transcription {
            self.stats.not_transcription += 1;
            return None;
        }

        let is_final = attrs
            .get(ATTR_TRANSCRIPTION_FINAL)
            .map(|v| parse_flag(v))
            .unwrap_or(false);
        if !is_final {
            self.stats.interim += 1;
            return None;
        }

        let text = text.trim();
        if text.is_empty() {
            debug!("Final transcription with empty text on {}", header.stream_id);
            self.stats.malformed += 1;
            return None;
        }

        let class = self.classify(&header.participant);
        let role = match class.role() {
            Some(role) => role,
            None => {
                debug!(
                    "Ignoring transcription from non-primary participant {}",
                    header.participant.identity
                );
                self.stats.excluded += 1;
                return None;
            }
        };

        if self.is_duplicate(role, text, received_at) {
            debug!("Dropping duplicate {:?} line: {}", role, text);
            self.stats.duplicates += 1;
            return None;
        }

        let fragment = TranscriptFragment {
            speaker_role: role,
            text: text.to_string(),
            is_final,
            produced_at: received_at,
            segment_id: attrs.get(ATTR_SEGMENT_ID).cloned(),
            participant_identity: header.participant.identity.clone(),
        };

        self.recent.push_back(fragment.clone());
        while self.recent.len() > self.config.dedup_window {
            self.recent.pop_front();
        }
        self.stats.materialized += 1;

        Some(fragment)
    }

    fn open_stream(&mut self, header: TextStreamHeader) {
        if header.topic != self.config.topic {
            debug!("Ignoring text stream on topic {}", header.topic);
            self.stats.not_transcription += 1;
            return;
        }

        let stream_id = header.stream_id.clone();
        if self.open.contains_key(&stream_id) {
            self.open_order.retain(|id| id != &stream_id);
        }
        self.open.insert(
            stream_id.clone(),
            PendingStream {
                header,
                text: String::new(),
            },
        );
        self.open_order.push_back(stream_id);

        while self.open_order.len() > self.config.max_open_streams {
            if let Some(evicted) = self.open_order.pop_front() {
                debug!("Evicting unfinished text stream {}", evicted);
                self.open.remove(&evicted);
                self.stats.malformed += 1;
            }
        }
    }

    fn is_duplicate(
        &self,
        role: SpeakerRole,
        text: &str,
        received_at: DateTime<Utc>,
    ) -> bool {
        let tolerance = self.config.dedup_tolerance.as_millis() as i64;
        self.recent.iter().any(|f| {
            f.speaker_role == role
                && f.text == text
                && received_at
                    .signed_duration_since(f.produced_at)
                    .num_milliseconds()
                    .abs()
                    <= tolerance
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}
