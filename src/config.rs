use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::room::naming::{AGENT_IDENTITY_PREFIX, DEFAULT_ROOM_PREFIX};

/// Environment overlay prefix, e.g. `INTERVIEW__REALTIME__API_SECRET`.
pub const ENV_PREFIX: &str = "INTERVIEW";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub realtime: RealtimeConfig,
    pub transport: TransportConfig,
    pub report: ReportConfig,
    pub transcript: TranscriptConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Base URL of the credential issuance API used by `join`
    pub credential_base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "interview-orchestrator".to_string(),
            http: HttpConfig::default(),
            credential_base_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Realtime platform settings used to mint room credentials
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Connection endpoint handed to clients alongside the token
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Agent name matcher embedded in the dispatch instruction.
    /// Must equal the worker's registered name; empty selects unnamed workers.
    pub agent_name: String,
    /// Namespace prefix the dispatch rule matches rooms against
    pub room_prefix: String,
    pub token_ttl_secs: u64,
    pub default_participant_name: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            api_secret: None,
            agent_name: String::new(),
            room_prefix: DEFAULT_ROOM_PREFIX.to_string(),
            token_ttl_secs: 7200, // 2 hours, enough for long interviews
            default_participant_name: "Candidate".to_string(),
        }
    }
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "[REDACTED]"))
            .field("agent_name", &self.agent_name)
            .field("room_prefix", &self.room_prefix)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

impl RealtimeConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Text stream channel the agent publishes transcriptions on
    pub text_stream_topic: String,
    /// Data topic carrying backend progress events
    pub progress_topic: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            text_stream_topic: "lk.transcription".to_string(),
            progress_topic: "interview.progress".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub base_url: String,
    /// `{session_id}` is substituted
    pub path_template: String,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            path_template: "/interview/session/{session_id}".to_string(),
            poll_interval_ms: 500,
            max_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub dedup_tolerance_ms: u64,
    /// How many recent fragments are scanned for duplicates
    pub dedup_window: usize,
    /// Text streams kept open while waiting for their closing frame
    pub max_open_streams: usize,
    pub agent_identity_prefix: String,
    /// Lowercase substrings of a display name that mark the agent
    pub agent_name_markers: Vec<String>,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            dedup_tolerance_ms: 1000,
            dedup_window: 16,
            max_open_streams: 32,
            agent_identity_prefix: AGENT_IDENTITY_PREFIX.to_string(),
            agent_name_markers: vec!["agent".to_string(), "interviewer".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Normalized RMS (0.0 to 1.0) below which a frame counts as silent
    pub silence_threshold: f32,
    pub silence_hold_ms: u64,
    pub max_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.02,
            silence_hold_ms: 2000,
            max_duration_ms: 120_000,
        }
    }
}

impl Config {
    /// Load configuration from a file (extension optional) with the
    /// `INTERVIEW__*` environment overlay on top.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .context("Failed to deserialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.report.poll_interval_ms, 500);
        assert_eq!(cfg.report.max_attempts, 10);
        assert_eq!(cfg.transcript.dedup_tolerance_ms, 1000);
        assert_eq!(cfg.realtime.room_prefix, "interview-");
        assert_eq!(cfg.realtime.token_ttl(), Duration::from_secs(7200));
        assert!(cfg.realtime.agent_name.is_empty());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            r#"
[realtime]
url = "wss://rooms.example.com"
api_key = "key"
api_secret = "secret"
agent_name = "interview-coach"

[report]
max_attempts = 4
"#
        )?;

        let cfg = Config::load(file.path().to_str().unwrap())?;
        assert_eq!(cfg.realtime.url.as_deref(), Some("wss://rooms.example.com"));
        assert_eq!(cfg.realtime.agent_name, "interview-coach");
        assert_eq!(cfg.report.max_attempts, 4);
        assert_eq!(cfg.report.poll_interval_ms, 500);
        assert_eq!(cfg.transport.text_stream_topic, "lk.transcription");
        Ok(())
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cfg = RealtimeConfig {
            api_secret: Some("super-secret".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("[REDACTED]"));
    }
}
