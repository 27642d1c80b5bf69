use crate::config::Config;
use crate::transcript::NormalizerConfig;

/// Configuration for one monitored room session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Transcript normalization, including the text stream topic to subscribe
    pub normalizer: NormalizerConfig,

    /// Data topic carrying backend progress events
    /// Default: "interview.progress"
    pub progress_topic: String,
}

impl SessionConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            normalizer: NormalizerConfig::from_config(&cfg.transport, &cfg.transcript),
            progress_topic: cfg.transport.progress_topic.clone(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
