use tracing::debug;

use super::view::{ReportView, SessionRecord};
use crate::config::ReportConfig;
use crate::error::{OrchestratorError, Result};

/// Read side of the report compiler
#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_record(&self, session_id: &str) -> Result<SessionRecord>;

    async fn fetch_report(&self, session_id: &str) -> Result<ReportView> {
        Ok(self.fetch_record(session_id).await?.view())
    }
}

/// Fetches session records from the backend over HTTP
#[derive(Debug, Clone)]
pub struct HttpReportClient {
    http: reqwest::Client,
    base_url: String,
    path_template: String,
}

impl HttpReportClient {
    pub fn new(base_url: impl Into<String>, path_template: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            path_template: path_template.into(),
        }
    }

    pub fn from_config(cfg: &ReportConfig) -> Self {
        Self::new(cfg.base_url.clone(), cfg.path_template.clone())
    }

    pub fn record_url(&self, session_id: &str) -> String {
        format!(
            "{}{}",
            self.base_url,
            self.path_template.replace("{session_id}", session_id)
        )
    }
}

#[async_trait::async_trait]
impl ReportSource for HttpReportClient {
    async fn fetch_record(&self, session_id: &str) -> Result<SessionRecord> {
        let url = self.record_url(session_id);
        debug!("Fetching session record from {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| OrchestratorError::Report(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OrchestratorError::Report(format!("status {}", status)));
        }

        resp.json::<SessionRecord>()
            .await
            .map_err(|e| OrchestratorError::Report(format!("undecodable session record: {}", e)))
    }
}
