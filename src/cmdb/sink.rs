//! Record sinks
//!
//! [`CmdbSink`] writes submissions into ServiceNow import set tables,
//! [`DryRunSink`] only logs them.

use super::http::{sanitize_for_log, CmdbHttpClient};
use super::CmdbCredentials;
use crate::error::{PipelineError, Result};
use crate::record::Submission;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

/// Destination of normalized records
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn submit(&self, submission: &Submission) -> Result<()>;
}

#[async_trait]
impl RecordSink for Box<dyn RecordSink> {
    async fn submit(&self, submission: &Submission) -> Result<()> {
        (**self).submit(submission).await
    }
}

/// Sink posting to the ServiceNow Import Set API
#[derive(Clone)]
pub struct CmdbSink {
    http: CmdbHttpClient,
    base_url: String,
}

impl CmdbSink {
    /// `base_url` is the instance root, e.g. `https://acme.service-now.com`
    pub fn new(base_url: &str, credentials: CmdbCredentials) -> anyhow::Result<Self> {
        let parsed = Url::parse(base_url).with_context(|| format!("Invalid CMDB URL {}", base_url))?;
        if parsed.cannot_be_a_base() {
            anyhow::bail!("Invalid CMDB URL {}", base_url);
        }

        Ok(Self {
            http: CmdbHttpClient::new(credentials)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Import set endpoint of `table`
    pub fn import_url(&self, table: &str) -> String {
        format!(
            "{}/api/now/import/{}",
            self.base_url,
            urlencoding::encode(table)
        )
    }
}

#[async_trait]
impl RecordSink for CmdbSink {
    async fn submit(&self, submission: &Submission) -> Result<()> {
        let url = self.import_url(&submission.table);
        let record = Value::Object(submission.payload.clone());

        let (status, body) = self.http.post(&url, &record).await.map_err(|e| {
            tracing::error!("CMDB request to {} failed: {:#}, record: {}", url, e, record);
            PipelineError::Submission {
                url: url.clone(),
                reason: format!("{e:#}"),
            }
        })?;

        if status != StatusCode::CREATED {
            tracing::error!(
                "CMDB rejected record: {} {} - {}, record: {}",
                url,
                status,
                sanitize_for_log(&body),
                record
            );
            return Err(PipelineError::Submission {
                url,
                reason: format!("unexpected status {}", status),
            });
        }

        tracing::debug!("Created import row in {}", submission.table);
        Ok(())
    }
}

/// Sink that logs records instead of submitting them
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSink;

#[async_trait]
impl RecordSink for DryRunSink {
    async fn submit(&self, submission: &Submission) -> Result<()> {
        let record = Value::Object(submission.payload.clone());
        tracing::info!("Dry run, not submitting to {}: {}", submission.table, record);
        Ok(())
    }
}
