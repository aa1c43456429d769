//! HTTP utilities for ServiceNow REST API calls

use super::CmdbCredentials;
use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let total = body.chars().count();
    let truncated = if total > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// HTTP client wrapper for ServiceNow API calls
#[derive(Clone)]
pub struct CmdbHttpClient {
    client: Client,
    credentials: CmdbCredentials,
}

impl CmdbHttpClient {
    /// Create a new HTTP client
    pub fn new(credentials: CmdbCredentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("awsconfig-cmdb/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// POST a JSON body with basic auth. Returns the status and the raw
    /// response body; interpreting the status is up to the caller.
    pub async fn post(&self, url: &str, body: &Value) -> Result<(StatusCode, String)> {
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok((status, response_body))
    }
}
