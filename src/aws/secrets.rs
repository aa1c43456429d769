//! CMDB credentials from Secrets Manager

use crate::cmdb::CmdbCredentials;
use anyhow::{Context, Result};
use aws_sdk_secretsmanager as secretsmanager;
use serde::Deserialize;

/// Layout of the secret string
#[derive(Deserialize)]
struct SecretDocument {
    snow_user: String,
    snow_password: String,
    snow_hostname: String,
}

/// Read the credentials stored under `secret_id`
pub async fn fetch_credentials(
    config: &aws_config::SdkConfig,
    secret_id: &str,
) -> Result<CmdbCredentials> {
    tracing::debug!("Fetching CMDB credentials from secret {}", secret_id);

    let client = secretsmanager::Client::new(config);
    let response = client
        .get_secret_value()
        .secret_id(secret_id)
        .send()
        .await
        .with_context(|| format!("Failed to get secret {}", secret_id))?;

    let secret = response
        .secret_string()
        .with_context(|| format!("Secret {} has no string value", secret_id))?;

    parse_secret(secret).with_context(|| format!("Invalid secret {}", secret_id))
}

fn parse_secret(secret: &str) -> Result<CmdbCredentials> {
    let document: SecretDocument =
        serde_json::from_str(secret).context("Failed to parse secret JSON")?;

    Ok(CmdbCredentials {
        hostname: document.snow_hostname,
        user: document.snow_user,
        password: document.snow_password,
    })
}
