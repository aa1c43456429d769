//! Blob store for notifications stored in S3
//!
//! AWS Config writes oversized item changes and configuration snapshots to S3
//! as gzip compressed JSON and only notifies about their location.

use crate::error::{PipelineError, Result};
use crate::notification::BlobLocation;
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;

/// Suffix of every blob AWS Config delivers
const GZIP_JSON_SUFFIX: &str = ".json.gz";

/// Raw object access, implemented by S3 and by in-memory stores in tests
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn fetch(&self, location: &BlobLocation) -> anyhow::Result<Vec<u8>>;
}

/// [`BlobStore`] backed by the S3 API
#[derive(Clone)]
pub struct S3BlobStore {
    client: s3::Client,
}

impl S3BlobStore {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: s3::Client::new(config),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn fetch(&self, location: &BlobLocation) -> anyhow::Result<Vec<u8>> {
        tracing::debug!("GET {}", location);

        let output = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .context("Failed to get object")?;

        let body = output
            .body
            .collect()
            .await
            .context("Failed to read object body")?;

        Ok(body.into_bytes().to_vec())
    }
}

/// Fetch a blob and decode it into JSON
pub async fn fetch_json<B: BlobStore + ?Sized>(store: &B, location: &BlobLocation) -> Result<Value> {
    if !location.key.ends_with(GZIP_JSON_SUFFIX) {
        return Err(PipelineError::malformed(format!(
            "unsupported file type: {}",
            location.key
        )));
    }

    let bytes = store
        .fetch(location)
        .await
        .map_err(|source| PipelineError::Storage {
            bucket: location.bucket.clone(),
            key: location.key.clone(),
            source,
        })?;

    decode_blob(location, &bytes)
}

/// Gunzip and parse the contents of a `.json.gz` blob
pub fn decode_blob(location: &BlobLocation, bytes: &[u8]) -> Result<Value> {
    let mut json = String::new();
    GzDecoder::new(bytes)
        .read_to_string(&mut json)
        .map_err(|e| PipelineError::malformed(format!("{location} is not valid gzip: {e}")))?;

    Ok(serde_json::from_str(&json)?)
}
