//! AWS service access
//!
//! Thin wrappers over the AWS SDK clients the pipeline needs. Everything
//! that talks to AWS returns `anyhow::Result`; the router converts failures
//! into pipeline errors where it needs to classify them.
//!
//! # Module Structure
//!
//! - [`s3`] - Blob store for notifications delivered to S3
//! - [`sqs`] - Queue draining
//! - [`secrets`] - CMDB credentials from Secrets Manager

pub mod s3;
pub mod secrets;
pub mod sqs;

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Load the shared SDK configuration, optionally pinned to a region
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}
