//! AWS Config to ServiceNow CMDB
//!
//! Normalizes AWS Config notifications (item changes, oversized item changes
//! and configuration snapshots) into flat records and writes them into
//! ServiceNow import set tables.
//!
//! # Module Structure
//!
//! - [`notification`] - Classification and routing of notifications
//! - [`record`] - Mapping of configuration items into CMDB records
//! - [`cmdb`] - ServiceNow output
//! - [`aws`] - S3, SQS and Secrets Manager access
//! - [`intake`] - Envelope unwrapping
//! - [`config`] - Settings
//! - [`error`] - Pipeline errors

pub mod aws;
pub mod cmdb;
pub mod config;
pub mod error;
pub mod intake;
pub mod notification;
pub mod record;

/// Version injected at compile time via AWSCONFIG_CMDB_VERSION env var (set
/// by CI/CD), or "dev" for local builds.
pub const VERSION: &str = match option_env!("AWSCONFIG_CMDB_VERSION") {
    Some(v) => v,
    None => "dev",
};
