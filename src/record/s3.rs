//! S3 bucket records
//!
//! Bucket settings live in `supplementaryConfiguration`. The access control
//! list is delivered as a JSON document encoded into a string.

use super::BaseRecord;
use crate::error::Result;
use crate::notification::ConfigurationItem;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Grantee name of the public "everyone" group
const ALL_USERS_GRANTEE: &str = "AllUsers";

#[derive(Debug, Clone, Deserialize)]
struct VersioningConfiguration {
    status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoggingConfiguration {
    #[serde(default)]
    destination_bucket_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessControlList {
    #[serde(default)]
    grant_list: Vec<Grant>,
}

#[derive(Debug, Clone, Deserialize)]
struct Grant {
    /// Either a group name or an object describing a canonical user
    grantee: Value,
    permission: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LifecycleConfiguration {
    #[serde(default)]
    rules: Vec<Value>,
}

/// Fields only known while the bucket exists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BucketDetails {
    #[serde(rename = "u_bucket_versioning")]
    pub versioning: Option<String>,
    #[serde(rename = "u_bucket_logging_destination_bucket")]
    pub logging_destination_bucket: Option<String>,
    /// Permission granted to everyone, if any
    #[serde(rename = "u_bucket_acl_allusers")]
    pub acl_all_users: Option<String>,
    #[serde(rename = "u_bucket_lifecycle")]
    pub lifecycle: Option<bool>,
}

/// Record for `AWS::S3::Bucket`
#[derive(Debug, Clone, Serialize)]
pub struct BucketRecord {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(rename = "u_arn")]
    pub arn: String,
    #[serde(rename = "u_bucket_name")]
    pub bucket_name: Option<String>,
    #[serde(flatten)]
    pub details: BucketDetails,
}

impl BucketRecord {
    pub fn from_item(mut base: BaseRecord, item: &ConfigurationItem) -> Result<Self> {
        let arn = item.require_arn()?.to_string();
        base.asset_tag = Some(arn.clone());
        if item.resource_name.is_some() {
            base.tags.name = item.resource_name.clone();
        }

        let details = if item.configuration.is_some() {
            BucketDetails::from_item(item)?
        } else {
            BucketDetails::default()
        };

        Ok(Self {
            base,
            arn,
            bucket_name: item.resource_name.clone(),
            details,
        })
    }
}

impl BucketDetails {
    fn from_item(item: &ConfigurationItem) -> Result<Self> {
        let versioning = item
            .supplementary("BucketVersioningConfiguration")
            .map(VersioningConfiguration::deserialize)
            .transpose()?
            .map(|v| v.status);

        let logging_destination_bucket = match item.supplementary("BucketLoggingConfiguration") {
            Some(config) if config.as_object().is_some_and(|m| !m.is_empty()) => {
                LoggingConfiguration::deserialize(config)?.destination_bucket_name
            }
            _ => None,
        };

        let acl_all_users = match item.supplementary("AccessControlList") {
            Some(Value::String(document)) => all_users_permission(document)?,
            Some(other) => all_users_permission(&other.to_string())?,
            None => None,
        };

        let lifecycle = match item.supplementary("BucketLifecycleConfiguration") {
            Some(config) => !LifecycleConfiguration::deserialize(config)?.rules.is_empty(),
            None => false,
        };

        Ok(Self {
            versioning,
            logging_destination_bucket,
            acl_all_users,
            lifecycle: Some(lifecycle),
        })
    }
}

/// Permission of the `AllUsers` grant in a JSON-encoded access control list
fn all_users_permission(document: &str) -> Result<Option<String>> {
    let acl: AccessControlList = serde_json::from_str(document)?;
    Ok(acl
        .grant_list
        .into_iter()
        .filter(|grant| grant.grantee.as_str() == Some(ALL_USERS_GRANTEE))
        .map(|grant| grant.permission)
        .last())
}
