//! RDS database instance records

use super::{reformat_timestamp, BaseRecord};
use crate::error::Result;
use crate::notification::ConfigurationItem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DbInstanceConfiguration {
    #[serde(rename = "dBInstanceClass")]
    instance_class: String,
    engine: String,
    engine_version: String,
    #[serde(rename = "dBInstanceStatus")]
    instance_status: String,
    #[serde(default, rename = "dBInstanceIdentifier")]
    instance_identifier: Option<String>,
    auto_minor_version_upgrade: bool,
}

/// Fields only known while the database instance exists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DbInstanceDetails {
    pub model_id: Option<String>,
    #[serde(rename = "u_engine")]
    pub engine: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "u_rds_instance_status")]
    pub instance_status: Option<String>,
    #[serde(rename = "u_instance_id")]
    pub instance_id: Option<String>,
    #[serde(rename = "u_rds_auto_minor_version_upgrade")]
    pub auto_minor_version_upgrade: Option<bool>,
    pub installed: Option<String>,
}

/// Record for `AWS::RDS::DBInstance`
#[derive(Debug, Clone, Serialize)]
pub struct DbInstanceRecord {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(rename = "u_arn")]
    pub arn: Option<String>,
    #[serde(rename = "u_rds_name")]
    pub rds_name: Option<String>,
    #[serde(flatten)]
    pub details: DbInstanceDetails,
}

impl DbInstanceRecord {
    pub fn from_item(mut base: BaseRecord, item: &ConfigurationItem) -> Result<Self> {
        base.asset_tag = Some(item.resource_id.clone());
        if item.resource_name.is_some() {
            base.tags.name = item.resource_name.clone();
        }

        let details = match &item.configuration {
            Some(configuration) => {
                let conf = DbInstanceConfiguration::deserialize(configuration)?;
                base.availability_zone = item.availability_zone.clone();
                DbInstanceDetails {
                    model_id: Some(conf.instance_class),
                    engine: Some(conf.engine),
                    version: Some(conf.engine_version),
                    instance_status: Some(conf.instance_status),
                    instance_id: conf.instance_identifier,
                    auto_minor_version_upgrade: Some(conf.auto_minor_version_upgrade),
                    installed: item
                        .resource_creation_time
                        .as_deref()
                        .map(reformat_timestamp)
                        .transpose()?,
                }
            }
            None => DbInstanceDetails::default(),
        };

        Ok(Self {
            base,
            arn: item.arn.clone(),
            rds_name: item.resource_name.clone(),
            details,
        })
    }
}
