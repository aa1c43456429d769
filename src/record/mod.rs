//! CMDB records
//!
//! Every accepted configuration item is mapped into one [`ResourceRecord`]
//! variant. All variants share a [`BaseRecord`] carrying the fields common to
//! every resource (account, region, tags, change timestamps) and add their
//! own resource-specific fields on top.
//!
//! # Module Structure
//!
//! - [`tags`] - Tag normalization into named fields
//! - [`ec2`] - EC2 instances
//! - [`elb`] - Classic and v2 load balancers
//! - [`s3`] - S3 buckets
//! - [`rds`] - RDS database instances
//! - [`ssm_inventory`] - SSM managed instance software inventory

pub mod ec2;
pub mod elb;
pub mod rds;
pub mod s3;
pub mod ssm_inventory;
pub mod tags;

use crate::error::{PipelineError, Result};
use crate::notification::{ConfigurationItem, ConfigurationItemDiff, DiffChangeType, ResourceKind};
use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub use ec2::Ec2InstanceRecord;
pub use elb::LoadBalancerRecord;
pub use rds::DbInstanceRecord;
pub use s3::BucketRecord;
pub use ssm_inventory::SoftwareInventoryRecord;
pub use tags::TagFields;

/// Timestamp format of AWS Config
const AWS_CONFIG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Timestamp format expected by the CMDB import sets
const CMDB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// State reported for anything deleted
pub const TERMINATED_STATE: &str = "terminated";

/// Reformat an AWS Config timestamp (`2023-01-15T10:30:00.123Z`) for the
/// CMDB (`2023-01-15 10:30:00`)
pub fn reformat_timestamp(value: &str) -> Result<String> {
    NaiveDateTime::parse_from_str(value, AWS_CONFIG_TIME_FORMAT)
        .map(|t| t.format(CMDB_TIME_FORMAT).to_string())
        .map_err(|source| PipelineError::Timestamp {
            value: value.to_string(),
            source,
        })
}

/// Why a record was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Periodic snapshot, or a change notification without a diff
    Snapshot,
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn from_diff(diff: Option<&ConfigurationItemDiff>) -> Self {
        match diff.map(|d| d.change_type) {
            None => Self::Snapshot,
            Some(DiffChangeType::Create) => Self::Create,
            Some(DiffChangeType::Update) => Self::Update,
            Some(DiffChangeType::Delete) => Self::Delete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Record field holding the capture time for this change kind
    fn last_change_field(&self) -> &'static str {
        match self {
            Self::Snapshot => "u_last_change_snapshot",
            Self::Create => "u_last_change_create",
            Self::Update => "u_last_change_update",
            Self::Delete => "u_last_change_delete",
        }
    }
}

impl Serialize for ChangeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Capture time of the item, stored in exactly one of the four
/// `u_last_change_*` fields depending on the change kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastChange {
    pub kind: ChangeKind,
    pub at: String,
}

impl Serialize for LastChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        for kind in [
            ChangeKind::Update,
            ChangeKind::Snapshot,
            ChangeKind::Delete,
            ChangeKind::Create,
        ] {
            let value = (kind == self.kind).then_some(self.at.as_str());
            map.serialize_entry(kind.last_change_field(), &value)?;
        }
        map.end()
    }
}

/// Fields every resource record carries
#[derive(Debug, Clone, Serialize)]
pub struct BaseRecord {
    pub install_date: Option<String>,
    pub asset_tag: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "u_region")]
    pub region: Option<String>,
    #[serde(rename = "u_account_id")]
    pub account_id: String,
    #[serde(rename = "u_availability_zone")]
    pub availability_zone: Option<String>,
    #[serde(flatten)]
    pub tags: TagFields,
    #[serde(flatten)]
    pub last_change: LastChange,
    pub change_type: ChangeKind,
}

impl BaseRecord {
    pub fn from_item(item: &ConfigurationItem, diff: Option<&ConfigurationItemDiff>) -> Result<Self> {
        let change_type = ChangeKind::from_diff(diff);

        let install_date = item
            .resource_creation_time
            .as_deref()
            .map(reformat_timestamp)
            .transpose()?;

        Ok(Self {
            install_date,
            asset_tag: None,
            state: (change_type == ChangeKind::Delete).then(|| TERMINATED_STATE.to_string()),
            region: item.aws_region.clone(),
            account_id: item.aws_account_id.clone(),
            availability_zone: None,
            tags: item.tags.as_ref().map(TagFields::parse).unwrap_or_default(),
            last_change: LastChange {
                kind: change_type,
                at: reformat_timestamp(&item.configuration_item_capture_time)?,
            },
            change_type,
        })
    }

    pub fn is_deletion(&self) -> bool {
        self.change_type == ChangeKind::Delete
    }
}

/// A normalized record ready to be submitted
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResourceRecord {
    Ec2Instance(Ec2InstanceRecord),
    LoadBalancer(LoadBalancerRecord),
    Bucket(BucketRecord),
    DbInstance(DbInstanceRecord),
    SoftwareInventory(SoftwareInventoryRecord),
}

/// One POST to a CMDB import set table
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub table: String,
    pub payload: Map<String, Value>,
}

impl ResourceRecord {
    /// Map a configuration item into the record for its resource kind.
    /// Returns `None` for kinds without a mapper.
    pub fn build(
        item: &ConfigurationItem,
        diff: Option<&ConfigurationItemDiff>,
    ) -> Result<Option<Self>> {
        let base = BaseRecord::from_item(item, diff)?;

        let mut record = match item.resource_kind() {
            ResourceKind::Ec2Instance => Self::Ec2Instance(Ec2InstanceRecord::from_item(base, item)?),
            ResourceKind::ClassicLoadBalancer | ResourceKind::LoadBalancerV2 => {
                Self::LoadBalancer(LoadBalancerRecord::from_item(base, item)?)
            }
            ResourceKind::S3Bucket => Self::Bucket(BucketRecord::from_item(base, item)?),
            ResourceKind::RdsDbInstance => Self::DbInstance(DbInstanceRecord::from_item(base, item)?),
            ResourceKind::SsmInventory => {
                Self::SoftwareInventory(SoftwareInventoryRecord::from_item(base, item, diff)?)
            }
            ResourceKind::Other(_) => return Ok(None),
        };

        // Deleted resources are terminated whatever the configuration said.
        // A missing configuration also means deletion, except for an
        // inventory that was only just discovered.
        let discovered_inventory =
            matches!(record, Self::SoftwareInventory(_)) && item.is_discovered();
        let configuration_gone = item.configuration.is_none() && !discovered_inventory;
        let base = record.base_mut();
        if base.is_deletion() || configuration_gone {
            base.state = Some(TERMINATED_STATE.to_string());
        }

        Ok(Some(record))
    }

    pub fn base(&self) -> &BaseRecord {
        match self {
            Self::Ec2Instance(r) => &r.base,
            Self::LoadBalancer(r) => &r.base,
            Self::Bucket(r) => &r.base,
            Self::DbInstance(r) => &r.base,
            Self::SoftwareInventory(r) => &r.base,
        }
    }

    fn base_mut(&mut self) -> &mut BaseRecord {
        match self {
            Self::Ec2Instance(r) => &mut r.base,
            Self::LoadBalancer(r) => &mut r.base,
            Self::Bucket(r) => &mut r.base,
            Self::DbInstance(r) => &mut r.base,
            Self::SoftwareInventory(r) => &mut r.base,
        }
    }

    /// The flat JSON object sent to the CMDB
    pub fn to_payload(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(PipelineError::malformed(format!(
                "record serialized to a non-object: {other}"
            ))),
        }
    }

    /// Everything to POST for this record. Software inventory fans out into
    /// one submission per package; all other kinds submit themselves.
    pub fn submissions(&self, table: &str) -> Result<Vec<Submission>> {
        match self {
            Self::SoftwareInventory(inventory) => Ok(inventory
                .package_rows(self.to_payload()?)?
                .into_iter()
                .map(|payload| Submission {
                    table: table.to_string(),
                    payload,
                })
                .collect()),
            _ => Ok(vec![Submission {
                table: table.to_string(),
                payload: self.to_payload()?,
            }]),
        }
    }
}
