//! AWS Config notification shapes
//!
//! Typed views over the JSON delivered by AWS Config. Item changes are only
//! parsed in full once their resource type has been accepted, so resources
//! of unrelated kinds never have to match these shapes.

use super::kinds::{MessageKind, ResourceKind};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

/// One resource as described by AWS Config
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItem {
    pub resource_type: String,
    pub resource_id: String,
    #[serde(default)]
    pub resource_name: Option<String>,
    #[serde(rename = "ARN", default)]
    pub arn: Option<String>,
    pub aws_account_id: String,
    /// The key must be present, the value may be null
    #[serde(deserialize_with = "Option::deserialize")]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub tags: Option<Tags>,
    /// Null when the item describes a deleted resource
    #[serde(default)]
    pub configuration: Option<Value>,
    #[serde(default)]
    pub supplementary_configuration: Option<Value>,
    pub configuration_item_capture_time: String,
    #[serde(default)]
    pub resource_creation_time: Option<String>,
    #[serde(default)]
    pub configuration_item_status: Option<String>,
}

impl ConfigurationItem {
    pub fn resource_kind(&self) -> ResourceKind {
        ResourceKind::from_type_name(&self.resource_type)
    }

    /// The ARN, which some mappers cannot do without
    pub fn require_arn(&self) -> Result<&str> {
        self.arn.as_deref().ok_or_else(|| {
            PipelineError::malformed(format!(
                "{} {} has no ARN",
                self.resource_type, self.resource_id
            ))
        })
    }

    /// Reported before AWS Config captured any configuration
    pub fn is_discovered(&self) -> bool {
        self.configuration_item_status.as_deref() == Some("ResourceDiscovered")
    }

    pub fn supplementary(&self, key: &str) -> Option<&Value> {
        self.supplementary_configuration
            .as_ref()
            .and_then(|s| s.get(key))
            .filter(|v| !v.is_null())
    }
}

/// Resource tags in either of the two shapes AWS Config uses
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    /// `[{"key": "Name", "value": "web-1"}]`
    Pairs(Vec<TagPair>),
    /// `{"Name": "web-1"}`
    Map(Map<String, Value>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagPair {
    pub key: String,
    #[serde(default, deserialize_with = "tag_value")]
    pub value: String,
}

fn tag_value<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(render_tag_value(&Value::deserialize(deserializer)?))
}

/// Tag values are strings in practice; anything else is rendered as JSON
pub fn render_tag_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Tags {
    /// Tags as (name, value) pairs in delivery order
    pub fn pairs(&self) -> Vec<(&str, String)> {
        match self {
            Self::Pairs(pairs) => pairs
                .iter()
                .map(|p| (p.key.as_str(), p.value.clone()))
                .collect(),
            Self::Map(map) => map
                .iter()
                .map(|(k, v)| (k.as_str(), render_tag_value(v)))
                .collect(),
        }
    }
}

/// Change kind of a configuration item diff or of a single changed property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiffChangeType {
    Create,
    Update,
    Delete,
}

impl DiffChangeType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItemDiff {
    pub change_type: DiffChangeType,
    /// Property path to changed property, kept raw so the property
    /// change types can be validated by the mapper that cares
    #[serde(default)]
    pub changed_properties: Map<String, Value>,
}

/// A single entry of `changedProperties`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedProperty {
    pub change_type: String,
    #[serde(default)]
    pub previous_value: Option<Value>,
    #[serde(default)]
    pub updated_value: Option<Value>,
}

/// Item change once fully parsed
#[derive(Debug, Clone)]
pub struct ParsedChange {
    pub item: ConfigurationItem,
    pub diff: Option<ConfigurationItemDiff>,
}

/// An item change whose resource type is known but whose body is still raw
#[derive(Debug, Clone)]
pub struct ItemChange {
    pub resource_kind: ResourceKind,
    message: Value,
}

impl ItemChange {
    pub fn from_message(message: Value) -> Result<Self> {
        let resource_type = message
            .get("configurationItem")
            .and_then(|item| item.get("resourceType"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                PipelineError::malformed("configurationItem.resourceType missing from message")
            })?;

        Ok(Self {
            resource_kind: ResourceKind::from_type_name(resource_type),
            message,
        })
    }

    /// Wrap a single item from a snapshot bundle. Without a diff the change
    /// kind of the resulting record is `snapshot`.
    pub fn from_snapshot_item(item: Value) -> Result<Self> {
        Self::from_message(json!({ "configurationItem": item }))
    }

    pub fn parse(&self) -> Result<ParsedChange> {
        let item = self
            .message
            .get("configurationItem")
            .filter(|v| !v.is_null())
            .ok_or_else(|| PipelineError::malformed("configurationItem missing from message"))?;
        let item = ConfigurationItem::deserialize(item)?;

        let diff = match self.message.get("configurationItemDiff") {
            None | Some(Value::Null) => None,
            Some(diff) => Some(ConfigurationItemDiff::deserialize(diff)?),
        };

        Ok(ParsedChange { item, diff })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    #[serde(default)]
    pub resource_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3DeliverySummary {
    #[serde(default)]
    pub s3_bucket_location: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OversizedItemChange {
    #[serde(default)]
    pub configuration_item_summary: Option<ItemSummary>,
    #[serde(default)]
    pub s3_delivery_summary: Option<S3DeliverySummary>,
}

impl OversizedItemChange {
    pub fn summary_resource_kind(&self) -> Option<ResourceKind> {
        self.configuration_item_summary
            .as_ref()
            .and_then(|s| s.resource_type.as_deref())
            .map(ResourceKind::from_type_name)
    }

    /// Where the full notification was stored, failing if the delivery
    /// itself reported an error
    pub fn location(&self) -> Result<BlobLocation> {
        let delivery = self
            .s3_delivery_summary
            .as_ref()
            .ok_or_else(|| PipelineError::malformed("s3DeliverySummary missing"))?;
        if delivery.error_code.is_some() || delivery.error_message.is_some() {
            return Err(PipelineError::StorageDelivery {
                code: delivery.error_code.clone().unwrap_or_else(|| "None".to_string()),
                message: delivery
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "None".to_string()),
            });
        }

        let location = delivery.s3_bucket_location.as_deref().ok_or_else(|| {
            PipelineError::malformed("s3DeliverySummary.s3BucketLocation missing")
        })?;
        BlobLocation::from_bucket_location(location)
    }
}

/// Bucket and key of an object in S3
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub bucket: String,
    pub key: String,
}

impl BlobLocation {
    /// Split `bucket/path/to/key` at the first slash
    pub fn from_bucket_location(location: &str) -> Result<Self> {
        match location.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(PipelineError::malformed(format!(
                "invalid S3 bucket location: {location}"
            ))),
        }
    }
}

impl std::fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDelivery {
    s3_bucket: String,
    s3_object_key: String,
}

/// Contents of a configuration snapshot object
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBundle {
    pub configuration_items: Vec<Value>,
}

/// An inbound notification, classified by message type
#[derive(Debug, Clone)]
pub enum Notification {
    ItemChange(ItemChange),
    OversizedItemChange(OversizedItemChange),
    SnapshotDeliveryCompleted(BlobLocation),
    Discarded(MessageKind),
    Unrecognized(String),
}

impl Notification {
    pub fn message_kind(message: &Value) -> Result<MessageKind> {
        message
            .get("messageType")
            .and_then(|v| v.as_str())
            .map(MessageKind::from_type_name)
            .ok_or_else(|| PipelineError::malformed("message doesn't contain messageType"))
    }

    pub fn from_message(message: Value) -> Result<Self> {
        let kind = Self::message_kind(&message)?;

        if kind.is_discarded() {
            return Ok(Self::Discarded(kind));
        }

        match kind {
            MessageKind::ItemChange => Ok(Self::ItemChange(ItemChange::from_message(message)?)),
            MessageKind::OversizedItemChange => Ok(Self::OversizedItemChange(
                OversizedItemChange::deserialize(&message)?,
            )),
            MessageKind::SnapshotDeliveryCompleted => {
                let delivery = SnapshotDelivery::deserialize(&message)?;
                Ok(Self::SnapshotDeliveryCompleted(BlobLocation {
                    bucket: delivery.s3_bucket,
                    key: delivery.s3_object_key,
                }))
            }
            MessageKind::Other(name) => Ok(Self::Unrecognized(name)),
            discarded => Ok(Self::Discarded(discarded)),
        }
    }
}
