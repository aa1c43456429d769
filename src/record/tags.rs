//! Tag normalization
//!
//! Well-known tag names map onto dedicated CMDB fields, matched without
//! regard to case. Everything else is collected into `u_additional_tags`.

use crate::notification::Tags;
use serde::Serialize;

/// Separator between entries of `u_additional_tags`
const ADDITIONAL_TAG_SEPARATOR: &str = "; ";

/// Fields derived from resource tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagFields {
    pub name: Option<String>,
    pub cost_center: Option<String>,
    #[serde(rename = "u_used_for")]
    pub used_for: Option<String>,
    #[serde(rename = "u_service_tag")]
    pub service: Option<String>,
    #[serde(rename = "u_backup_group")]
    pub backup_group: Option<String>,
    #[serde(rename = "u_group")]
    pub group: Option<String>,
    #[serde(rename = "u_expiration")]
    pub expiration: Option<String>,
    #[serde(rename = "u_client")]
    pub client: Option<String>,
    #[serde(rename = "u_pod")]
    pub pod: Option<String>,
    #[serde(rename = "u_poc")]
    pub poc: Option<String>,
    #[serde(rename = "u_classification")]
    pub classification: Option<String>,
    /// `KEY=value` entries for unrecognized tags, joined by `; `
    #[serde(rename = "u_additional_tags")]
    pub additional: Option<String>,
}

impl TagFields {
    pub fn parse(tags: &Tags) -> Self {
        let mut fields = Self::default();
        let mut additional = Vec::new();

        for (key, value) in tags.pairs() {
            let key = key.to_uppercase();
            let slot = match key.as_str() {
                "COSTCENTER" => &mut fields.cost_center,
                "NAME" => &mut fields.name,
                "ENVIRONMENT" => &mut fields.used_for,
                "SERVICE" => &mut fields.service,
                "BACKUPGROUP" => &mut fields.backup_group,
                "GROUP" => &mut fields.group,
                "EXPIRATION" => &mut fields.expiration,
                "CLIENT" => &mut fields.client,
                "POD" => &mut fields.pod,
                "POC" => &mut fields.poc,
                "CLASSIFICATION" => &mut fields.classification,
                _ => {
                    additional.push(format!("{key}={value}"));
                    continue;
                }
            };
            *slot = Some(value);
        }

        if !additional.is_empty() {
            fields.additional = Some(additional.join(ADDITIONAL_TAG_SEPARATOR));
        }

        fields
    }
}
