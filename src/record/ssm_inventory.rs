//! SSM managed instance software inventory
//!
//! Unlike the other kinds, one inventory item turns into many CMDB rows: one
//! per installed package. Snapshots and newly created instances submit the
//! full package list, updates only submit the packages that changed, and
//! deletions submit nothing (the instance itself is marked terminated).

use super::{BaseRecord, ChangeKind};
use crate::error::{PipelineError, Result};
use crate::notification::{ChangedProperty, ConfigurationItem, ConfigurationItemDiff, DiffChangeType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Changed-property path prefix of installed applications
const APPLICATION_CONTENT_PREFIX: &str = "Configuration.AWS:Application.Content.";

/// Status of an instance that has no inventory yet

/// Marks a removed package in `u_package`
const REMOVED_PACKAGE_PREFIX: &str = "-";

/// One installed application as reported by the SSM agent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub release: Option<String>,
}

impl Package {
    /// `version-release` when a release is known, else just the version
    pub fn full_version(&self) -> String {
        match self.release.as_deref() {
            Some(release) if !release.is_empty() => format!("{}-{}", self.version, release),
            _ => self.version.clone(),
        }
    }
}

/// A package name can map to several installed versions (kernels, mostly)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PackageEntry {
    One(Package),
    Many(Vec<Package>),
}

impl PackageEntry {
    fn parse(value: &Value) -> Result<Vec<Package>> {
        Ok(match PackageEntry::deserialize(value)? {
            PackageEntry::One(package) => vec![package],
            PackageEntry::Many(packages) => packages,
        })
    }
}

/// A changed property kept for submission
#[derive(Debug, Clone)]
pub struct PackageChange {
    pub path: String,
    pub change_type: DiffChangeType,
    pub previous_value: Option<Value>,
    pub updated_value: Option<Value>,
}

/// Record for `AWS::SSM::ManagedInstanceInventory`
#[derive(Debug, Clone, Serialize)]
pub struct SoftwareInventoryRecord {
    #[serde(flatten)]
    pub base: BaseRecord,
    pub id_type: String,
    #[serde(skip)]
    pub packages: Vec<Package>,
    #[serde(skip)]
    pub package_changes: Vec<PackageChange>,
}

impl SoftwareInventoryRecord {
    pub fn from_item(
        mut base: BaseRecord,
        item: &ConfigurationItem,
        diff: Option<&ConfigurationItemDiff>,
    ) -> Result<Self> {
        base.asset_tag = Some(item.resource_id.clone());

        let discovered = item.is_discovered();
        if item.configuration.is_none() && !discovered && !base.is_deletion() {
            return Err(PipelineError::malformed(format!(
                "inventory {} has no configuration but is neither newly discovered nor deleted (status {:?}, change {})",
                item.resource_id,
                item.configuration_item_status,
                base.change_type.as_str()
            )));
        }

        let mut record = Self {
            base,
            id_type: item.resource_id.clone(),
            packages: Vec::new(),
            package_changes: Vec::new(),
        };

        if discovered {
            tracing::debug!(
                "New instance {} has no application inventory yet",
                item.resource_id
            );
            return Ok(record);
        }

        if let Some(application) = item
            .configuration
            .as_ref()
            .and_then(|c| c.get("AWS:Application"))
        {
            let content = application
                .get("Content")
                .and_then(|c| c.as_object())
                .ok_or_else(|| PipelineError::malformed("AWS:Application without Content"))?;
            for entry in content.values() {
                record.packages.extend(PackageEntry::parse(entry)?);
            }
        }

        if let Some(diff) = diff {
            for (path, raw) in &diff.changed_properties {
                let property = ChangedProperty::deserialize(raw)?;
                let change_type = DiffChangeType::from_name(&property.change_type).ok_or_else(|| {
                    PipelineError::UnknownChangeType {
                        property: path.clone(),
                        change_type: property.change_type.clone(),
                    }
                })?;

                // Updates also cover install times and package ids, which
                // are not package changes
                if change_type == DiffChangeType::Update
                    && !path.starts_with(APPLICATION_CONTENT_PREFIX)
                {
                    tracing::debug!("Skipping {} since it is not an application", path);
                    continue;
                }

                record.package_changes.push(PackageChange {
                    path: path.clone(),
                    change_type,
                    previous_value: property.previous_value,
                    updated_value: property.updated_value,
                });
            }
        }

        Ok(record)
    }

    /// One row per package to submit, each a copy of `payload` with
    /// `u_package` and `u_version` filled in
    pub fn package_rows(&self, payload: Map<String, Value>) -> Result<Vec<Map<String, Value>>> {
        let row = |name: String, package: &Package| {
            let mut row = payload.clone();
            row.insert("u_package".to_string(), Value::String(name));
            row.insert("u_version".to_string(), Value::String(package.full_version()));
            row
        };

        match self.base.change_type {
            ChangeKind::Snapshot | ChangeKind::Create => Ok(self
                .packages
                .iter()
                .map(|package| row(package.name.clone(), package))
                .collect()),
            ChangeKind::Update => {
                let mut rows = Vec::new();
                for change in &self.package_changes {
                    match change.change_type {
                        DiffChangeType::Create => {
                            for package in change_packages(change, change.updated_value.as_ref())? {
                                rows.push(row(package.name.clone(), &package));
                            }
                        }
                        DiffChangeType::Delete => {
                            for package in change_packages(change, change.previous_value.as_ref())? {
                                let name = format!("{}{}", REMOVED_PACKAGE_PREFIX, package.name);
                                rows.push(row(name, &package));
                            }
                        }
                        DiffChangeType::Update => {
                            return Err(PipelineError::Unimplemented(format!(
                                "{} change of {}",
                                change.change_type.as_str(),
                                change.path
                            )))
                        }
                    }
                }
                Ok(rows)
            }
            ChangeKind::Delete => Ok(Vec::new()),
        }
    }
}

fn change_packages(change: &PackageChange, value: Option<&Value>) -> Result<Vec<Package>> {
    let value = value.filter(|v| !v.is_null()).ok_or_else(|| {
        PipelineError::malformed(format!(
            "{} change of {} carries no package",
            change.change_type.as_str(),
            change.path
        ))
    })?;
    PackageEntry::parse(value)
}
