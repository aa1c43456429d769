//! Message and resource kinds
//!
//! Constant tables deciding which notifications are processed at all.

use serde::{Deserialize, Serialize};
use std::fmt;

/// AWS Config message types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    ItemChange,
    OversizedItemChange,
    SnapshotDeliveryCompleted,
    ComplianceChange,
    RulesEvaluationStarted,
    HistoryDeliveryCompleted,
    SnapshotDeliveryStarted,
    Other(String),
}

/// Message kinds that never produce a record. History deliveries are a
/// bundle of item changes which arrive individually anyway.
pub const DISCARDED_MESSAGE_KINDS: &[MessageKind] = &[
    MessageKind::ComplianceChange,
    MessageKind::RulesEvaluationStarted,
    MessageKind::HistoryDeliveryCompleted,
    MessageKind::SnapshotDeliveryStarted,
];

impl MessageKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "ConfigurationItemChangeNotification" => Self::ItemChange,
            "OversizedConfigurationItemChangeNotification" => Self::OversizedItemChange,
            "ConfigurationSnapshotDeliveryCompleted" => Self::SnapshotDeliveryCompleted,
            "ComplianceChangeNotification" => Self::ComplianceChange,
            "ConfigRulesEvaluationStarted" => Self::RulesEvaluationStarted,
            "ConfigurationHistoryDeliveryCompleted" => Self::HistoryDeliveryCompleted,
            "ConfigurationSnapshotDeliveryStarted" => Self::SnapshotDeliveryStarted,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::ItemChange => "ConfigurationItemChangeNotification",
            Self::OversizedItemChange => "OversizedConfigurationItemChangeNotification",
            Self::SnapshotDeliveryCompleted => "ConfigurationSnapshotDeliveryCompleted",
            Self::ComplianceChange => "ComplianceChangeNotification",
            Self::RulesEvaluationStarted => "ConfigRulesEvaluationStarted",
            Self::HistoryDeliveryCompleted => "ConfigurationHistoryDeliveryCompleted",
            Self::SnapshotDeliveryStarted => "ConfigurationSnapshotDeliveryStarted",
            Self::Other(name) => name,
        }
    }

    pub fn is_discarded(&self) -> bool {
        DISCARDED_MESSAGE_KINDS.contains(self)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// AWS Config resource types known to the mappers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Ec2Instance,
    ClassicLoadBalancer,
    LoadBalancerV2,
    S3Bucket,
    SsmInventory,
    RdsDbInstance,
    Other(String),
}

/// Resource kinds that are always mapped and submitted
pub const ACCEPTED_RESOURCE_KINDS: &[ResourceKind] = &[
    ResourceKind::Ec2Instance,
    ResourceKind::LoadBalancerV2,
    ResourceKind::ClassicLoadBalancer,
    ResourceKind::S3Bucket,
    ResourceKind::SsmInventory,
];

impl ResourceKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "AWS::EC2::Instance" => Self::Ec2Instance,
            "AWS::ElasticLoadBalancing::LoadBalancer" => Self::ClassicLoadBalancer,
            "AWS::ElasticLoadBalancingV2::LoadBalancer" => Self::LoadBalancerV2,
            "AWS::S3::Bucket" => Self::S3Bucket,
            "AWS::SSM::ManagedInstanceInventory" => Self::SsmInventory,
            "AWS::RDS::DBInstance" => Self::RdsDbInstance,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Ec2Instance => "AWS::EC2::Instance",
            Self::ClassicLoadBalancer => "AWS::ElasticLoadBalancing::LoadBalancer",
            Self::LoadBalancerV2 => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::S3Bucket => "AWS::S3::Bucket",
            Self::SsmInventory => "AWS::SSM::ManagedInstanceInventory",
            Self::RdsDbInstance => "AWS::RDS::DBInstance",
            Self::Other(name) => name,
        }
    }

    /// ServiceNow import set table receiving records of this kind
    pub fn default_table(&self) -> Option<&'static str> {
        match self {
            Self::Ec2Instance => Some("u_imp_cmdb_ci_ec2_instance"),
            Self::ClassicLoadBalancer | Self::LoadBalancerV2 => {
                Some("u_imp_cmdb_ci_aws_elastic_load_balancer")
            }
            Self::S3Bucket => Some("u_imp_cmdb_ci_aws_s3_bucket"),
            Self::SsmInventory => Some("u_imp_aws_ec2_software_instance"),
            Self::RdsDbInstance => Some("u_imp_aws_rds_instance"),
            Self::Other(_) => None,
        }
    }
}

impl From<String> for ResourceKind {
    fn from(name: String) -> Self {
        Self::from_type_name(&name)
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.type_name().to_string()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
