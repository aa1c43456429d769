//! Load balancer records
//!
//! Classic and v2 load balancers share one CMDB table but their AWS Config
//! configurations differ structurally, so each has its own shape here.

use super::BaseRecord;
use crate::error::Result;
use crate::notification::{ConfigurationItem, ResourceKind};
use serde::{Deserialize, Serialize};

const CROSS_ZONE_ATTRIBUTE: &str = "load_balancing.cross_zone.enabled";
const DELETION_PROTECTION_ATTRIBUTE: &str = "deletion_protection.enabled";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassicConfiguration {
    #[serde(default)]
    scheme: Option<String>,
    /// Lower case in the classic API
    #[serde(default, rename = "vpcid")]
    vpc_id: Option<String>,
    #[serde(default)]
    availability_zones: Vec<String>,
    #[serde(default)]
    subnets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2Configuration {
    #[serde(default)]
    scheme: Option<String>,
    state: V2State,
    #[serde(default)]
    vpc_id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    availability_zones: Vec<V2AvailabilityZone>,
}

#[derive(Debug, Clone, Deserialize)]
struct V2State {
    code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2AvailabilityZone {
    zone_name: String,
    #[serde(default)]
    subnet_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoadBalancerAttribute {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

/// Fields only known while the load balancer exists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadBalancerDetails {
    /// `internet-facing` or `internal`
    #[serde(rename = "u_elb_scheme")]
    pub scheme: Option<String>,
    /// `classic`, `application`, `network` or `gateway`
    #[serde(rename = "u_elb_type")]
    pub elb_type: Option<String>,
    #[serde(rename = "u_subnet_ids")]
    pub subnet_ids: Option<String>,
    #[serde(rename = "u_vpc_id")]
    pub vpc_id: Option<String>,
    #[serde(rename = "u_cross_zone_enabled")]
    pub cross_zone_enabled: Option<String>,
    #[serde(rename = "u_deletion_protection")]
    pub deletion_protection: Option<String>,
}

/// Record for `AWS::ElasticLoadBalancing::LoadBalancer` and
/// `AWS::ElasticLoadBalancingV2::LoadBalancer`
#[derive(Debug, Clone, Serialize)]
pub struct LoadBalancerRecord {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(rename = "u_arn")]
    pub arn: String,
    #[serde(flatten)]
    pub details: LoadBalancerDetails,
}

impl LoadBalancerRecord {
    pub fn from_item(mut base: BaseRecord, item: &ConfigurationItem) -> Result<Self> {
        let arn = item.require_arn()?.to_string();
        base.asset_tag = Some(arn.clone());
        if item.resource_name.is_some() {
            base.tags.name = item.resource_name.clone();
        }

        let details = match (&item.configuration, item.resource_kind()) {
            (None, _) => LoadBalancerDetails::default(),
            (Some(configuration), ResourceKind::ClassicLoadBalancer) => {
                let conf = ClassicConfiguration::deserialize(configuration)?;
                base.availability_zone = Some(conf.availability_zones.join(","));
                LoadBalancerDetails {
                    scheme: conf.scheme,
                    elb_type: Some("classic".to_string()),
                    subnet_ids: Some(conf.subnets.join(",")),
                    vpc_id: conf.vpc_id,
                    ..Default::default()
                }
            }
            (Some(configuration), _) => {
                let conf = V2Configuration::deserialize(configuration)?;
                let zones: Vec<&str> = conf
                    .availability_zones
                    .iter()
                    .map(|az| az.zone_name.as_str())
                    .collect();
                let subnets: Vec<&str> = conf
                    .availability_zones
                    .iter()
                    .filter_map(|az| az.subnet_id.as_deref())
                    .collect();
                base.availability_zone = Some(zones.join(","));
                base.state = Some(conf.state.code.clone());

                let mut details = LoadBalancerDetails {
                    scheme: conf.scheme.clone(),
                    elb_type: Some(conf.kind.clone()),
                    subnet_ids: Some(subnets.join(",")),
                    vpc_id: conf.vpc_id.clone(),
                    ..Default::default()
                };

                if let Some(attributes) = item.supplementary("LoadBalancerAttributes") {
                    for attribute in Vec::<LoadBalancerAttribute>::deserialize(attributes)? {
                        match attribute.key.as_str() {
                            CROSS_ZONE_ATTRIBUTE => details.cross_zone_enabled = attribute.value,
                            DELETION_PROTECTION_ATTRIBUTE => {
                                details.deletion_protection = attribute.value
                            }
                            _ => {}
                        }
                    }
                }
                details
            }
        };

        Ok(Self { base, arn, details })
    }
}
