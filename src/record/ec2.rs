//! EC2 instance records

use super::BaseRecord;
use crate::error::Result;
use crate::notification::ConfigurationItem;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceConfiguration {
    image_id: String,
    instance_type: String,
    state: InstanceState,
    placement: Placement,
    monitoring: Monitoring,
    #[serde(default)]
    subnet_id: Option<String>,
    #[serde(default)]
    vpc_id: Option<String>,
    #[serde(default)]
    cpu_options: Option<CpuOptions>,
    #[serde(default)]
    state_reason: Option<StateReason>,
    #[serde(default)]
    state_transition_reason: Option<String>,
    #[serde(default)]
    spot_instance_request_id: Option<String>,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    public_ip_address: Option<String>,
    #[serde(default)]
    private_ip_address: Option<String>,
    #[serde(default)]
    network_interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, Deserialize)]
struct InstanceState {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Placement {
    #[serde(default)]
    tenancy: Option<String>,
    #[serde(default)]
    host_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Monitoring {
    state: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CpuOptions {
    core_count: u32,
    threads_per_core: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct StateReason {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkInterface {
    #[serde(default)]
    association: Option<Association>,
    #[serde(default)]
    private_ip_addresses: Vec<PrivateIpAddress>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Association {
    #[serde(default)]
    public_ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrivateIpAddress {
    private_ip_address: String,
}

/// Fields only known while the instance exists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstanceDetails {
    pub model_id: Option<String>,
    #[serde(rename = "u_ami")]
    pub ami: Option<String>,
    #[serde(rename = "u_platform")]
    pub platform: Option<String>,
    #[serde(rename = "u_monitoring_state")]
    pub monitoring_state: Option<String>,
    #[serde(rename = "u_private_ip_address")]
    pub private_ip_address: Option<String>,
    #[serde(rename = "u_public_ip_address")]
    pub public_ip_address: Option<String>,
    #[serde(rename = "u_tenancy")]
    pub tenancy: Option<String>,
    #[serde(rename = "u_host_id")]
    pub host_id: Option<String>,
    #[serde(rename = "u_pricing_type")]
    pub pricing_type: Option<String>,
    #[serde(rename = "u_cpu_threads_total_count")]
    pub cpu_threads_total_count: Option<u32>,
    #[serde(rename = "u_cpu_threads_per_core")]
    pub cpu_threads_per_core: Option<u32>,
    #[serde(rename = "u_cpu_core_count")]
    pub cpu_core_count: Option<u32>,
    #[serde(rename = "u_vpc_id")]
    pub vpc_id: Option<String>,
    #[serde(rename = "u_termination_stopped_reason")]
    pub termination_stopped_reason: Option<String>,
    #[serde(rename = "u_subnet_id")]
    pub subnet_id: Option<String>,
}

/// Record for `AWS::EC2::Instance`
#[derive(Debug, Clone, Serialize)]
pub struct Ec2InstanceRecord {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(rename = "u_instance_id")]
    pub instance_id: String,
    #[serde(flatten)]
    pub details: InstanceDetails,
}

impl Ec2InstanceRecord {
    pub fn from_item(mut base: BaseRecord, item: &ConfigurationItem) -> Result<Self> {
        base.asset_tag = Some(item.resource_id.clone());

        let details = match &item.configuration {
            Some(configuration) => {
                let conf = InstanceConfiguration::deserialize(configuration)?;
                base.availability_zone = item.availability_zone.clone();
                base.state = Some(conf.state.name.clone());
                InstanceDetails::from_configuration(conf)
            }
            None => InstanceDetails::default(),
        };

        Ok(Self {
            base,
            instance_id: item.resource_id.clone(),
            details,
        })
    }
}

impl InstanceDetails {
    fn from_configuration(conf: InstanceConfiguration) -> Self {
        let pricing_type = if conf.spot_instance_request_id.is_some() {
            "Spot Instance"
        } else {
            "On-Demand"
        };

        let state_reason = conf
            .state_reason
            .as_ref()
            .map(StateReason::describe)
            .unwrap_or_else(|| "None".to_string());
        let termination_stopped_reason = format!(
            "StateReason: {}; StateTransitionReason: {}",
            state_reason,
            conf.state_transition_reason.as_deref().unwrap_or("None")
        );

        let (public_ips, private_ips) = collect_ip_addresses(&conf);

        Self {
            model_id: Some(conf.instance_type),
            ami: Some(conf.image_id),
            platform: conf.platform,
            monitoring_state: Some(conf.monitoring.state),
            private_ip_address: Some(private_ips),
            public_ip_address: Some(public_ips),
            tenancy: conf.placement.tenancy,
            host_id: conf.placement.host_id,
            pricing_type: Some(pricing_type.to_string()),
            cpu_threads_total_count: conf
                .cpu_options
                .as_ref()
                .and_then(|cpu| cpu.core_count.checked_mul(cpu.threads_per_core)),
            cpu_threads_per_core: conf.cpu_options.as_ref().map(|cpu| cpu.threads_per_core),
            cpu_core_count: conf.cpu_options.as_ref().map(|cpu| cpu.core_count),
            vpc_id: conf.vpc_id,
            termination_stopped_reason: Some(termination_stopped_reason),
            subnet_id: conf.subnet_id,
        }
    }
}

impl StateReason {
    fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (_, Some(message)) => message.clone(),
            (Some(code), None) => code.to_string(),
            (None, None) => "None".to_string(),
        }
    }
}

/// Public and private addresses across the instance and all of its network
/// interfaces, comma-joined with duplicates removed
fn collect_ip_addresses(conf: &InstanceConfiguration) -> (String, String) {
    let mut public_ips: BTreeSet<&str> = BTreeSet::new();
    let mut private_ips: BTreeSet<&str> = BTreeSet::new();

    if let Some(ip) = conf.public_ip_address.as_deref() {
        public_ips.insert(ip);
    }
    if let Some(ip) = conf.private_ip_address.as_deref() {
        private_ips.insert(ip);
    }

    for interface in &conf.network_interfaces {
        if let Some(ip) = interface
            .association
            .as_ref()
            .and_then(|a| a.public_ip.as_deref())
        {
            public_ips.insert(ip);
        }
        for address in &interface.private_ip_addresses {
            private_ips.insert(&address.private_ip_address);
        }
    }

    (
        public_ips.into_iter().collect::<Vec<_>>().join(","),
        private_ips.into_iter().collect::<Vec<_>>().join(","),
    )
}
