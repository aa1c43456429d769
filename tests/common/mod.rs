//! Shared fakes and fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use awsconfig_cmdb::aws::s3::BlobStore;
use awsconfig_cmdb::cmdb::RecordSink;
use awsconfig_cmdb::error::{PipelineError, Result};
use awsconfig_cmdb::notification::{BlobLocation, NotificationRouter, RoutingPolicy};
use awsconfig_cmdb::record::Submission;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory blob store holding gzip compressed JSON
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryBlobStore {
    pub fn insert_json(&self, bucket: &str, key: &str, value: &Value) {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(value.to_string().as_bytes()).unwrap();
        self.blobs
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), encoder.finish().unwrap());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn fetch(&self, location: &BlobLocation) -> anyhow::Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .lock()
            .unwrap()
            .get(&(location.bucket.clone(), location.key.clone()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("NoSuchKey: {}", location))
    }
}

/// Sink remembering every submission, optionally failing after a number of
/// successful ones
#[derive(Clone, Default)]
pub struct RecordingSink {
    submissions: Arc<Mutex<Vec<Submission>>>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn failing_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Default::default()
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for RecordingSink {
    async fn submit(&self, submission: &Submission) -> Result<()> {
        let mut submissions = self.submissions.lock().unwrap();
        if self.fail_after.is_some_and(|limit| submissions.len() >= limit) {
            return Err(PipelineError::Submission {
                url: format!("memory://{}", submission.table),
                reason: "unexpected status 500 Internal Server Error".to_string(),
            });
        }
        submissions.push(submission.clone());
        Ok(())
    }
}

pub type TestRouter = NotificationRouter<MemoryBlobStore, RecordingSink>;

pub fn router() -> (TestRouter, MemoryBlobStore, RecordingSink) {
    router_with(RoutingPolicy::default(), RecordingSink::default())
}

pub fn router_with(
    policy: RoutingPolicy,
    sink: RecordingSink,
) -> (TestRouter, MemoryBlobStore, RecordingSink) {
    let blobs = MemoryBlobStore::default();
    let router = NotificationRouter::new(blobs.clone(), sink.clone(), policy);
    (router, blobs, sink)
}

pub fn ec2_item(instance_id: &str) -> Value {
    json!({
        "resourceType": "AWS::EC2::Instance",
        "resourceId": instance_id,
        "ARN": format!("arn:aws:ec2:eu-west-1:123456789012:instance/{}", instance_id),
        "awsAccountId": "123456789012",
        "awsRegion": "eu-west-1",
        "availabilityZone": "eu-west-1a",
        "tags": {"Name": "web-1", "Environment": "prod", "Owner": "team-a"},
        "configuration": {
            "imageId": "ami-123",
            "instanceType": "t3.micro",
            "state": {"name": "running"},
            "placement": {"tenancy": "default"},
            "monitoring": {"state": "disabled"},
            "subnetId": "subnet-1",
            "vpcId": "vpc-1",
            "cpuOptions": {"coreCount": 2, "threadsPerCore": 2},
            "privateIpAddress": "10.0.0.1",
            "publicIpAddress": "52.0.0.1",
            "networkInterfaces": [
                {
                    "association": {"publicIp": "52.0.0.1"},
                    "privateIpAddresses": [
                        {"privateIpAddress": "10.0.0.1"},
                        {"privateIpAddress": "10.0.0.2"}
                    ]
                }
            ]
        },
        "configurationItemStatus": "OK",
        "configurationItemCaptureTime": "2023-01-15T10:30:00.123Z",
        "resourceCreationTime": "2022-12-01T08:00:00.000Z"
    })
}

pub fn bucket_item(name: &str) -> Value {
    json!({
        "resourceType": "AWS::S3::Bucket",
        "resourceId": name,
        "resourceName": name,
        "ARN": format!("arn:aws:s3:::{}", name),
        "awsAccountId": "123456789012",
        "awsRegion": "eu-west-1",
        "tags": [],
        "configuration": {"name": name},
        "supplementaryConfiguration": {
            "BucketVersioningConfiguration": {"status": "Enabled"}
        },
        "configurationItemStatus": "OK",
        "configurationItemCaptureTime": "2023-01-15T10:30:00.123Z"
    })
}

pub fn inventory_item(instance_id: &str) -> Value {
    json!({
        "resourceType": "AWS::SSM::ManagedInstanceInventory",
        "resourceId": instance_id,
        "awsAccountId": "123456789012",
        "awsRegion": "eu-west-1",
        "tags": {},
        "configuration": {
            "AWS:Application": {
                "Content": {
                    "bash": {"Name": "bash", "Version": "5.1", "Release": "2.amzn2"},
                    "curl": {"Name": "curl", "Version": "8.0"}
                }
            }
        },
        "configurationItemStatus": "OK",
        "configurationItemCaptureTime": "2023-01-15T10:30:00.123Z"
    })
}

pub fn role_item() -> Value {
    json!({
        "resourceType": "AWS::IAM::Role",
        "resourceId": "AROA123",
        "awsAccountId": "123456789012",
        "awsRegion": "global",
        "configurationItemCaptureTime": "2023-01-15T10:30:00.123Z"
    })
}

pub fn item_change(item: Value, diff: Option<Value>) -> Value {
    let mut message = json!({
        "messageType": "ConfigurationItemChangeNotification",
        "notificationCreationTime": "2023-01-15T10:31:00.000Z",
        "recordVersion": "1.3",
        "configurationItem": item
    });
    if let Some(diff) = diff {
        message["configurationItemDiff"] = diff;
    }
    message
}
