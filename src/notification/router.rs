//! Notification routing
//!
//! The router classifies a notification, resolves notifications stored in S3
//! (oversized item changes and snapshots) and feeds every accepted
//! configuration item through its mapper into the sink.

use super::kinds::{ResourceKind, ACCEPTED_RESOURCE_KINDS};
use super::model::{BlobLocation, ItemChange, Notification, OversizedItemChange, SnapshotBundle};
use crate::aws::s3::{fetch_json, BlobStore};
use crate::cmdb::RecordSink;
use crate::error::{PipelineError, Result};
use crate::record::ResourceRecord;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::ops::AddAssign;

/// Which resource kinds are processed, and how
#[derive(Debug, Clone, Default)]
pub struct RoutingPolicy {
    /// Route RDS database instances as well
    pub accept_db_instances: bool,
    /// Kinds that are mapped but never submitted
    pub construct_only: HashSet<ResourceKind>,
    /// Import set table overrides
    pub tables: HashMap<ResourceKind, String>,
}

impl RoutingPolicy {
    pub fn accepts(&self, kind: &ResourceKind) -> bool {
        ACCEPTED_RESOURCE_KINDS.contains(kind)
            || (self.accept_db_instances && *kind == ResourceKind::RdsDbInstance)
    }

    pub fn submits(&self, kind: &ResourceKind) -> bool {
        !self.construct_only.contains(kind)
    }

    pub fn table_for(&self, kind: &ResourceKind) -> Option<&str> {
        self.tables
            .get(kind)
            .map(String::as_str)
            .or_else(|| kind.default_table())
    }
}

/// Outcome of routing one notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteReport {
    /// Rows posted to the sink
    pub submitted: usize,
    /// Records built without submitting
    pub constructed: usize,
    /// Notifications or items left alone
    pub skipped: usize,
}

impl RouteReport {
    fn skipped() -> Self {
        Self {
            skipped: 1,
            ..Default::default()
        }
    }
}

impl AddAssign for RouteReport {
    fn add_assign(&mut self, other: Self) {
        self.submitted += other.submitted;
        self.constructed += other.constructed;
        self.skipped += other.skipped;
    }
}

/// Dispatches notifications to mappers and sink
pub struct NotificationRouter<B, S> {
    blobs: B,
    sink: S,
    policy: RoutingPolicy,
}

impl<B: BlobStore, S: RecordSink> NotificationRouter<B, S> {
    pub fn new(blobs: B, sink: S, policy: RoutingPolicy) -> Self {
        Self {
            blobs,
            sink,
            policy,
        }
    }

    /// Route one notification. Oversized notifications resolve to another
    /// notification, hence the boxed future.
    pub fn route(&self, message: Value) -> BoxFuture<'_, Result<RouteReport>> {
        Box::pin(async move {
            match Notification::from_message(message)? {
                Notification::Discarded(kind) => {
                    tracing::debug!("Skipping message type {}", kind);
                    Ok(RouteReport::skipped())
                }
                Notification::Unrecognized(kind) => {
                    tracing::warn!("Unrecognized message type {}, skipping", kind);
                    Ok(RouteReport::skipped())
                }
                Notification::ItemChange(change) => self.route_item_change(change).await,
                Notification::OversizedItemChange(oversized) => {
                    self.route_oversized(oversized).await
                }
                Notification::SnapshotDeliveryCompleted(location) => {
                    self.route_snapshot(&location).await
                }
            }
        })
    }

    async fn route_item_change(&self, change: ItemChange) -> Result<RouteReport> {
        let kind = &change.resource_kind;
        if !self.policy.accepts(kind) {
            tracing::debug!("Skipping resource type {}", kind);
            return Ok(RouteReport::skipped());
        }

        let parsed = change.parse()?;
        let Some(record) = ResourceRecord::build(&parsed.item, parsed.diff.as_ref())? else {
            tracing::debug!("No mapper for resource type {}", kind);
            return Ok(RouteReport::skipped());
        };

        tracing::info!(
            "Processing {} {} ({})",
            kind,
            parsed.item.resource_id,
            record.base().change_type.as_str()
        );

        let table = self
            .policy
            .table_for(kind)
            .ok_or_else(|| PipelineError::malformed(format!("no import table for {}", kind)))?;
        let submissions = record.submissions(table)?;

        if !self.policy.submits(kind) {
            tracing::debug!(
                "Constructed {} {} without submitting ({} rows)",
                kind,
                parsed.item.resource_id,
                submissions.len()
            );
            return Ok(RouteReport {
                constructed: 1,
                ..Default::default()
            });
        }

        for submission in &submissions {
            self.sink.submit(submission).await?;
        }

        Ok(RouteReport {
            submitted: submissions.len(),
            ..Default::default()
        })
    }

    async fn route_oversized(&self, oversized: OversizedItemChange) -> Result<RouteReport> {
        if let Some(kind) = oversized.summary_resource_kind() {
            if !self.policy.accepts(&kind) {
                tracing::debug!("Skipping oversized resource type {}", kind);
                return Ok(RouteReport::skipped());
            }
        }

        let location = oversized.location()?;
        tracing::info!("Fetching oversized item change from {}", location);

        let message = fetch_json(&self.blobs, &location).await?;
        self.route(message).await
    }

    async fn route_snapshot(&self, location: &BlobLocation) -> Result<RouteReport> {
        tracing::info!("Fetching configuration snapshot from {}", location);

        let bundle = SnapshotBundle::deserialize(fetch_json(&self.blobs, location).await?)?;
        tracing::info!(
            "Snapshot {} holds {} configuration items",
            location,
            bundle.configuration_items.len()
        );

        let mut report = RouteReport::default();
        for item in bundle.configuration_items {
            report += self
                .route_item_change(ItemChange::from_snapshot_item(item)?)
                .await?;
        }
        Ok(report)
    }
}
