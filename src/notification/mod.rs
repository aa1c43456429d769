//! AWS Config notification handling
//!
//! Classifies inbound notifications, resolves the ones stored in S3 and
//! dispatches accepted item changes to the record mappers.
//!
//! # Module Structure
//!
//! - [`kinds`] - Message and resource kind tables
//! - [`model`] - Typed views over the notification JSON
//! - [`router`] - Dispatch of a notification to blob store and sink

pub mod kinds;
pub mod model;
pub mod router;

pub use kinds::{MessageKind, ResourceKind, ACCEPTED_RESOURCE_KINDS, DISCARDED_MESSAGE_KINDS};
pub use model::{
    BlobLocation, ChangedProperty, ConfigurationItem, ConfigurationItemDiff, DiffChangeType,
    ItemChange, Notification, OversizedItemChange, ParsedChange, SnapshotBundle, Tags,
};
pub use router::{NotificationRouter, RouteReport, RoutingPolicy};
