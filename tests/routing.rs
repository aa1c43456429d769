//! Integration tests for notification routing
//!
//! These tests drive the router end to end with an in-memory blob store and
//! a recording sink, covering every message kind AWS Config delivers.

mod common;

use awsconfig_cmdb::error::{ErrorKind, PipelineError};
use awsconfig_cmdb::notification::{ResourceKind, RouteReport, RoutingPolicy};
use common::*;
use serde_json::{json, Value};
use std::collections::HashSet;

fn skipped() -> RouteReport {
    RouteReport {
        skipped: 1,
        ..Default::default()
    }
}

mod classification {
    use super::*;

    #[tokio::test]
    async fn test_discarded_message_kinds_are_skipped() {
        let (router, blobs, sink) = router();

        for message_type in [
            "ComplianceChangeNotification",
            "ConfigRulesEvaluationStarted",
            "ConfigurationHistoryDeliveryCompleted",
            "ConfigurationSnapshotDeliveryStarted",
        ] {
            let report = router
                .route(json!({"messageType": message_type}))
                .await
                .unwrap();
            assert_eq!(report, skipped(), "{message_type}");
        }

        assert!(sink.submissions().is_empty());
        assert_eq!(blobs.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_unrecognized_message_kind_is_not_an_error() {
        let (router, _, sink) = router();
        let report = router
            .route(json!({"messageType": "OversizedConfigurationItemChangeDeliveryFailed"}))
            .await
            .unwrap();
        assert_eq!(report, skipped());
        assert!(sink.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_missing_message_type_is_malformed() {
        let (router, _, _) = router();
        let err = router
            .route(json!({"configurationItem": ec2_item("i-1")}))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn test_unaccepted_resource_kind_is_skipped() {
        let (router, _, sink) = router();
        let report = router.route(item_change(role_item(), None)).await.unwrap();
        assert_eq!(report, skipped());
        assert!(sink.submissions().is_empty());
    }
}

mod item_changes {
    use super::*;

    #[tokio::test]
    async fn test_ec2_create_is_submitted() {
        let (router, _, sink) = router();
        let diff = json!({"changeType": "CREATE", "changedProperties": {}});

        let report = router
            .route(item_change(ec2_item("i-0abc"), Some(diff)))
            .await
            .unwrap();
        assert_eq!(report.submitted, 1);

        let submissions = sink.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].table, "u_imp_cmdb_ci_ec2_instance");

        let payload = &submissions[0].payload;
        assert_eq!(payload["asset_tag"], "i-0abc");
        assert_eq!(payload["u_instance_id"], "i-0abc");
        assert_eq!(payload["name"], "web-1");
        assert_eq!(payload["u_used_for"], "prod");
        assert_eq!(payload["u_additional_tags"], "OWNER=team-a");
        assert_eq!(payload["state"], "running");
        assert_eq!(payload["change_type"], "CREATE");
        assert_eq!(payload["u_last_change_create"], "2023-01-15 10:30:00");
        assert!(payload["u_last_change_snapshot"].is_null());
        assert_eq!(payload["install_date"], "2022-12-01 08:00:00");
        assert_eq!(payload["u_private_ip_address"], "10.0.0.1,10.0.0.2");
        assert_eq!(payload["u_public_ip_address"], "52.0.0.1");
        assert_eq!(payload["u_cpu_threads_total_count"], 4);
        assert_eq!(payload["u_pricing_type"], "On-Demand");
    }

    #[tokio::test]
    async fn test_deletion_is_terminated() {
        let (router, _, sink) = router();
        let mut item = ec2_item("i-0abc");
        item["configuration"] = Value::Null;
        item["configurationItemStatus"] = json!("ResourceDeleted");
        let diff = json!({"changeType": "DELETE", "changedProperties": {}});

        router.route(item_change(item, Some(diff))).await.unwrap();

        let payload = &sink.submissions()[0].payload;
        assert_eq!(payload["state"], "terminated");
        assert_eq!(payload["change_type"], "DELETE");
        assert_eq!(payload["u_last_change_delete"], "2023-01-15 10:30:00");
        assert!(payload["u_ami"].is_null());
    }

    /// Test an item without configuration is terminated even without a diff
    #[tokio::test]
    async fn test_null_configuration_without_diff_is_terminated() {
        let (router, _, sink) = router();
        let mut item = ec2_item("i-0abc");
        item["configuration"] = Value::Null;
        item["configurationItemStatus"] = json!("ResourceDeleted");

        router.route(item_change(item, None)).await.unwrap();

        let payload = &sink.submissions()[0].payload;
        assert_eq!(payload["state"], "terminated");
        assert_eq!(payload["change_type"], "snapshot");
        assert!(payload["u_ami"].is_null());
    }

    #[tokio::test]
    async fn test_db_instances_need_opt_in() {
        let item = json!({
            "resourceType": "AWS::RDS::DBInstance",
            "resourceId": "db-ABC",
            "resourceName": "orders",
            "ARN": "arn:aws:rds:eu-west-1:123456789012:db:orders",
            "awsAccountId": "123456789012",
            "awsRegion": "eu-west-1",
            "tags": [],
            "configuration": {
                "dBInstanceIdentifier": "orders",
                "dBInstanceClass": "db.t3.small",
                "engine": "mysql",
                "engineVersion": "8.0",
                "dBInstanceStatus": "available",
                "autoMinorVersionUpgrade": false
            },
            "configurationItemCaptureTime": "2023-01-15T10:30:00.123Z"
        });

        let (router, _, sink) = router();
        let report = router.route(item_change(item.clone(), None)).await.unwrap();
        assert_eq!(report, skipped());
        assert!(sink.submissions().is_empty());

        let policy = RoutingPolicy {
            accept_db_instances: true,
            ..Default::default()
        };
        let (router, _, sink) = router_with(policy, RecordingSink::default());
        router.route(item_change(item, None)).await.unwrap();

        let submissions = sink.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].table, "u_imp_aws_rds_instance");
        assert_eq!(submissions[0].payload["u_engine"], "mysql");
    }

    #[tokio::test]
    async fn test_construct_only_kinds_are_not_submitted() {
        let policy = RoutingPolicy {
            construct_only: HashSet::from([ResourceKind::SsmInventory]),
            ..Default::default()
        };
        let (router, _, sink) = router_with(policy, RecordingSink::default());

        let report = router
            .route(item_change(inventory_item("i-0abc"), None))
            .await
            .unwrap();
        assert_eq!(report.constructed, 1);
        assert_eq!(report.submitted, 0);
        assert!(sink.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_construct_only_still_validates() {
        let policy = RoutingPolicy {
            construct_only: HashSet::from([ResourceKind::Ec2Instance]),
            ..Default::default()
        };
        let (router, _, _) = router_with(policy, RecordingSink::default());

        let mut item = ec2_item("i-0abc");
        item["configurationItemCaptureTime"] = json!("yesterday");
        let err = router.route(item_change(item, None)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[tokio::test]
    async fn test_sink_failure_is_fatal() {
        let (router, _, _) = router_with(RoutingPolicy::default(), RecordingSink::failing_after(0));
        let err = router
            .route(item_change(bucket_item("logs"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Submission { .. }));
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }
}

mod software_inventory {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_submits_one_row_per_package() {
        let (router, _, sink) = router();
        let report = router
            .route(item_change(inventory_item("i-0abc"), None))
            .await
            .unwrap();
        assert_eq!(report.submitted, 2);

        let rows: Vec<(Value, Value)> = sink
            .submissions()
            .into_iter()
            .map(|s| {
                assert_eq!(s.table, "u_imp_aws_ec2_software_instance");
                assert_eq!(s.payload["id_type"], "i-0abc");
                (s.payload["u_package"].clone(), s.payload["u_version"].clone())
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                (json!("bash"), json!("5.1-2.amzn2")),
                (json!("curl"), json!("8.0")),
            ]
        );
    }

    #[tokio::test]
    async fn test_removed_package_is_submitted_with_prefix() {
        let (router, _, sink) = router();
        let diff = json!({
            "changeType": "UPDATE",
            "changedProperties": {
                "Configuration.AWS:Application.Content.vim": {
                    "changeType": "DELETE",
                    "previousValue": {"Name": "vim", "Version": "9.0", "Release": "1"}
                },
                "Configuration.AWS:InstanceInformation.Content.i-0abc.IpAddress": {
                    "changeType": "UPDATE",
                    "previousValue": "10.0.0.1",
                    "updatedValue": "10.0.0.2"
                }
            }
        });

        let report = router
            .route(item_change(inventory_item("i-0abc"), Some(diff)))
            .await
            .unwrap();
        assert_eq!(report.submitted, 1);

        let submissions = sink.submissions();
        assert_eq!(submissions[0].payload["u_package"], "-vim");
        assert_eq!(submissions[0].payload["u_version"], "9.0-1");
        assert_eq!(submissions[0].payload["change_type"], "UPDATE");
    }

    #[tokio::test]
    async fn test_unknown_property_change_is_fatal() {
        let (router, _, sink) = router();
        let diff = json!({
            "changeType": "UPDATE",
            "changedProperties": {
                "Configuration.AWS:Application.Content.vim": {"changeType": "RENAME"}
            }
        });
        let err = router
            .route(item_change(inventory_item("i-0abc"), Some(diff)))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownChangeType { .. }));
        assert!(sink.submissions().is_empty());
    }
}

mod stored_notifications {
    use super::*;

    const BUCKET: &str = "config-bucket";

    fn oversized(resource_type: &str, location: Option<&str>, error: Option<&str>) -> Value {
        json!({
            "messageType": "OversizedConfigurationItemChangeNotification",
            "configurationItemSummary": {
                "resourceType": resource_type,
                "resourceId": "i-0abc"
            },
            "s3DeliverySummary": {
                "s3BucketLocation": location,
                "errorCode": error,
                "errorMessage": error.map(|e| format!("{e} while writing"))
            }
        })
    }

    #[tokio::test]
    async fn test_oversized_unaccepted_kind_is_skipped_before_fetch() {
        let (router, blobs, _) = router();
        let report = router
            .route(oversized(
                "AWS::IAM::Policy",
                Some("config-bucket/AWSLogs/oversized.json.gz"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(report, skipped());
        assert_eq!(blobs.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_change_is_resolved_from_storage() {
        let (router, blobs, sink) = router();
        let key = "AWSLogs/123456789012/Config/eu-west-1/oversized.json.gz";
        blobs.insert_json(BUCKET, key, &item_change(ec2_item("i-0abc"), None));

        let report = router
            .route(oversized(
                "AWS::EC2::Instance",
                Some(&format!("{BUCKET}/{key}")),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(report.submitted, 1);
        assert_eq!(blobs.fetch_count(), 1);
        assert_eq!(sink.submissions()[0].payload["u_instance_id"], "i-0abc");
    }

    #[tokio::test]
    async fn test_oversized_delivery_error_is_fatal() {
        let (router, blobs, _) = router();
        let err = router
            .route(oversized("AWS::EC2::Instance", None, Some("AccessDenied")))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::StorageDelivery { .. }));
        assert!(err.to_string().contains("AccessDenied"));
        assert_eq!(blobs.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_without_delivery_summary() {
        let (router, blobs, _) = router();
        let mut notice = oversized("AWS::IAM::Policy", None, None);
        notice.as_object_mut().unwrap().remove("s3DeliverySummary");
        assert_eq!(router.route(notice.clone()).await.unwrap(), skipped());

        notice["configurationItemSummary"]["resourceType"] = json!("AWS::EC2::Instance");
        let err = router.route(notice).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert_eq!(blobs.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_blob_is_a_storage_error() {
        let (router, _, _) = router();
        let err = router
            .route(oversized(
                "AWS::EC2::Instance",
                Some("config-bucket/missing.json.gz"),
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Storage { .. }));
    }

    fn snapshot_notification(key: &str) -> Value {
        json!({
            "messageType": "ConfigurationSnapshotDeliveryCompleted",
            "s3ObjectKey": key,
            "s3Bucket": BUCKET,
            "configSnapshotId": "snap-1",
            "notificationCreationTime": "2023-01-15T10:31:00.000Z"
        })
    }

    #[tokio::test]
    async fn test_snapshot_is_expanded_in_order() {
        let (router, blobs, sink) = router();
        let key = "AWSLogs/123456789012/Config/snapshot.json.gz";
        blobs.insert_json(
            BUCKET,
            key,
            &json!({
                "fileVersion": "1.0",
                "configSnapshotId": "snap-1",
                "configurationItems": [ec2_item("i-0abc"), role_item(), bucket_item("logs")]
            }),
        );

        let report = router.route(snapshot_notification(key)).await.unwrap();
        assert_eq!(
            report,
            RouteReport {
                submitted: 2,
                constructed: 0,
                skipped: 1
            }
        );

        let submissions = sink.submissions();
        assert_eq!(submissions[0].table, "u_imp_cmdb_ci_ec2_instance");
        assert_eq!(submissions[1].table, "u_imp_cmdb_ci_aws_s3_bucket");
        for submission in &submissions {
            assert_eq!(submission.payload["change_type"], "snapshot");
            assert_eq!(
                submission.payload["u_last_change_snapshot"],
                "2023-01-15 10:30:00"
            );
        }
    }

    #[tokio::test]
    async fn test_snapshot_error_keeps_earlier_submissions() {
        let (router, blobs, sink) = router();
        let key = "snapshot.json.gz";
        let mut broken = bucket_item("broken");
        broken.as_object_mut().unwrap().remove("awsRegion");
        blobs.insert_json(
            BUCKET,
            key,
            &json!({"configurationItems": [bucket_item("first"), broken, bucket_item("never")]}),
        );

        let err = router.route(snapshot_notification(key)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let submissions = sink.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].payload["u_bucket_name"], "first");
    }

    #[tokio::test]
    async fn test_snapshot_key_must_be_gzip_json() {
        let (router, blobs, _) = router();
        let err = router
            .route(snapshot_notification("snapshot.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
        assert_eq!(blobs.fetch_count(), 0);
    }
}
