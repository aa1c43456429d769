//! Notification intake
//!
//! Notifications reach us wrapped in different envelopes depending on the
//! path they took: raw on an SQS queue with raw delivery, inside an SNS
//! envelope (`{"Type": "Notification", "Message": "<json>"}`), or as records
//! of a Lambda SQS or SNS event.

use crate::error::Result;
use serde_json::Value;

/// Parse a message body, unwrapping an SNS envelope if there is one
pub fn unwrap_envelope(body: &str) -> Result<Value> {
    open_envelope(serde_json::from_str(body)?)
}

fn open_envelope(value: Value) -> Result<Value> {
    match value.get("Message").and_then(Value::as_str) {
        Some(message) => Ok(serde_json::from_str(message)?),
        None => Ok(value),
    }
}

/// Pull every notification out of an event file. Records that do not parse
/// are logged and skipped so one bad record does not block the rest.
pub fn extract_notifications(event: Value) -> Vec<Value> {
    let Some(records) = event.get("Records").and_then(Value::as_array) else {
        return match open_envelope(event) {
            Ok(notification) => vec![notification],
            Err(e) => {
                tracing::error!("Event is not a valid notification: {}", e);
                Vec::new()
            }
        };
    };

    let mut notifications = Vec::with_capacity(records.len());
    for record in records {
        let body = record
            .get("body")
            .and_then(Value::as_str)
            .or_else(|| record.pointer("/Sns/Message").and_then(Value::as_str));

        let Some(body) = body else {
            tracing::error!("Event record has neither an SQS body nor an SNS message: {}", record);
            continue;
        };

        match unwrap_envelope(body) {
            Ok(notification) => notifications.push(notification),
            Err(e) => {
                tracing::error!("Event record is not a valid notification: {}, message: {}", e, body)
            }
        }
    }

    notifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification() -> Value {
        json!({"messageType": "ComplianceChangeNotification"})
    }

    #[test]
    fn test_raw_body() {
        let value = unwrap_envelope(&notification().to_string()).unwrap();
        assert_eq!(value, notification());
    }

    #[test]
    fn test_sns_envelope() {
        let envelope = json!({
            "Type": "Notification",
            "TopicArn": "arn:aws:sns:eu-west-1:123456789012:config-topic",
            "Message": notification().to_string()
        });
        assert_eq!(unwrap_envelope(&envelope.to_string()).unwrap(), notification());
    }

    #[test]
    fn test_invalid_json() {
        assert!(unwrap_envelope("{not json").is_err());
        assert!(unwrap_envelope(&json!({"Message": "{broken"}).to_string()).is_err());
    }

    #[test]
    fn test_lambda_sqs_event_skips_bad_records() {
        let envelope = json!({"Type": "Notification", "Message": notification().to_string()});
        let event = json!({
            "Records": [
                {"messageId": "1", "body": envelope.to_string()},
                {"messageId": "2", "body": "garbage"},
                {"messageId": "3", "body": notification().to_string()}
            ]
        });
        assert_eq!(
            extract_notifications(event),
            vec![notification(), notification()]
        );
    }

    #[test]
    fn test_lambda_sns_event() {
        let event = json!({
            "Records": [
                {"EventSource": "aws:sns", "Sns": {"Message": notification().to_string()}},
                {"EventSource": "aws:sns", "Sns": {}}
            ]
        });
        assert_eq!(extract_notifications(event), vec![notification()]);
    }

    #[test]
    fn test_bare_notification() {
        assert_eq!(extract_notifications(notification()), vec![notification()]);

        let envelope = json!({"Type": "Notification", "Message": notification().to_string()});
        assert_eq!(extract_notifications(envelope), vec![notification()]);
        assert!(extract_notifications(json!({"Message": "{broken"})).is_empty());
    }
}
