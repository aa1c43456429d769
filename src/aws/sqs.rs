//! Queue draining
//!
//! AWS Config publishes to SNS, which fans out into an SQS queue. The poller
//! works through whatever is visible on the queue and stops once it is empty.

use anyhow::{Context, Result};
use aws_sdk_sqs as sqs;
use sqs::types::QueueAttributeName;
use std::future::Future;

/// Messages requested per receive call (the SQS maximum)
const MAX_MESSAGES_PER_RECEIVE: i32 = 10;

/// Seconds a received message stays hidden from other consumers
const VISIBILITY_TIMEOUT_SECS: i32 = 30;

/// Long polling wait per receive call
const WAIT_TIME_SECS: i32 = 5;

/// Consumer of a single SQS queue
pub struct QueuePoller {
    client: sqs::Client,
    queue_url: String,
}

impl QueuePoller {
    /// Resolve the queue URL for `queue_name`
    pub async fn connect(config: &aws_config::SdkConfig, queue_name: &str) -> Result<Self> {
        let client = sqs::Client::new(config);
        let response = client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .with_context(|| format!("Failed to resolve queue {}", queue_name))?;

        let queue_url = response
            .queue_url()
            .with_context(|| format!("No URL returned for queue {}", queue_name))?
            .to_string();

        tracing::debug!("Resolved queue {} to {}", queue_name, queue_url);
        Ok(Self { client, queue_url })
    }

    /// Approximate (visible, in flight) message counts
    async fn queue_length(&self) -> Result<(u64, u64)> {
        let response = self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesNotVisible)
            .send()
            .await
            .context("Failed to get queue attributes")?;

        let count = |name: QueueAttributeName| {
            response
                .attributes()
                .and_then(|attributes| attributes.get(&name))
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(0)
        };

        Ok((
            count(QueueAttributeName::ApproximateNumberOfMessages),
            count(QueueAttributeName::ApproximateNumberOfMessagesNotVisible),
        ))
    }

    /// Hand every message body to `handle` until the queue has no visible
    /// messages left. A message is deleted only after `handle` succeeded; the
    /// first failure stops the drain and leaves its message on the queue.
    pub async fn drain<F, Fut>(&self, mut handle: F) -> Result<usize>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut processed = 0;

        loop {
            let (visible, in_flight) = self.queue_length().await?;
            tracing::info!(
                "SQS queue length visible: {}, not visible: {}",
                visible,
                in_flight
            );
            if visible == 0 {
                break;
            }

            let response = self
                .client
                .receive_message()
                .queue_url(&self.queue_url)
                .max_number_of_messages(MAX_MESSAGES_PER_RECEIVE)
                .visibility_timeout(VISIBILITY_TIMEOUT_SECS)
                .wait_time_seconds(WAIT_TIME_SECS)
                .send()
                .await
                .context("Failed to receive messages")?;

            for message in response.messages() {
                let body = message.body().unwrap_or_default().to_string();
                let message_id = message.message_id().unwrap_or("unknown");

                handle(body)
                    .await
                    .with_context(|| format!("Failed to process message {}", message_id))?;

                if let Some(receipt) = message.receipt_handle() {
                    self.client
                        .delete_message()
                        .queue_url(&self.queue_url)
                        .receipt_handle(receipt)
                        .send()
                        .await
                        .with_context(|| format!("Failed to delete message {}", message_id))?;
                    tracing::debug!("Deleted message {} from queue", message_id);
                }
                processed += 1;
            }
        }

        Ok(processed)
    }
}
