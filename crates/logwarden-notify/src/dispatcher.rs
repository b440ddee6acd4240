use crate::plugin::ChannelRegistry;
use crate::Notifier;
use async_trait::async_trait;
use logwarden_common::types::{Alert, ChannelRow, NotificationOutcome, TriggerData};
use tracing;

/// Fans a confirmed trigger out to every channel row attached to the
/// alert, building each channel instance through the registry.
///
/// Delivery is best-effort per channel: a misconfigured or failing
/// channel records `success: false` in its outcome and the remaining
/// channels still run. Disabled rows are skipped entirely.
pub struct Dispatcher {
    registry: ChannelRegistry,
}

impl Dispatcher {
    pub fn new(registry: ChannelRegistry) -> Self {
        Self { registry }
    }

    async fn deliver(
        &self,
        alert: &Alert,
        trigger: &TriggerData,
        row: &ChannelRow,
    ) -> Result<(), anyhow::Error> {
        let channel = self
            .registry
            .create_channel(&row.channel_type, &row.id, &row.config)?;
        channel.send(alert, trigger).await
    }
}

#[async_trait]
impl Notifier for Dispatcher {
    async fn send_alert(
        &self,
        alert: &Alert,
        trigger: &TriggerData,
        channels: &[ChannelRow],
    ) -> Vec<NotificationOutcome> {
        let mut outcomes = Vec::with_capacity(channels.len());

        for row in channels {
            if !row.enabled {
                continue;
            }

            let result = self.deliver(alert, trigger, row).await;
            let outcome = match result {
                Ok(()) => {
                    tracing::info!(
                        alert_id = %alert.id,
                        channel = %row.name,
                        channel_type = %row.channel_type,
                        "Notification delivered"
                    );
                    NotificationOutcome {
                        channel_id: row.id.clone(),
                        channel_type: row.channel_type.clone(),
                        channel_name: row.name.clone(),
                        success: true,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!(
                        alert_id = %alert.id,
                        channel = %row.name,
                        channel_type = %row.channel_type,
                        error = %e,
                        "Notification delivery failed"
                    );
                    NotificationOutcome {
                        channel_id: row.id.clone(),
                        channel_type: row.channel_type.clone(),
                        channel_name: row.name.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
