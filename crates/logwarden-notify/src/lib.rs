//! Notification delivery with pluggable channel support.
//!
//! Confirmed alert triggers are fanned out to the channels attached to the
//! alert. Each channel type is implemented as a [`NotificationChannel`]
//! behind a [`plugin::ChannelPlugin`] factory; the [`dispatcher::Dispatcher`]
//! ties them together and reports one [`NotificationOutcome`] per channel.
//! Built-in channels are email (SMTP) and push (HTTP gateway).

pub mod channels;
pub mod dispatcher;
pub mod plugin;
pub mod utils;

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use logwarden_common::types::{Alert, ChannelRow, NotificationOutcome, TriggerData};

/// A notification delivery channel that sends alert triggers to an
/// external service (e.g., SMTP, push gateway).
///
/// Implementations are created by the corresponding [`plugin::ChannelPlugin`]
/// from the channel row's JSON config.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the trigger through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after retries (if applicable).
    async fn send(&self, alert: &Alert, trigger: &TriggerData) -> Result<()>;

    /// Returns the channel type name (e.g., `"email"`, `"push"`).
    fn channel_type(&self) -> &str;

    /// Returns the channel row id this instance was built from.
    fn instance_id(&self) -> &str;
}

/// Fan-out seam between the evaluation engine and delivery.
///
/// The engine hands over the triggering alert, the trigger payload, and the
/// enabled channel rows attached to it; the implementation returns one
/// outcome per row, never erroring as a whole.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(
        &self,
        alert: &Alert,
        trigger: &TriggerData,
        channels: &[ChannelRow],
    ) -> Vec<NotificationOutcome>;
}
