use crate::clock::Clock;
use crate::cooldown::{classify, CooldownState};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use logwarden_common::types::{
    truncate_chars, Alert, AlertType, CursorUpdate, TriggerData, MESSAGE_SNIPPET_CHARS,
};
use logwarden_notify::Notifier;
use logwarden_query::parse_at;
use logwarden_storage::{AlertStore, LogStore};
use std::sync::Arc;
use tracing;

/// One-tick evaluator over every enabled alert.
///
/// Each alert is evaluated independently under a failure boundary: a
/// store or delivery error on one alert is logged and the remaining
/// alerts in the tick still run.
pub struct Evaluator {
    logs: Arc<dyn LogStore>,
    alerts: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl Evaluator {
    pub fn new(
        logs: Arc<dyn LogStore>,
        alerts: Arc<dyn AlertStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            logs,
            alerts,
            notifier,
            clock,
        }
    }

    /// Evaluate every enabled alert once. Disabled alerts are never
    /// loaded and never have any cursor field touched.
    pub async fn run_tick(&self) -> Result<()> {
        let alerts = self.alerts.list_enabled()?;
        let now = self.clock.now();

        tracing::debug!(count = alerts.len(), "Evaluation tick started");

        for alert in &alerts {
            if let Err(e) = self.evaluate_alert(alert, now).await {
                tracing::error!(
                    alert_id = %alert.id,
                    alert_name = %alert.name,
                    error = %e,
                    "Alert evaluation failed"
                );
            }
        }

        Ok(())
    }

    async fn evaluate_alert(&self, alert: &Alert, now: DateTime<Utc>) -> Result<()> {
        match classify(now, alert.last_triggered_at, alert.cooldown_seconds) {
            CooldownState::InCooldown => self.advance_suppressed(alert, now),
            CooldownState::NeverTriggered | CooldownState::Eligible => match alert.alert_type {
                AlertType::AnyMatch => self.evaluate_any_match(alert, now).await,
                AlertType::Velocity => self.evaluate_velocity(alert, now).await,
            },
        }
    }

    /// In cooldown nothing fires and `last_checked_at` stays put, but an
    /// any_match alert still moves `last_seen_log_id` past matches that
    /// arrived during the window: suppressed, not queued. Velocity alerts
    /// recount from scratch anyway, so they are a full no-op here.
    fn advance_suppressed(&self, alert: &Alert, now: DateTime<Utc>) -> Result<()> {
        if alert.alert_type != AlertType::AnyMatch {
            return Ok(());
        }

        let tokens = parse_at(&alert.search_query, now);
        if tokens.is_empty() {
            return Ok(());
        }

        if let Some(latest) = self.logs.latest_match_id(&tokens, alert.last_seen_log_id)? {
            tracing::debug!(
                alert_id = %alert.id,
                latest_log_id = latest,
                "Match during cooldown, cursor advanced without trigger"
            );
            self.alerts.update_cursor(
                &alert.id,
                &CursorUpdate {
                    last_seen_log_id: Some(latest),
                    ..Default::default()
                },
            )?;
        }
        Ok(())
    }

    async fn evaluate_any_match(&self, alert: &Alert, now: DateTime<Utc>) -> Result<()> {
        let tokens = parse_at(&alert.search_query, now);

        // An empty compile is an explicit never-fire rule, not a match-all.
        if tokens.is_empty() {
            return self.touch_checked_at(alert, now);
        }

        let record = match self.logs.first_match(&tokens, alert.last_seen_log_id)? {
            Some(record) => record,
            None => return self.touch_checked_at(alert, now),
        };

        let trigger = TriggerData::AnyMatch {
            log_id: record.id,
            message: truncate_chars(&record.message, MESSAGE_SNIPPET_CHARS),
            level: record.level,
            source: record.source.clone(),
            timestamp: record.timestamp,
        };
        self.fire(
            alert,
            trigger,
            now,
            CursorUpdate {
                last_seen_log_id: Some(record.id),
                last_triggered_at: Some(now),
                last_checked_at: Some(now),
            },
        )
        .await
    }

    async fn evaluate_velocity(&self, alert: &Alert, now: DateTime<Utc>) -> Result<()> {
        let threshold = alert
            .velocity_threshold
            .ok_or_else(|| anyhow::anyhow!("Velocity alert without threshold: {}", alert.id))?;
        let window_seconds = alert
            .velocity_window_seconds
            .ok_or_else(|| anyhow::anyhow!("Velocity alert without window: {}", alert.id))?;

        let tokens = parse_at(&alert.search_query, now);
        let count = if tokens.is_empty() {
            0
        } else {
            let cutoff = now - Duration::seconds(window_seconds);
            self.logs.count_since(&tokens, cutoff)?
        };

        if count < threshold as u64 {
            return self.touch_checked_at(alert, now);
        }

        let trigger = TriggerData::Velocity {
            count,
            threshold,
            window_seconds,
        };
        self.fire(
            alert,
            trigger,
            now,
            CursorUpdate {
                last_seen_log_id: None,
                last_triggered_at: Some(now),
                last_checked_at: Some(now),
            },
        )
        .await
    }

    /// Confirmed trigger: dispatch, record history, then move cursors.
    /// A history write failure is logged and does not block the cursor
    /// update, otherwise the alert would re-fire every tick.
    async fn fire(
        &self,
        alert: &Alert,
        trigger: TriggerData,
        now: DateTime<Utc>,
        cursor: CursorUpdate,
    ) -> Result<()> {
        tracing::info!(
            alert_id = %alert.id,
            alert_name = %alert.name,
            trigger_type = trigger.trigger_type(),
            "Alert triggered"
        );

        let channels = self.alerts.channels_for_alert(&alert.id)?;
        let outcomes = self.notifier.send_alert(alert, &trigger, &channels).await;

        if let Err(e) = self
            .alerts
            .insert_history(&alert.id, &trigger, &outcomes, now)
        {
            tracing::error!(
                alert_id = %alert.id,
                error = %e,
                "Failed to record alert history"
            );
        }

        self.alerts.update_cursor(&alert.id, &cursor)?;
        Ok(())
    }

    fn touch_checked_at(&self, alert: &Alert, now: DateTime<Utc>) -> Result<()> {
        self.alerts.update_cursor(
            &alert.id,
            &CursorUpdate {
                last_checked_at: Some(now),
                ..Default::default()
            },
        )
    }
}
