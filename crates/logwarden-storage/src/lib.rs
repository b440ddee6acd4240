//! SQLite persistence for log records and alert state.
//!
//! Two trait boundaries are consumed by the evaluation engine:
//! [`LogStore`] (the log table plus the predicate applier that narrows it
//! by compiled query tokens) and [`AlertStore`] (alert configuration,
//! evaluation cursors, trigger history, and channel associations).
//! [`engine::SqliteStore`] implements both over a single WAL-mode
//! database.

pub mod engine;
pub mod error;
pub mod filter;


use anyhow::Result;
use chrono::{DateTime, Utc};
use logwarden_common::types::{
    Alert, AlertHistory, AlertUpdate, ChannelRow, CursorUpdate, LogRecord, NewAlert, NewChannel,
    NewLog, NotificationOutcome, TriggerData,
};
use logwarden_query::Token;

/// Log record persistence and token-predicate queries.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because ingestion and the evaluation scheduler access the store
/// concurrently.
pub trait LogStore: Send + Sync {
    /// Appends one log record and returns it with its assigned id.
    fn insert_log(&self, log: &NewLog) -> Result<LogRecord>;

    /// Returns the earliest record with id greater than `after_id`
    /// (or the earliest overall when `None`) satisfying every token,
    /// ascending by id, limited to one row.
    fn first_match(&self, tokens: &[Token], after_id: Option<i64>) -> Result<Option<LogRecord>>;

    /// Returns the highest id among records after `after_id` satisfying
    /// every token, for cursor advancement without a trigger.
    fn latest_match_id(&self, tokens: &[Token], after_id: Option<i64>) -> Result<Option<i64>>;

    /// Counts records with timestamp at or after `cutoff` satisfying
    /// every token.
    fn count_since(&self, tokens: &[Token], cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Alert configuration, cursors, history, and channel associations.
///
/// Cursor writes go through [`AlertStore::update_cursor`] exclusively and
/// never touch configuration fields; administrative edits use
/// [`AlertStore::update_alert`] and never touch cursors.
pub trait AlertStore: Send + Sync {
    /// Creates an alert after validating its configuration.
    fn insert_alert(&self, alert: &NewAlert) -> Result<Alert>;

    fn get_alert(&self, id: &str) -> Result<Option<Alert>>;

    /// Lists alerts belonging to `owner`, newest first.
    fn list_alerts(&self, owner: &str) -> Result<Vec<Alert>>;

    /// All enabled alerts, in creation order; the engine's tick input.
    fn list_enabled(&self) -> Result<Vec<Alert>>;

    /// Applies a validated configuration update. Returns the updated
    /// alert, or `None` when it does not exist.
    fn update_alert(&self, id: &str, update: &AlertUpdate) -> Result<Option<Alert>>;

    /// Deletes an alert, cascading its history and channel links.
    fn delete_alert(&self, id: &str) -> Result<bool>;

    /// Partially updates the evaluation cursor. `last_seen_log_id` only
    /// ever advances; a stale value is ignored.
    fn update_cursor(&self, id: &str, cursor: &CursorUpdate) -> Result<()>;

    /// Appends one immutable history row for a confirmed trigger.
    fn insert_history(
        &self,
        alert_id: &str,
        trigger: &TriggerData,
        notifications: &[NotificationOutcome],
        triggered_at: DateTime<Utc>,
    ) -> Result<AlertHistory>;

    /// History for one alert, newest first.
    fn list_history(&self, alert_id: &str, limit: usize) -> Result<Vec<AlertHistory>>;

    fn insert_channel(&self, channel: &NewChannel) -> Result<ChannelRow>;

    fn list_channels(&self) -> Result<Vec<ChannelRow>>;

    fn attach_channel(&self, alert_id: &str, channel_id: &str) -> Result<()>;

    fn detach_channel(&self, alert_id: &str, channel_id: &str) -> Result<()>;

    /// Enabled channels associated with an alert; disabled associations
    /// are filtered out here so the dispatcher never sees them.
    fn channels_for_alert(&self, alert_id: &str) -> Result<Vec<ChannelRow>>;
}
