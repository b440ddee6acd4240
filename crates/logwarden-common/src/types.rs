use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Log severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use logwarden_common::types::LogLevel;
///
/// let level: LogLevel = "warning".parse().unwrap();
/// assert_eq!(level, LogLevel::Warning);
/// assert_eq!(level.to_string(), "warning");
/// assert!(LogLevel::Error > LogLevel::Debug);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level: {s}")),
        }
    }
}

/// A single stored log record.
///
/// `id` is assigned by the log store and is unique and monotonically
/// increasing; the any-match evaluation cursor depends on that ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub source: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Insert form of [`LogRecord`], before the store assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLog {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub source: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// How an alert decides to trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Fires on the first new log record matching the search query.
    AnyMatch,
    /// Fires when the count of matching records in a trailing window
    /// reaches a threshold.
    Velocity,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::AnyMatch => write!(f, "any_match"),
            AlertType::Velocity => write!(f, "velocity"),
        }
    }
}

impl std::str::FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any_match" => Ok(AlertType::AnyMatch),
            "velocity" => Ok(AlertType::Velocity),
            _ => Err(format!("unknown alert type: {s}")),
        }
    }
}

/// Allowed values for `velocity_window_seconds`, in ascending order.
pub const VELOCITY_WINDOWS: &[i64] = &[60, 300, 900, 1800, 3600, 21600, 86400];

/// Bounds for `cooldown_seconds`.
pub const COOLDOWN_MIN_SECONDS: i64 = 60;
pub const COOLDOWN_MAX_SECONDS: i64 = 86400;

/// Maximum characters of a matched log message kept in a trigger payload.
pub const MESSAGE_SNIPPET_CHARS: usize = 200;

/// A user-defined alert rule plus its mutable evaluation cursor.
///
/// Configuration fields are edited through the administrative path; the
/// three cursor fields (`last_seen_log_id`, `last_triggered_at`,
/// `last_checked_at`) are written only by the evaluation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub search_query: String,
    pub alert_type: AlertType,
    pub velocity_threshold: Option<i64>,
    pub velocity_window_seconds: Option<i64>,
    pub cooldown_seconds: i64,
    pub last_seen_log_id: Option<i64>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert form of [`Alert`]; cursors start out null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub search_query: String,
    pub alert_type: AlertType,
    pub velocity_threshold: Option<i64>,
    pub velocity_window_seconds: Option<i64>,
    pub cooldown_seconds: i64,
}

/// Partial update of alert configuration fields.
///
/// Deliberately has no cursor fields: administrative edits and engine
/// cursor writes go through disjoint update paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub enabled: Option<bool>,
    pub search_query: Option<String>,
    pub alert_type: Option<AlertType>,
    pub velocity_threshold: Option<Option<i64>>,
    pub velocity_window_seconds: Option<Option<i64>>,
    pub cooldown_seconds: Option<i64>,
}

/// Partial update of the evaluation cursor. `None` fields are untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorUpdate {
    pub last_seen_log_id: Option<i64>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// The type-tagged payload persisted with a confirmed trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerData {
    /// Snapshot of the matched log record.
    AnyMatch {
        log_id: i64,
        message: String,
        level: LogLevel,
        source: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// Count observed in the trailing window, with the configured bounds.
    Velocity {
        count: u64,
        threshold: i64,
        window_seconds: i64,
    },
}

impl TriggerData {
    pub fn trigger_type(&self) -> &'static str {
        match self {
            TriggerData::AnyMatch { .. } => "any_match",
            TriggerData::Velocity { .. } => "velocity",
        }
    }
}

/// Outcome of one delivery attempt against one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationOutcome {
    pub channel_id: String,
    pub channel_type: String,
    pub channel_name: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Immutable record of a confirmed trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertHistory {
    pub id: String,
    pub alert_id: String,
    pub trigger_type: String,
    pub trigger_data: TriggerData,
    pub notifications_sent: Vec<NotificationOutcome>,
    pub triggered_at: DateTime<Utc>,
}

/// A notification channel row as stored. The `config` blob is opaque to
/// the engine; the matching channel plugin validates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRow {
    pub id: String,
    pub name: String,
    pub channel_type: String,
    pub enabled: bool,
    pub config: serde_json::Value,
}

/// Insert form of [`ChannelRow`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChannel {
    pub name: String,
    pub channel_type: String,
    pub enabled: bool,
    pub config: serde_json::Value,
}

/// Truncate a string to at most `max` characters, never splitting a
/// multi-byte character.
///
/// # Examples
///
/// ```
/// use logwarden_common::types::truncate_chars;
///
/// assert_eq!(truncate_chars("hello", 10), "hello");
/// assert_eq!(truncate_chars("hello world", 5), "hello");
/// ```
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
