use crate::error::StorageError;
use crate::filter::{LogFilter, SqlValue};
use crate::{AlertStore, LogStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use logwarden_common::types::{
    Alert, AlertHistory, AlertType, AlertUpdate, ChannelRow, CursorUpdate, LogRecord, NewAlert,
    NewChannel, NewLog, NotificationOutcome, TriggerData, COOLDOWN_MAX_SECONDS,
    COOLDOWN_MIN_SECONDS, VELOCITY_WINDOWS,
};
use logwarden_query::Token;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS logs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp   INTEGER NOT NULL,
    level       TEXT NOT NULL,
    source      TEXT,
    message     TEXT NOT NULL,
    metadata    TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs (timestamp);

CREATE TABLE IF NOT EXISTS alerts (
    id                      TEXT PRIMARY KEY,
    owner                   TEXT NOT NULL,
    name                    TEXT NOT NULL,
    description             TEXT,
    enabled                 INTEGER NOT NULL DEFAULT 1,
    search_query            TEXT NOT NULL,
    alert_type              TEXT NOT NULL,
    velocity_threshold      INTEGER,
    velocity_window_seconds INTEGER,
    cooldown_seconds        INTEGER NOT NULL,
    last_seen_log_id        INTEGER,
    last_triggered_at       INTEGER,
    last_checked_at         INTEGER,
    created_at              INTEGER NOT NULL,
    updated_at              INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS alert_history (
    id                  TEXT PRIMARY KEY,
    alert_id            TEXT NOT NULL REFERENCES alerts(id) ON DELETE CASCADE,
    trigger_type        TEXT NOT NULL,
    trigger_data        TEXT NOT NULL,
    notifications_sent  TEXT NOT NULL,
    triggered_at        INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alert_history_alert ON alert_history (alert_id, triggered_at);

CREATE TABLE IF NOT EXISTS notification_channels (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    channel_type TEXT NOT NULL,
    enabled      INTEGER NOT NULL DEFAULT 1,
    config       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS alert_channels (
    alert_id   TEXT NOT NULL REFERENCES alerts(id) ON DELETE CASCADE,
    channel_id TEXT NOT NULL REFERENCES notification_channels(id) ON DELETE CASCADE,
    PRIMARY KEY (alert_id, channel_id)
);
";

/// Single-database SQLite store implementing both [`LogStore`] and
/// [`AlertStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Connection lock poisoned, recovering");
            poisoned.into_inner()
        });
        f(&conn)
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn map_log_row(row: &Row<'_>) -> rusqlite::Result<LogRecord> {
    let metadata_json: String = row.get(5)?;
    let level_str: String = row.get(2)?;
    Ok(LogRecord {
        id: row.get(0)?,
        timestamp: from_millis(row.get(1)?),
        level: level_str.parse().unwrap_or_default(),
        source: row.get(3)?,
        message: row.get(4)?,
        metadata: serde_json::from_str::<HashMap<String, String>>(&metadata_json)
            .unwrap_or_default(),
    })
}

const LOG_COLUMNS: &str = "id, timestamp, level, source, message, metadata";

impl LogStore for SqliteStore {
    fn insert_log(&self, log: &NewLog) -> Result<LogRecord> {
        self.with_conn(|conn| {
            let metadata_json = serde_json::to_string(&log.metadata)?;
            conn.execute(
                "INSERT INTO logs (timestamp, level, source, message, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    to_millis(log.timestamp),
                    log.level.to_string(),
                    log.source,
                    log.message,
                    metadata_json,
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(LogRecord {
                id,
                timestamp: log.timestamp,
                level: log.level,
                message: log.message.clone(),
                source: log.source.clone(),
                metadata: log.metadata.clone(),
            })
        })
    }

    fn first_match(&self, tokens: &[Token], after_id: Option<i64>) -> Result<Option<LogRecord>> {
        self.with_conn(|conn| {
            let mut filter = LogFilter::from_tokens(tokens);
            if let Some(after) = after_id {
                filter.push_raw("id > ?", SqlValue::Integer(after));
            }
            let sql = format!(
                "SELECT {LOG_COLUMNS} FROM logs{} ORDER BY id ASC LIMIT 1",
                filter.where_clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let record = stmt
                .query_row(params_from_iter(filter.params()), map_log_row)
                .optional()?;
            Ok(record)
        })
    }

    fn latest_match_id(&self, tokens: &[Token], after_id: Option<i64>) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let mut filter = LogFilter::from_tokens(tokens);
            if let Some(after) = after_id {
                filter.push_raw("id > ?", SqlValue::Integer(after));
            }
            let sql = format!(
                "SELECT MAX(id) FROM logs{}",
                filter.where_clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let id: Option<i64> = stmt.query_row(params_from_iter(filter.params()), |row| row.get(0))?;
            Ok(id)
        })
    }

    fn count_since(&self, tokens: &[Token], cutoff: DateTime<Utc>) -> Result<u64> {
        self.with_conn(|conn| {
            let mut filter = LogFilter::from_tokens(tokens);
            filter.push_raw("timestamp >= ?", SqlValue::Integer(to_millis(cutoff)));
            let sql = format!("SELECT COUNT(*) FROM logs{}", filter.where_clause());
            let mut stmt = conn.prepare(&sql)?;
            let count: i64 = stmt.query_row(params_from_iter(filter.params()), |row| row.get(0))?;
            Ok(count as u64)
        })
    }
}

const ALERT_COLUMNS: &str = "id, owner, name, description, enabled, search_query, alert_type, \
     velocity_threshold, velocity_window_seconds, cooldown_seconds, \
     last_seen_log_id, last_triggered_at, last_checked_at, created_at, updated_at";

fn map_alert_row(row: &Row<'_>) -> rusqlite::Result<Alert> {
    let alert_type: String = row.get(6)?;
    Ok(Alert {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        enabled: row.get(4)?,
        search_query: row.get(5)?,
        alert_type: alert_type.parse().unwrap_or(AlertType::AnyMatch),
        velocity_threshold: row.get(7)?,
        velocity_window_seconds: row.get(8)?,
        cooldown_seconds: row.get(9)?,
        last_seen_log_id: row.get(10)?,
        last_triggered_at: row.get::<_, Option<i64>>(11)?.map(from_millis),
        last_checked_at: row.get::<_, Option<i64>>(12)?.map(from_millis),
        created_at: from_millis(row.get(13)?),
        updated_at: from_millis(row.get(14)?),
    })
}

/// Raw history row before the JSON payload columns are deserialized.
struct RawHistoryRow {
    id: String,
    alert_id: String,
    trigger_type: String,
    trigger_json: String,
    notifications_json: String,
    triggered_at: DateTime<Utc>,
}

fn map_history_row(row: &Row<'_>) -> rusqlite::Result<RawHistoryRow> {
    Ok(RawHistoryRow {
        id: row.get(0)?,
        alert_id: row.get(1)?,
        trigger_type: row.get(2)?,
        trigger_json: row.get(3)?,
        notifications_json: row.get(4)?,
        triggered_at: from_millis(row.get(5)?),
    })
}

fn map_channel_row(row: &Row<'_>) -> rusqlite::Result<(ChannelRow, String)> {
    Ok((
        ChannelRow {
            id: row.get(0)?,
            name: row.get(1)?,
            channel_type: row.get(2)?,
            enabled: row.get(3)?,
            config: serde_json::Value::Null,
        },
        row.get(4)?,
    ))
}

fn finish_channel_row((mut row, config_json): (ChannelRow, String)) -> ChannelRow {
    row.config = serde_json::from_str(&config_json).unwrap_or(serde_json::Value::Null);
    row
}

fn finish_history_row(raw: RawHistoryRow) -> Result<AlertHistory> {
    Ok(AlertHistory {
        id: raw.id,
        alert_id: raw.alert_id,
        trigger_type: raw.trigger_type,
        trigger_data: serde_json::from_str(&raw.trigger_json).map_err(StorageError::Json)?,
        notifications_sent: serde_json::from_str(&raw.notifications_json)
            .map_err(StorageError::Json)?,
        triggered_at: raw.triggered_at,
    })
}

/// Validate alert configuration on create and update.
fn validate_alert(
    name: &str,
    alert_type: AlertType,
    velocity_threshold: Option<i64>,
    velocity_window_seconds: Option<i64>,
    cooldown_seconds: i64,
) -> Result<(), StorageError> {
    let invalid = |reason: String| StorageError::InvalidAlert { reason };

    if name.trim().is_empty() {
        return Err(invalid("name must not be empty".into()));
    }
    if !(COOLDOWN_MIN_SECONDS..=COOLDOWN_MAX_SECONDS).contains(&cooldown_seconds) {
        return Err(invalid(format!(
            "cooldown_seconds must be within [{COOLDOWN_MIN_SECONDS}, {COOLDOWN_MAX_SECONDS}], got {cooldown_seconds}"
        )));
    }
    match alert_type {
        AlertType::AnyMatch => Ok(()),
        AlertType::Velocity => {
            let threshold = velocity_threshold
                .ok_or_else(|| invalid("velocity alerts require velocity_threshold".into()))?;
            if threshold < 1 {
                return Err(invalid(format!(
                    "velocity_threshold must be at least 1, got {threshold}"
                )));
            }
            let window = velocity_window_seconds.ok_or_else(|| {
                invalid("velocity alerts require velocity_window_seconds".into())
            })?;
            if !VELOCITY_WINDOWS.contains(&window) {
                return Err(invalid(format!(
                    "velocity_window_seconds must be one of {VELOCITY_WINDOWS:?}, got {window}"
                )));
            }
            Ok(())
        }
    }
}

impl AlertStore for SqliteStore {
    fn insert_alert(&self, alert: &NewAlert) -> Result<Alert> {
        validate_alert(
            &alert.name,
            alert.alert_type,
            alert.velocity_threshold,
            alert.velocity_window_seconds,
            alert.cooldown_seconds,
        )?;
        self.with_conn(|conn| {
            let id = logwarden_common::id::next_id();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO alerts (id, owner, name, description, enabled, search_query,
                     alert_type, velocity_threshold, velocity_window_seconds, cooldown_seconds,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    id,
                    alert.owner,
                    alert.name,
                    alert.description,
                    alert.enabled,
                    alert.search_query,
                    alert.alert_type.to_string(),
                    alert.velocity_threshold,
                    alert.velocity_window_seconds,
                    alert.cooldown_seconds,
                    to_millis(now),
                    to_millis(now),
                ],
            )?;
            Ok(Alert {
                id,
                owner: alert.owner.clone(),
                name: alert.name.clone(),
                description: alert.description.clone(),
                enabled: alert.enabled,
                search_query: alert.search_query.clone(),
                alert_type: alert.alert_type,
                velocity_threshold: alert.velocity_threshold,
                velocity_window_seconds: alert.velocity_window_seconds,
                cooldown_seconds: alert.cooldown_seconds,
                last_seen_log_id: None,
                last_triggered_at: None,
                last_checked_at: None,
                created_at: now,
                updated_at: now,
            })
        })
    }

    fn get_alert(&self, id: &str) -> Result<Option<Alert>> {
        self.with_conn(|conn| {
            let alert = conn
                .query_row(
                    &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
                    params![id],
                    map_alert_row,
                )
                .optional()?;
            Ok(alert)
        })
    }

    fn list_alerts(&self, owner: &str) -> Result<Vec<Alert>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ALERT_COLUMNS} FROM alerts WHERE owner = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map(params![owner], map_alert_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn list_enabled(&self) -> Result<Vec<Alert>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ALERT_COLUMNS} FROM alerts WHERE enabled = 1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], map_alert_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn update_alert(&self, id: &str, update: &AlertUpdate) -> Result<Option<Alert>> {
        let Some(current) = self.get_alert(id)? else {
            return Ok(None);
        };

        let merged = Alert {
            id: current.id,
            owner: current.owner,
            name: update.name.clone().unwrap_or(current.name),
            description: update.description.clone().unwrap_or(current.description),
            enabled: update.enabled.unwrap_or(current.enabled),
            search_query: update.search_query.clone().unwrap_or(current.search_query),
            alert_type: update.alert_type.unwrap_or(current.alert_type),
            velocity_threshold: update
                .velocity_threshold
                .unwrap_or(current.velocity_threshold),
            velocity_window_seconds: update
                .velocity_window_seconds
                .unwrap_or(current.velocity_window_seconds),
            cooldown_seconds: update.cooldown_seconds.unwrap_or(current.cooldown_seconds),
            last_seen_log_id: current.last_seen_log_id,
            last_triggered_at: current.last_triggered_at,
            last_checked_at: current.last_checked_at,
            created_at: current.created_at,
            updated_at: Utc::now(),
        };

        validate_alert(
            &merged.name,
            merged.alert_type,
            merged.velocity_threshold,
            merged.velocity_window_seconds,
            merged.cooldown_seconds,
        )?;

        self.with_conn(|conn| {
            conn.execute(
                "UPDATE alerts SET name = ?2, description = ?3, enabled = ?4, search_query = ?5,
                     alert_type = ?6, velocity_threshold = ?7, velocity_window_seconds = ?8,
                     cooldown_seconds = ?9, updated_at = ?10
                 WHERE id = ?1",
                params![
                    id,
                    merged.name,
                    merged.description,
                    merged.enabled,
                    merged.search_query,
                    merged.alert_type.to_string(),
                    merged.velocity_threshold,
                    merged.velocity_window_seconds,
                    merged.cooldown_seconds,
                    to_millis(merged.updated_at),
                ],
            )?;
            Ok(Some(merged))
        })
    }

    fn delete_alert(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM alerts WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
    }

    fn update_cursor(&self, id: &str, cursor: &CursorUpdate) -> Result<()> {
        self.with_conn(|conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<SqlValue> = vec![SqlValue::Text(id.to_string())];

            if let Some(log_id) = cursor.last_seen_log_id {
                // monotonic: a stale value never regresses the cursor
                sets.push("last_seen_log_id = MAX(COALESCE(last_seen_log_id, 0), ?)");
                values.push(SqlValue::Integer(log_id));
            }
            if let Some(at) = cursor.last_triggered_at {
                sets.push("last_triggered_at = ?");
                values.push(SqlValue::Integer(to_millis(at)));
            }
            if let Some(at) = cursor.last_checked_at {
                sets.push("last_checked_at = ?");
                values.push(SqlValue::Integer(to_millis(at)));
            }
            if sets.is_empty() {
                return Ok(());
            }

            let sql = format!("UPDATE alerts SET {} WHERE id = ?1", renumber(&sets));
            let affected = conn.execute(&sql, params_from_iter(&values))?;
            if affected == 0 {
                return Err(StorageError::NotFound {
                    entity: "alert",
                    id: id.to_string(),
                }
                .into());
            }
            Ok(())
        })
    }

    fn insert_history(
        &self,
        alert_id: &str,
        trigger: &TriggerData,
        notifications: &[NotificationOutcome],
        triggered_at: DateTime<Utc>,
    ) -> Result<AlertHistory> {
        self.with_conn(|conn| {
            let id = logwarden_common::id::next_id();
            let trigger_json = serde_json::to_string(trigger)?;
            let notifications_json = serde_json::to_string(notifications)?;
            conn.execute(
                "INSERT INTO alert_history (id, alert_id, trigger_type, trigger_data,
                     notifications_sent, triggered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    alert_id,
                    trigger.trigger_type(),
                    trigger_json,
                    notifications_json,
                    to_millis(triggered_at),
                ],
            )?;
            Ok(AlertHistory {
                id,
                alert_id: alert_id.to_string(),
                trigger_type: trigger.trigger_type().to_string(),
                trigger_data: trigger.clone(),
                notifications_sent: notifications.to_vec(),
                triggered_at,
            })
        })
    }

    fn list_history(&self, alert_id: &str, limit: usize) -> Result<Vec<AlertHistory>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, alert_id, trigger_type, trigger_data, notifications_sent, triggered_at
                 FROM alert_history WHERE alert_id = ?1
                 ORDER BY triggered_at DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![alert_id, limit as i64], map_history_row)?;
            let mut history = Vec::new();
            for row in rows {
                history.push(finish_history_row(row?)?);
            }
            Ok(history)
        })
    }

    fn insert_channel(&self, channel: &NewChannel) -> Result<ChannelRow> {
        self.with_conn(|conn| {
            let id = logwarden_common::id::next_id();
            let config_json = serde_json::to_string(&channel.config)?;
            conn.execute(
                "INSERT INTO notification_channels (id, name, channel_type, enabled, config)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    channel.name,
                    channel.channel_type,
                    channel.enabled,
                    config_json,
                ],
            )?;
            Ok(ChannelRow {
                id,
                name: channel.name.clone(),
                channel_type: channel.channel_type.clone(),
                enabled: channel.enabled,
                config: channel.config.clone(),
            })
        })
    }

    fn list_channels(&self) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, channel_type, enabled, config FROM notification_channels
                 ORDER BY name ASC",
            )?;
            let rows = stmt.query_map([], map_channel_row)?;
            let rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows.into_iter().map(finish_channel_row).collect())
        })
    }

    fn attach_channel(&self, alert_id: &str, channel_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO alert_channels (alert_id, channel_id) VALUES (?1, ?2)",
                params![alert_id, channel_id],
            )?;
            Ok(())
        })
    }

    fn detach_channel(&self, alert_id: &str, channel_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM alert_channels WHERE alert_id = ?1 AND channel_id = ?2",
                params![alert_id, channel_id],
            )?;
            Ok(())
        })
    }

    fn channels_for_alert(&self, alert_id: &str) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, c.channel_type, c.enabled, c.config
                 FROM notification_channels c
                 JOIN alert_channels ac ON ac.channel_id = c.id
                 WHERE ac.alert_id = ?1 AND c.enabled = 1
                 ORDER BY c.name ASC",
            )?;
            let rows = stmt.query_map(params![alert_id], map_channel_row)?;
            let rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows.into_iter().map(finish_channel_row).collect())
        })
    }
}

/// Rewrite `?` placeholders in SET fragments to sequential indices
/// starting at ?2 (?1 is the row id).
fn renumber(sets: &[&str]) -> String {
    let mut next = 2;
    sets.iter()
        .map(|fragment| {
            let mut out = String::with_capacity(fragment.len() + 2);
            for c in fragment.chars() {
                if c == '?' {
                    out.push('?');
                    out.push_str(&next.to_string());
                    next += 1;
                } else {
                    out.push(c);
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(", ")
}
