use crate::dispatcher::Dispatcher;
use crate::plugin::{ChannelPlugin, ChannelRegistry};
use crate::{NotificationChannel, Notifier};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use logwarden_common::types::{Alert, AlertType, ChannelRow, LogLevel, TriggerData};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn sample_alert() -> Alert {
    let now = Utc::now();
    Alert {
        id: "alert-1".into(),
        owner: "user-1".into(),
        name: "prod errors".into(),
        description: None,
        enabled: true,
        search_query: "level:error".into(),
        alert_type: AlertType::AnyMatch,
        velocity_threshold: None,
        velocity_window_seconds: None,
        cooldown_seconds: 3600,
        last_seen_log_id: None,
        last_triggered_at: None,
        last_checked_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn sample_trigger() -> TriggerData {
    TriggerData::AnyMatch {
        log_id: 42,
        message: "boom".into(),
        level: LogLevel::Error,
        source: Some("api".into()),
        timestamp: Utc::now(),
    }
}

fn channel_row(id: &str, channel_type: &str, enabled: bool) -> ChannelRow {
    ChannelRow {
        id: id.into(),
        name: format!("{channel_type}-{id}"),
        channel_type: channel_type.into(),
        enabled,
        config: serde_json::json!({}),
    }
}

// ── Stub channel plumbing ──

struct StubChannel {
    instance_id: String,
    sends: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl NotificationChannel for StubChannel {
    async fn send(&self, _alert: &Alert, _trigger: &TriggerData) -> Result<()> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("stub delivery failure");
        }
        Ok(())
    }

    fn channel_type(&self) -> &str {
        "stub"
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

struct StubPlugin {
    name: &'static str,
    sends: Arc<AtomicUsize>,
    fail: bool,
}

impl ChannelPlugin for StubPlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn validate_config(&self, _config: &Value) -> Result<()> {
        Ok(())
    }

    fn create_channel(
        &self,
        instance_id: &str,
        _config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        Ok(Box::new(StubChannel {
            instance_id: instance_id.to_string(),
            sends: self.sends.clone(),
            fail: self.fail,
        }))
    }
}

// ── Plugin registry tests ──

#[test]
fn registry_default_has_builtin_plugins() {
    let registry = ChannelRegistry::default();
    let mut names = registry.plugin_names();
    names.sort();
    assert_eq!(names, vec!["email", "push"]);
}

#[test]
fn registry_unknown_plugin_returns_error() {
    let registry = ChannelRegistry::default();
    let config = serde_json::json!({});
    let result = registry.create_channel("nonexistent", "ch-1", &config);
    let err = result.err().expect("should return error for unknown plugin");
    assert!(err.to_string().contains("Unknown channel plugin type"));
}

#[test]
fn email_plugin_rejects_incomplete_config() {
    let registry = ChannelRegistry::default();
    let config = serde_json::json!({ "smtp_host": "smtp.example.com" });
    assert!(registry.create_channel("email", "ch-1", &config).is_err());
}

#[test]
fn push_plugin_accepts_minimal_config() {
    let registry = ChannelRegistry::default();
    let config = serde_json::json!({ "url": "https://push.example.com/notify" });
    assert!(registry.create_channel("push", "ch-1", &config).is_ok());
}

// ── Dispatcher tests ──

#[tokio::test]
async fn dispatcher_reports_one_outcome_per_enabled_channel() {
    let sends = Arc::new(AtomicUsize::new(0));
    let mut registry = ChannelRegistry::new();
    registry.register(Box::new(StubPlugin {
        name: "stub",
        sends: sends.clone(),
        fail: false,
    }));
    let dispatcher = Dispatcher::new(registry);

    let channels = vec![
        channel_row("ch-1", "stub", true),
        channel_row("ch-2", "stub", false),
        channel_row("ch-3", "stub", true),
    ];
    let outcomes = dispatcher
        .send_alert(&sample_alert(), &sample_trigger(), &channels)
        .await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.success));
    assert_eq!(sends.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dispatcher_failure_does_not_abort_siblings() {
    let sends = Arc::new(AtomicUsize::new(0));
    let mut registry = ChannelRegistry::new();
    registry.register(Box::new(StubPlugin {
        name: "flaky",
        sends: sends.clone(),
        fail: true,
    }));
    registry.register(Box::new(StubPlugin {
        name: "stub",
        sends: sends.clone(),
        fail: false,
    }));
    let dispatcher = Dispatcher::new(registry);

    let channels = vec![
        channel_row("ch-1", "flaky", true),
        channel_row("ch-2", "stub", true),
    ];
    let outcomes = dispatcher
        .send_alert(&sample_alert(), &sample_trigger(), &channels)
        .await;

    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].success);
    assert!(outcomes[0].error.as_deref().unwrap().contains("stub delivery failure"));
    assert!(outcomes[1].success);
    assert_eq!(sends.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dispatcher_unknown_channel_type_records_failure() {
    let dispatcher = Dispatcher::new(ChannelRegistry::new());

    let channels = vec![channel_row("ch-1", "carrier-pigeon", true)];
    let outcomes = dispatcher
        .send_alert(&sample_alert(), &sample_trigger(), &channels)
        .await;

    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].success);
    assert!(outcomes[0]
        .error
        .as_deref()
        .unwrap()
        .contains("Unknown channel plugin type"));
}
