use crate::config::SeedChannel;
use anyhow::Result;
use logwarden_common::types::NewChannel;
use logwarden_notify::plugin::ChannelRegistry;
use logwarden_notify::utils::redact_sensitive_json;
use logwarden_storage::AlertStore;
use std::collections::HashSet;
use tracing;

/// Create notification channels from the config file, skipping names
/// that already exist. Configs are validated through the matching
/// plugin before insert; an invalid entry is logged and skipped so one
/// bad channel never blocks startup.
pub fn seed_channels(
    store: &dyn AlertStore,
    registry: &ChannelRegistry,
    channels: &[SeedChannel],
) -> Result<usize> {
    let existing: HashSet<String> = store
        .list_channels()?
        .into_iter()
        .map(|row| row.name)
        .collect();

    let mut created = 0;
    for seed in channels {
        if existing.contains(&seed.name) {
            tracing::debug!(name = %seed.name, "Channel already exists, skipping seed");
            continue;
        }

        let plugin = match registry.get_plugin(&seed.channel_type) {
            Some(plugin) => plugin,
            None => {
                tracing::warn!(
                    name = %seed.name,
                    channel_type = %seed.channel_type,
                    "Unknown channel type in seed, skipping"
                );
                continue;
            }
        };

        if let Err(e) = plugin.validate_config(&seed.config) {
            tracing::warn!(
                name = %seed.name,
                channel_type = %seed.channel_type,
                error = %e,
                "Invalid channel config in seed, skipping"
            );
            continue;
        }

        let row = store.insert_channel(&NewChannel {
            name: seed.name.clone(),
            channel_type: seed.channel_type.clone(),
            enabled: seed.enabled,
            config: seed.config.clone(),
        })?;
        tracing::info!(
            id = %row.id,
            name = %row.name,
            channel_type = %row.channel_type,
            config = %redact_sensitive_json(&row.config),
            "Seeded notification channel"
        );
        created += 1;
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwarden_storage::engine::SqliteStore;
    use tempfile::TempDir;

    fn push_seed(name: &str) -> SeedChannel {
        SeedChannel {
            name: name.into(),
            channel_type: "push".into(),
            enabled: true,
            config: serde_json::json!({ "url": "https://push.example.com" }),
        }
    }

    #[test]
    fn seeding_is_idempotent_by_name() {
        logwarden_common::id::init(1, 1);
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("logwarden.db")).unwrap();
        let registry = ChannelRegistry::default();

        let seeds = vec![push_seed("ops")];
        assert_eq!(seed_channels(&store, &registry, &seeds).unwrap(), 1);
        assert_eq!(seed_channels(&store, &registry, &seeds).unwrap(), 0);
        assert_eq!(store.list_channels().unwrap().len(), 1);
    }

    #[test]
    fn invalid_entries_are_skipped_not_fatal() {
        logwarden_common::id::init(1, 1);
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("logwarden.db")).unwrap();
        let registry = ChannelRegistry::default();

        let seeds = vec![
            SeedChannel {
                name: "broken".into(),
                channel_type: "email".into(),
                enabled: true,
                config: serde_json::json!({}),
            },
            SeedChannel {
                name: "unknown".into(),
                channel_type: "fax".into(),
                enabled: true,
                config: serde_json::json!({}),
            },
            push_seed("ops"),
        ];
        assert_eq!(seed_channels(&store, &registry, &seeds).unwrap(), 1);
        assert_eq!(store.list_channels().unwrap().len(), 1);
    }
}
