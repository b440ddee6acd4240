use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Evaluation tick cadence in seconds; every alert shares it.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Snowflake id generator coordinates.
    #[serde(default = "default_machine_id")]
    pub machine_id: i32,
    #[serde(default = "default_node_id")]
    pub node_id: i32,

    /// Notification channels created at startup when absent.
    #[serde(default)]
    pub channels: Vec<SeedChannel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedChannel {
    pub name: String,
    pub channel_type: String,
    #[serde(default = "default_seed_enabled")]
    pub enabled: bool,
    pub config: serde_json::Value,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_tick_secs() -> u64 {
    logwarden_alert::scheduler::DEFAULT_TICK_SECS
}

fn default_machine_id() -> i32 {
    1
}

fn default_node_id() -> i32 {
    1
}

fn default_seed_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tick_secs: default_tick_secs(),
            machine_id: default_machine_id(),
            node_id: default_node_id(),
            channels: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.tick_secs, 30);
        assert!(config.channels.is_empty());
    }

    #[test]
    fn parses_channel_seed_entries() {
        let config: ServerConfig = toml::from_str(
            r#"
            data_dir = "/var/lib/logwarden"
            tick_secs = 10

            [[channels]]
            name = "ops-email"
            channel_type = "email"

            [channels.config]
            smtp_host = "smtp.example.com"
            smtp_port = 587
            from = "alerts@example.com"
            recipients = ["oncall@example.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.tick_secs, 10);
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].name, "ops-email");
        assert!(config.channels[0].enabled);
        assert_eq!(config.channels[0].config["smtp_port"], 587);
    }
}
