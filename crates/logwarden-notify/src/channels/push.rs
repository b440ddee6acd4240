use crate::plugin::ChannelPlugin;
use crate::utils::format_trigger;
use crate::NotificationChannel;
use anyhow::Result;
use async_trait::async_trait;
use logwarden_common::types::{Alert, TriggerData};
use serde::Deserialize;
use serde_json::Value;
use tracing;

/// HTTP push gateway channel: posts the trigger as JSON to a configured
/// endpoint (mobile push relays, chat webhooks, pager bridges).
pub struct PushChannel {
    instance_id: String,
    client: reqwest::Client,
    url: String,
    auth_token: Option<String>,
}

impl PushChannel {
    pub fn new(instance_id: &str, url: &str, auth_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            instance_id: instance_id.to_string(),
            client,
            url: url.to_string(),
            auth_token,
        })
    }

    fn render_body(&self, alert: &Alert, trigger: &TriggerData) -> String {
        serde_json::json!({
            "alert_id": alert.id,
            "alert_name": alert.name,
            "search_query": alert.search_query,
            "trigger_type": trigger.trigger_type(),
            "trigger": trigger,
            "summary": format_trigger(alert, trigger),
        })
        .to_string()
    }
}

#[async_trait]
impl NotificationChannel for PushChannel {
    async fn send(&self, alert: &Alert, trigger: &TriggerData) -> Result<()> {
        let body = self.render_body(alert, trigger);

        let mut last_err = None;
        for attempt in 0..3u32 {
            let mut request = self
                .client
                .post(self.url.as_str())
                .header("Content-Type", "application/json")
                .body(body.clone());
            if let Some(token) = &self.auth_token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    let resp_body = resp.text().await.unwrap_or_default();
                    tracing::warn!(
                        attempt = attempt + 1,
                        status = %status,
                        "Push gateway returned non-success status, retrying"
                    );
                    last_err = Some(anyhow::anyhow!("HTTP {status}: {resp_body}"));
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "Push send failed, retrying"
                    );
                    last_err = Some(e.into());
                }
            }
            if attempt < 2 {
                tokio::time::sleep(std::time::Duration::from_millis(100 * 2u64.pow(attempt)))
                    .await;
            }
        }

        let err = last_err.unwrap_or_else(|| anyhow::anyhow!("Push send failed"));
        tracing::error!(url = %self.url, error = %err, "Push failed after 3 retries");
        Err(err)
    }

    fn channel_type(&self) -> &str {
        "push"
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

// Plugin

#[derive(Deserialize)]
struct PushConfig {
    url: String,
    auth_token: Option<String>,
}

pub struct PushPlugin;

impl ChannelPlugin for PushPlugin {
    fn name(&self) -> &str {
        "push"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        serde_json::from_value::<PushConfig>(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid push config: {e}"))?;
        Ok(())
    }

    fn create_channel(
        &self,
        instance_id: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let cfg: PushConfig = serde_json::from_value(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid push config: {e}"))?;
        Ok(Box::new(PushChannel::new(
            instance_id,
            &cfg.url,
            cfg.auth_token,
        )?))
    }
}
