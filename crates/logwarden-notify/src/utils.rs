//! Utility functions for notification channels

use logwarden_common::types::{Alert, TriggerData};
use serde_json::Value;

/// Render a one-line summary of a trigger, shared by channel bodies.
pub fn format_trigger(alert: &Alert, trigger: &TriggerData) -> String {
    match trigger {
        TriggerData::AnyMatch {
            message,
            level,
            source,
            timestamp,
            ..
        } => {
            let source_line = match source {
                Some(s) => format!("\nSource: {s}"),
                None => String::new(),
            };
            format!(
                "Alert: {name}\nQuery: {query}\nLevel: {level}{source_line}\nTime: {time}\nMessage: {message}",
                name = alert.name,
                query = alert.search_query,
                level = level,
                source_line = source_line,
                time = timestamp.to_rfc3339(),
                message = message,
            )
        }
        TriggerData::Velocity {
            count,
            threshold,
            window_seconds,
        } => format!(
            "Alert: {name}\nQuery: {query}\nMatched {count} logs in the last {window_seconds}s (threshold {threshold})",
            name = alert.name,
            query = alert.search_query,
            count = count,
            window_seconds = window_seconds,
            threshold = threshold,
        ),
    }
}

/// Redact sensitive fields from JSON configuration.
///
/// Replaces values for keys that commonly contain secrets (passwords,
/// tokens, api keys, credentials), recursing into nested objects and
/// arrays.
pub fn redact_sensitive_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let key_lower = key.to_lowercase();
                let is_sensitive = key_lower.contains("password")
                    || key_lower.contains("passwd")
                    || key_lower.contains("pwd")
                    || key_lower.contains("token")
                    || key_lower.contains("secret")
                    || key_lower.contains("api_key")
                    || key_lower.contains("apikey")
                    || key_lower.contains("credentials");

                if is_sensitive {
                    redacted.insert(key.clone(), Value::String("***".to_string()));
                } else if val.is_object() || val.is_array() {
                    redacted.insert(key.clone(), redact_sensitive_json(val));
                } else {
                    redacted.insert(key.clone(), val.clone());
                }
            }
            Value::Object(redacted)
        }
        Value::Array(arr) => {
            let redacted: Vec<Value> = arr.iter().map(redact_sensitive_json).collect();
            Value::Array(redacted)
        }
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_sensitive_json() {
        let json = serde_json::json!({
            "username": "admin",
            "smtp_password": "secret123",
            "api_key": "abc123",
            "smtp_host": "smtp.example.com",
            "nested": {
                "access_token": "xyz789",
                "public_value": "visible"
            }
        });

        let redacted = redact_sensitive_json(&json);
        assert_eq!(redacted["username"], "admin");
        assert_eq!(redacted["smtp_password"], "***");
        assert_eq!(redacted["api_key"], "***");
        assert_eq!(redacted["smtp_host"], "smtp.example.com");
        assert_eq!(redacted["nested"]["access_token"], "***");
        assert_eq!(redacted["nested"]["public_value"], "visible");
    }
}
