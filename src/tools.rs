//! Agent-facing tools. Each tool forwards to the query HTTP API (or the
//! webhook) and turns every failure into an error result for the caller.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ToolsConfig;
use crate::error::{LogQueryError, Result};

/// Result of one tool invocation, in MCP `tools/call` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error,
        })
    }
}

pub struct ToolFacade {
    client: reqwest::Client,
    log_server_url: String,
    webhook_url: Option<String>,
}

impl ToolFacade {
    pub fn new(config: &ToolsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| LogQueryError::ConfigError(format!("http client: {e}")))?;
        Ok(Self {
            client,
            log_server_url: config.log_server_url.trim_end_matches('/').to_string(),
            webhook_url: config.webhook_url.clone().filter(|u| !u.is_empty()),
        })
    }

    pub fn definitions() -> Vec<Value> {
        vec![
            json!({
                "name": "get_logs",
                "description": "Query application logs by region and time range",
                "inputSchema": {
                    "type": "object",
                    "required": ["region", "start", "end"],
                    "properties": {
                        "region": { "type": "string", "description": "Region: NA, EU, or AP" },
                        "start": { "type": "string", "description": "Start time (epoch milliseconds)" },
                        "end": { "type": "string", "description": "End time (epoch milliseconds)" }
                    }
                }
            }),
            json!({
                "name": "to_epoch",
                "description": "Convert date to epoch milliseconds",
                "inputSchema": {
                    "type": "object",
                    "required": ["year", "month", "day", "time"],
                    "properties": {
                        "year": { "type": "string", "description": "Year (YYYY)" },
                        "month": { "type": "string", "description": "Month (1-12)" },
                        "day": { "type": "string", "description": "Day (1-31)" },
                        "time": { "type": "string", "description": "Time (HH:MM:SS)" }
                    }
                }
            }),
            json!({
                "name": "to_readable",
                "description": "Convert epoch milliseconds to readable date",
                "inputSchema": {
                    "type": "object",
                    "required": ["epoch_ms"],
                    "properties": {
                        "epoch_ms": { "type": "string", "description": "Epoch milliseconds" }
                    }
                }
            }),
            json!({
                "name": "send_teams",
                "description": "Send message to Microsoft Teams",
                "inputSchema": {
                    "type": "object",
                    "required": ["message"],
                    "properties": {
                        "message": { "type": "string", "description": "Message to send" }
                    }
                }
            }),
        ]
    }

    pub async fn call(&self, name: &str, args: &Value) -> ToolOutcome {
        debug!(tool = name, "tool call");
        let outcome = match name {
            "get_logs" => self.get_logs(args).await,
            "to_epoch" => self.to_epoch(args).await,
            "to_readable" => self.to_readable(args).await,
            "send_teams" => self.send_teams(args).await,
            _ => Ok(ToolOutcome::error(format!("unknown tool: {name}"))),
        };
        outcome.unwrap_or_else(|e| {
            warn!(tool = name, error = %e, "tool call failed");
            ToolOutcome::error(e.to_string())
        })
    }

    async fn get_logs(&self, args: &Value) -> Result<ToolOutcome> {
        let region = required_arg(args, "region")?;
        let start = required_arg(args, "start")?;
        let end = required_arg(args, "end")?;
        let url = format!(
            "{}/logs?region={}&start_date={}&end_date={}",
            self.log_server_url,
            urlencoding::encode(&region),
            urlencoding::encode(&start),
            urlencoding::encode(&end)
        );
        self.forward_get(&url).await
    }

    async fn to_epoch(&self, args: &Value) -> Result<ToolOutcome> {
        let year = required_arg(args, "year")?;
        let month = required_arg(args, "month")?;
        let day = required_arg(args, "day")?;
        let time = required_arg(args, "time")?;
        let url = format!(
            "{}/time/epoch?year={}&month={}&day={}&time={}",
            self.log_server_url,
            urlencoding::encode(&year),
            urlencoding::encode(&month),
            urlencoding::encode(&day),
            urlencoding::encode(&time)
        );
        self.forward_get(&url).await
    }

    async fn to_readable(&self, args: &Value) -> Result<ToolOutcome> {
        let epoch_ms = required_arg(args, "epoch_ms")?;
        let url = format!(
            "{}/time/readable?epoch_ms={}",
            self.log_server_url,
            urlencoding::encode(&epoch_ms)
        );
        self.forward_get(&url).await
    }

    async fn send_teams(&self, args: &Value) -> Result<ToolOutcome> {
        let Some(webhook) = &self.webhook_url else {
            return Ok(ToolOutcome::error(
                "Teams not configured (set TEAMS_WEBHOOK_URL)",
            ));
        };
        let message = required_arg(args, "message")?;

        let resp = self
            .client
            .post(webhook)
            .json(&json!({ "text": message }))
            .send()
            .await
            .map_err(|e| LogQueryError::Transport {
                target: "webhook".to_string(),
                reason: e.to_string(),
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Ok(ToolOutcome::error(format!(
                "Failed to send: webhook returned {status}"
            )));
        }
        Ok(ToolOutcome::text("Message sent to Teams"))
    }

    /// GET `url` and hand back the body; non-2xx bodies come back as errors.
    async fn forward_get(&self, url: &str) -> Result<ToolOutcome> {
        let transport = |e: reqwest::Error| LogQueryError::Transport {
            target: self.log_server_url.clone(),
            reason: e.to_string(),
        };
        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        let body = resp.text().await.map_err(transport)?;
        if status.is_success() {
            Ok(ToolOutcome::text(body))
        } else {
            Ok(ToolOutcome::error(format!("log server returned {status}: {body}")))
        }
    }
}

/// String argument, also accepting numbers since agents often send them.
fn required_arg(args: &Value, name: &str) -> Result<String> {
    let value = match args.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if value.is_empty() {
        return Err(LogQueryError::InvalidRequest(format!(
            "missing required argument: {name}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_cover_all_tools() {
        let names: Vec<String> = ToolFacade::definitions()
            .iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["get_logs", "to_epoch", "to_readable", "send_teams"]);
        for def in ToolFacade::definitions() {
            assert_eq!(def["inputSchema"]["type"], "object");
            assert!(def["inputSchema"]["required"].as_array().is_some());
        }
    }

    #[test]
    fn required_arg_accepts_strings_and_numbers() {
        let args = json!({ "a": "NA", "b": 1704067200000i64, "c": "", "d": true });
        assert_eq!(required_arg(&args, "a").unwrap(), "NA");
        assert_eq!(required_arg(&args, "b").unwrap(), "1704067200000");
        assert!(required_arg(&args, "c").is_err());
        assert!(required_arg(&args, "d").is_err());
        assert!(required_arg(&args, "missing").is_err());
    }

    #[test]
    fn outcome_shape() {
        let v = ToolOutcome::error("boom").to_value();
        assert_eq!(v["isError"], true);
        assert_eq!(v["content"][0]["type"], "text");
        assert_eq!(v["content"][0]["text"], "boom");
    }

    #[tokio::test]
    async fn webhook_tool_disabled_without_url() {
        let facade = ToolFacade::new(&ToolsConfig::default()).unwrap();
        let out = facade.call("send_teams", &json!({ "message": "hi" })).await;
        assert!(out.is_error);
        assert!(out.text.contains("TEAMS_WEBHOOK_URL"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_tool_error() {
        let facade = ToolFacade::new(&ToolsConfig {
            log_server_url: "http://127.0.0.1:1".to_string(),
            webhook_url: None,
            request_timeout_ms: 2_000,
        })
        .unwrap();
        let out = facade
            .call("get_logs", &json!({ "region": "NA", "start": "0", "end": "1" }))
            .await;
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn missing_arguments_and_unknown_tools() {
        let facade = ToolFacade::new(&ToolsConfig::default()).unwrap();
        let out = facade.call("get_logs", &json!({ "region": "NA" })).await;
        assert!(out.is_error);
        assert!(out.text.contains("start"));

        let out = facade.call("drop_table", &json!({})).await;
        assert_eq!(out, ToolOutcome::error("unknown tool: drop_table"));
    }
}
