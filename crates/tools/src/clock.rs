//! `get_current_time`: the current UTC time as an RFC 3339 string.

use async_trait::async_trait;
use chatterbox_core::error::ToolError;
use chatterbox_core::tool::{Tool, ToolResult};
use chrono::{DateTime, SecondsFormat, Utc};

pub struct CurrentTimeTool {
    now: fn() -> DateTime<Utc>,
}

impl CurrentTimeTool {
    pub fn new() -> Self {
        Self { now: Utc::now }
    }

    /// Use a fixed clock (tests).
    pub fn with_clock(now: fn() -> DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Returns the current time in UTC. To be used only when a chat user asks for the current time."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let now = (self.now)();
        Ok(ToolResult::text(now.to_rfc3339_opts(SecondsFormat::Secs, true)))
    }
}
