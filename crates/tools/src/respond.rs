//! `respond_to_user`: the explicit "no tool needed" choice.

use async_trait::async_trait;
use chatterbox_core::error::ToolError;
use chatterbox_core::tool::{Tool, ToolResult};

pub struct RespondToUserTool;

#[async_trait]
impl Tool for RespondToUserTool {
    fn name(&self) -> &str {
        "respond_to_user"
    }

    fn description(&self) -> &str {
        "Skips the tool call and sends a message to the user."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text(""))
    }

    fn summarize(&self, _result: &ToolResult) -> String {
        "Null tool call was used.".into()
    }
}
