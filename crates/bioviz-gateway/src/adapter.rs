//! Adapter from a model client's wire reply to an [`ActionRequest`].
//!
//! The assistant message of an OpenAI-style chat completion carries optional
//! text content and zero or more tool calls whose arguments arrive as a raw
//! string. The gateway processes at most one capability request per decision
//! cycle: the first call is honored, the rest are dropped with a warning.

use serde::Deserialize;

use crate::types::ActionRequest;

/// Assistant message as returned by an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelReply {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw serialized arguments, untrusted and possibly malformed.
    #[serde(default)]
    pub arguments: String,
}

impl ModelReply {
    /// Reduce this reply to the single action request the gateway processes.
    pub fn into_request(self) -> ActionRequest {
        let mut calls = self.tool_calls.into_iter();
        match calls.next() {
            Some(first) => {
                let ignored: Vec<String> = calls.map(|c| c.function.name).collect();
                if !ignored.is_empty() {
                    tracing::warn!(
                        count = ignored.len(),
                        ignored = ?ignored,
                        "Model requested multiple tool calls; honoring only the first"
                    );
                }
                ActionRequest {
                    response_text: self.content,
                    capability_name: Some(first.function.name),
                    raw_arguments: first.function.arguments,
                }
            }
            None => ActionRequest {
                response_text: self.content,
                capability_name: None,
                raw_arguments: String::new(),
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_only_reply() {
        let reply: ModelReply =
            serde_json::from_str(r#"{"content": "The pathway is enriched."}"#).unwrap();
        let request = reply.into_request();
        assert_eq!(request.response_text.as_deref(), Some("The pathway is enriched."));
        assert!(request.capability_name.is_none());
    }

    #[test]
    fn test_single_tool_call() {
        let reply: ModelReply = serde_json::from_str(
            r#"{
                "content": null,
                "tool_calls": [
                    {"function": {"name": "render_pathway", "arguments": "{\"pathway_id\":\"hsa04210\"}"}}
                ]
            }"#,
        )
        .unwrap();
        let request = reply.into_request();
        assert_eq!(request.capability_name.as_deref(), Some("render_pathway"));
        assert!(request.raw_arguments.contains("hsa04210"));
    }

    #[test]
    fn test_multiple_tool_calls_first_wins() {
        let reply: ModelReply = serde_json::from_str(
            r#"{
                "tool_calls": [
                    {"function": {"name": "update_thresholds", "arguments": "{}"}},
                    {"function": {"name": "export_data", "arguments": "{}"}},
                    {"function": {"name": "render_pathway", "arguments": "{}"}}
                ]
            }"#,
        )
        .unwrap();
        let request = reply.into_request();
        assert_eq!(request.capability_name.as_deref(), Some("update_thresholds"));
    }

    #[test]
    fn test_missing_arguments_default_to_empty() {
        let reply: ModelReply = serde_json::from_str(
            r#"{"tool_calls": [{"function": {"name": "list_pathways"}}]}"#,
        )
        .unwrap();
        let request = reply.into_request();
        assert_eq!(request.capability_name.as_deref(), Some("list_pathways"));
        assert!(request.raw_arguments.is_empty());
    }

    #[test]
    fn test_empty_reply() {
        let reply: ModelReply = serde_json::from_str("{}").unwrap();
        let request = reply.into_request();
        assert!(request.response_text.is_none());
        assert!(request.capability_name.is_none());
    }

    #[test]
    fn test_malformed_arguments_pass_through_untouched() {
        // The adapter does not validate arguments; that is the engine's job
        let reply: ModelReply = serde_json::from_str(
            r#"{"tool_calls": [{"function": {"name": "render_pathway", "arguments": "{bad json"}}]}"#,
        )
        .unwrap();
        let request = reply.into_request();
        assert_eq!(request.raw_arguments, "{bad json");
    }
}
