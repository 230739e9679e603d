//! Chat model abstraction with structured tool calling
//!
//! One `complete` call is one model turn. Multi-step continuation (feeding
//! tool results back and deciding when to stop) is driven by the caller.

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Message author
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Parsed JSON arguments; a non-object value means the model sent malformed JSON
    pub arguments: serde_json::Value,
}

/// One entry of the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Tool exposed to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

/// A single completion request
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

/// Model output for one turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

/// Trait for chat completion backends
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one model turn
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat completions client
pub struct OpenAIChatModel {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef<'a>,
}

#[derive(Serialize)]
struct WireFunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded arguments
    arguments: String,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let tool_calls = if message.tool_calls.is_empty() {
            None
        } else {
            Some(
                message
                    .tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        kind: function_kind(),
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect(),
            )
        };

        Self {
            role: message.role,
            content: message.content.clone(),
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(call: WireToolCall) -> Self {
        let arguments = serde_json::from_str(&call.function.arguments)
            .unwrap_or(serde_json::Value::String(call.function.arguments));
        Self {
            id: call.id,
            name: call.function.name,
            arguments,
        }
    }
}

impl OpenAIChatModel {
    /// Create a new client
    pub fn new(api_key: String, config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let body = WireRequest {
            model: &self.config.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request
                .tools
                .iter()
                .map(|tool| WireTool {
                    kind: "function",
                    function: WireFunctionDef {
                        name: &tool.name,
                        description: &tool.description,
                        parameters: &tool.parameters,
                    },
                })
                .collect(),
            tool_choice: if request.tools.is_empty() { None } else { Some("auto") },
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: request.temperature.unwrap_or(self.config.temperature),
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LlmError {
                message: format!("Chat API request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::LlmError {
                message: format!("Chat API error {}: {}", status, body),
            });
        }

        let parsed: WireResponse = response.json().await.map_err(|e| AppError::LlmError {
            message: format!("Failed to parse chat response: {}", e),
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LlmError {
                message: "Empty response from chat model".to_string(),
            })?;

        Ok(ChatResponse {
            text: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(ToolCall::from)
                .collect(),
            finish_reason: choice.finish_reason,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let start = Instant::now();
        let result = self.send(request).await;
        metrics::record_llm(start.elapsed().as_secs_f64(), &self.config.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Offline chat model for development; never calls tools
pub struct MockChatModel;

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let question = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .and_then(|m| m.content.as_deref())
            .unwrap_or_default();

        Ok(ChatResponse {
            text: format!(
                "Op basis van de beschikbare context kan de vraag \"{}\" niet volledig worden beantwoord. \
                [Mock response - LLM API key not configured]",
                question.lines().next().unwrap_or_default()
            ),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

/// Create a chat model based on configuration
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: "llm.api_key is required for the openai provider".to_string(),
            })?;
            Ok(Arc::new(OpenAIChatModel::new(key, config.clone())?))
        }
        "mock" => Ok(Arc::new(MockChatModel)),
        other => {
            tracing::warn!(provider = other, "Unknown chat provider, using mock");
            Ok(Arc::new(MockChatModel))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_message_encodes_tool_calls() {
        let message = ChatMessage::assistant(
            None,
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "search_bouwbesluit".to_string(),
                arguments: json!({"query": "Tabel 4.162"}),
            }],
        );

        let wire = serde_json::to_value(WireMessage::from(&message)).unwrap();
        assert_eq!(wire["role"], "assistant");
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "search_bouwbesluit");
        assert_eq!(
            wire["tool_calls"][0]["function"]["arguments"],
            "{\"query\":\"Tabel 4.162\"}"
        );
    }

    #[test]
    fn test_tool_result_message() {
        let wire = serde_json::to_value(WireMessage::from(&ChatMessage::tool("call_1", "ok"))).unwrap();
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_1");
        assert!(wire.get("tool_calls").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "provide_answer", "arguments": "{\"answer\":\"2,6 m\",\"confidence\":\"high\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let parsed: WireResponse = serde_json::from_value(raw).unwrap();
        let choice = parsed.choices.into_iter().next().unwrap();
        let calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap()
            .into_iter()
            .map(ToolCall::from)
            .collect();

        assert_eq!(calls[0].name, "provide_answer");
        assert_eq!(calls[0].arguments["confidence"], "high");
    }

    #[test]
    fn test_malformed_arguments_kept_as_string() {
        let call = ToolCall::from(WireToolCall {
            id: "c".to_string(),
            kind: function_kind(),
            function: WireFunctionCall {
                name: "search_bouwbesluit".to_string(),
                arguments: "{not json".to_string(),
            },
        });
        assert_eq!(call.arguments, serde_json::Value::String("{not json".to_string()));
    }

    #[tokio::test]
    async fn test_mock_chat_model_answers_in_text() {
        let request = ChatRequest {
            messages: vec![ChatMessage::user("Wat is de minimale hoogte?")],
            ..Default::default()
        };
        let response = MockChatModel.complete(&request).await.unwrap();
        assert!(response.tool_calls.is_empty());
        assert!(response.text.contains("Wat is de minimale hoogte?"));
    }
}
