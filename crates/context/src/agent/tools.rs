//! Tools exposed to the chat model

use super::prompts;
use super::Confidence;
use bouwrag_common::llm::{ToolCall, ToolDefinition};
use serde::Deserialize;
use serde_json::json;

pub const SEARCH_TOOL: &str = "search_bouwbesluit";
pub const ANSWER_TOOL: &str = "provide_answer";

#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerArgs {
    pub answer: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub reasoning: String,
}

impl AnswerArgs {
    /// Reported confidence; anything unrecognised counts as medium
    pub fn confidence(&self) -> Confidence {
        Confidence::parse(&self.confidence).unwrap_or(Confidence::Medium)
    }
}

/// A validated tool call
#[derive(Debug, Clone)]
pub enum AgentAction {
    Search(SearchArgs),
    Answer(AnswerArgs),
}

impl AgentAction {
    pub fn reasoning(&self) -> &str {
        match self {
            AgentAction::Search(args) => &args.reasoning,
            AgentAction::Answer(args) => &args.reasoning,
        }
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: SEARCH_TOOL.to_string(),
            description: prompts::SEARCH_TOOL_DESCRIPTION.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": prompts::SEARCH_QUERY_DESCRIPTION
                    },
                    "reasoning": {
                        "type": "string",
                        "description": prompts::REASONING_DESCRIPTION
                    }
                },
                "required": ["query", "reasoning"]
            }),
        },
        ToolDefinition {
            name: ANSWER_TOOL.to_string(),
            description: prompts::ANSWER_TOOL_DESCRIPTION.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "answer": {
                        "type": "string",
                        "description": "Het volledige antwoord met bronvermelding."
                    },
                    "confidence": {
                        "type": "string",
                        "enum": ["high", "medium", "low"],
                        "description": "Hoe zeker het antwoord wordt gedragen door de bronnen."
                    },
                    "reasoning": {
                        "type": "string",
                        "description": prompts::REASONING_DESCRIPTION
                    }
                },
                "required": ["answer", "confidence", "reasoning"]
            }),
        },
    ]
}

/// Validate a model tool call.
///
/// The error string is sent back to the model as the observation.
pub fn parse_tool_call(call: &ToolCall) -> Result<AgentAction, String> {
    if !call.arguments.is_object() {
        return Err(format!("argumenten voor {} zijn geen geldig JSON-object", call.name));
    }

    match call.name.as_str() {
        SEARCH_TOOL => {
            let args: SearchArgs = serde_json::from_value(call.arguments.clone())
                .map_err(|e| format!("ongeldige argumenten voor {}: {}", SEARCH_TOOL, e))?;
            if args.query.trim().is_empty() {
                return Err("zoekvraag mag niet leeg zijn".to_string());
            }
            Ok(AgentAction::Search(args))
        }
        ANSWER_TOOL => {
            let args: AnswerArgs = serde_json::from_value(call.arguments.clone())
                .map_err(|e| format!("ongeldige argumenten voor {}: {}", ANSWER_TOOL, e))?;
            Ok(AgentAction::Answer(args))
        }
        other => Err(format!("onbekende tool '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments,
        }
    }

    #[test]
    fn test_definitions() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![SEARCH_TOOL, ANSWER_TOOL]);
        assert_eq!(tools[1].parameters["properties"]["confidence"]["enum"][0], "high");
    }

    #[test]
    fn test_parse_search() {
        let action = parse_tool_call(&call(
            SEARCH_TOOL,
            json!({"query": "Tabel 4.162", "reasoning": "verwijzing volgen"}),
        ))
        .unwrap();
        assert!(matches!(action, AgentAction::Search(ref args) if args.query == "Tabel 4.162"));
        assert_eq!(action.reasoning(), "verwijzing volgen");
    }

    #[test]
    fn test_parse_answer_confidence() {
        let action = parse_tool_call(&call(
            ANSWER_TOOL,
            json!({"answer": "2,6 m", "confidence": "HIGH"}),
        ))
        .unwrap();
        match action {
            AgentAction::Answer(args) => assert_eq!(args.confidence(), Confidence::High),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_calls() {
        assert!(parse_tool_call(&call("delete_all", json!({}))).is_err());
        assert!(parse_tool_call(&call(SEARCH_TOOL, json!("{not json"))).is_err());
        assert!(parse_tool_call(&call(SEARCH_TOOL, json!({"query": "  "}))).is_err());
        assert!(parse_tool_call(&call(ANSWER_TOOL, json!({"confidence": "high"}))).is_err());
    }
}
