//! Legal RAG agent
//!
//! A bounded ReAct loop over structured tool calls. Each step is one model
//! turn; the model either searches the corpus (`search_bouwbesluit`) or
//! answers (`provide_answer`). The loop stops when:
//! - an answer was provided
//! - `max_steps - 1` searches have run
//! - the model replies without calling a tool
//! - `max_steps` turns have been used
//!
//! Without an explicit answer but with gathered sources, one extra model
//! call synthesizes an answer from the best sources.

mod prompts;
mod synthesis;
mod tools;

pub use synthesis::{format_preview, synthesis_context, truncate_chars};
pub use tools::{parse_tool_call, tool_definitions, AgentAction, ANSWER_TOOL, SEARCH_TOOL};

use bouwrag_common::config::AgentConfig;
use bouwrag_common::errors::Result;
use bouwrag_common::llm::{ChatMessage, ChatModel, ChatRequest};
use bouwrag_common::metrics;
use bouwrag_search::{MultiHopOptions, MultiHopRetriever, RetrievedChunk};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Confidence label of an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "high" | "hoog" => Some(Confidence::High),
            "medium" | "gemiddeld" => Some(Confidence::Medium),
            "low" | "laag" => Some(Confidence::Low),
            _ => None,
        }
    }
}

/// One tool invocation and its outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStep {
    pub thought: String,
    /// Tool name, or `none` when the model answered in plain text
    pub action: String,
    pub action_input: serde_json::Value,
    pub observation: String,
    pub is_complete: bool,
}

/// Final outcome of an agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub answer: String,
    /// Every chunk returned by a search, deduplicated by chunk id
    pub sources: Vec<RetrievedChunk>,
    pub confidence: Confidence,
    pub steps: Vec<AgentStep>,
    /// Human-readable trace of the run
    pub reasoning: Vec<String>,
    /// True when the answer came from the synthesis fallback
    pub synthesized: bool,
    pub search_count: usize,
    /// Model turns used by the loop; the synthesis call is not counted
    pub turns: usize,
}

/// Options for one agent query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentQueryOptions {
    pub project_id: Uuid,
    pub query: String,
    /// Model-turn budget; defaults to the agent configuration
    pub max_steps: Option<usize>,
}

impl AgentQueryOptions {
    pub fn new(project_id: Uuid, query: impl Into<String>) -> Self {
        Self {
            project_id,
            query: query.into(),
            max_steps: None,
        }
    }
}

/// Per-run accumulators
struct RunState {
    steps: Vec<AgentStep>,
    reasoning: Vec<String>,
    sources: Vec<RetrievedChunk>,
    source_ids: HashSet<Uuid>,
    search_count: usize,
    turns: usize,
    answer: Option<(String, Confidence)>,
    last_text: String,
}

impl RunState {
    fn new() -> Self {
        Self {
            steps: Vec::new(),
            reasoning: Vec::new(),
            sources: Vec::new(),
            source_ids: HashSet::new(),
            search_count: 0,
            turns: 0,
            answer: None,
            last_text: String::new(),
        }
    }

    fn add_sources(&mut self, chunks: &[RetrievedChunk]) {
        for chunk in chunks {
            if self.source_ids.insert(chunk.chunk_id) {
                self.sources.push(chunk.clone());
            }
        }
    }
}

/// Tool-calling agent over the Bouwbesluit corpus
pub struct LegalRagAgent {
    model: Arc<dyn ChatModel>,
    retriever: Arc<MultiHopRetriever>,
    config: AgentConfig,
}

impl LegalRagAgent {
    pub fn new(model: Arc<dyn ChatModel>, retriever: Arc<MultiHopRetriever>, config: AgentConfig) -> Self {
        Self {
            model,
            retriever,
            config,
        }
    }

    /// Answer a query.
    ///
    /// Model failures propagate as errors; search failures are reported to
    /// the model as "no results" and the run continues.
    pub async fn query(&self, options: &AgentQueryOptions) -> Result<AgentResult> {
        let start = Instant::now();
        let max_steps = options.max_steps.unwrap_or(self.config.max_steps).max(1);
        let search_budget = max_steps - 1;

        let tools = tool_definitions();
        let mut messages = vec![
            ChatMessage::system(prompts::SYSTEM_PROMPT),
            ChatMessage::user(prompts::user_prompt(&options.query)),
        ];
        let mut state = RunState::new();

        for turn in 1..=max_steps {
            state.turns = turn;
            let response = self
                .model
                .complete(&ChatRequest {
                    messages: messages.clone(),
                    tools: tools.clone(),
                    ..ChatRequest::default()
                })
                .await?;

            let text = response.text.trim().to_string();

            if response.tool_calls.is_empty() {
                debug!(turn, "Model replied without tool calls");
                if !text.is_empty() {
                    state.last_text = text.clone();
                }
                state.reasoning.push(format!("Stap {}: {}", turn, text));
                state.steps.push(AgentStep {
                    thought: text,
                    action: "none".to_string(),
                    action_input: serde_json::Value::Null,
                    observation: String::new(),
                    is_complete: true,
                });
                break;
            }

            messages.push(ChatMessage::assistant(
                (!text.is_empty()).then(|| text.clone()),
                response.tool_calls.clone(),
            ));

            for call in response.tool_calls {
                let action = parse_tool_call(&call);
                let thought = match &action {
                    Ok(action) if text.is_empty() => action.reasoning().to_string(),
                    _ => text.clone(),
                };

                let (observation, is_complete) = match action {
                    Ok(AgentAction::Search(args)) => {
                        let observation = if state.answer.is_some() {
                            prompts::ANSWER_ALREADY_GIVEN.to_string()
                        } else if state.search_count >= search_budget {
                            prompts::SEARCH_BUDGET_EXHAUSTED.to_string()
                        } else {
                            state.search_count += 1;
                            self.run_search(options.project_id, &args.query, &mut state).await
                        };
                        state
                            .reasoning
                            .push(format!("Stap {}: zoeken naar \"{}\"", turn, args.query));
                        (observation, false)
                    }
                    Ok(AgentAction::Answer(args)) => {
                        if state.answer.is_none() {
                            let confidence = args.confidence();
                            state.reasoning.push(format!(
                                "Stap {}: antwoord gegeven ({})",
                                turn,
                                confidence.as_str()
                            ));
                            state.answer = Some((args.answer, confidence));
                        }
                        (prompts::ANSWER_RECEIVED.to_string(), true)
                    }
                    Err(message) => {
                        warn!(tool = %call.name, error = %message, "Invalid tool call");
                        (prompts::tool_error(&message), false)
                    }
                };

                messages.push(ChatMessage::tool(call.id.clone(), observation.clone()));
                state.steps.push(AgentStep {
                    thought,
                    action: call.name,
                    action_input: call.arguments,
                    observation,
                    is_complete,
                });
            }

            if state.answer.is_some() {
                break;
            }
            if state.search_count >= search_budget {
                debug!(turn, searches = state.search_count, "Search budget reached");
                break;
            }
        }

        let (answer, confidence, synthesized) = match state.answer.take() {
            Some((answer, confidence)) => (answer, confidence, false),
            None if !state.sources.is_empty() => {
                warn!(
                    project_id = %options.project_id,
                    sources = state.sources.len(),
                    "No explicit answer, synthesizing from sources"
                );
                let answer = self.synthesize(&options.query, &state.sources).await?;
                state.reasoning.push(prompts::synthesis_note(
                    state.sources.len().min(self.config.synthesis_chunks),
                ));
                (answer, Confidence::Medium, true)
            }
            None => (std::mem::take(&mut state.last_text), Confidence::Low, false),
        };

        metrics::record_agent_run(state.turns, confidence.as_str(), synthesized);
        info!(
            project_id = %options.project_id,
            turns = state.turns,
            steps = state.steps.len(),
            searches = state.search_count,
            sources = state.sources.len(),
            confidence = confidence.as_str(),
            synthesized,
            latency_ms = start.elapsed().as_millis() as u64,
            "Agent query completed"
        );

        Ok(AgentResult {
            answer,
            sources: state.sources,
            confidence,
            steps: state.steps,
            reasoning: state.reasoning,
            synthesized,
            search_count: state.search_count,
            turns: state.turns,
        })
    }

    async fn run_search(&self, project_id: Uuid, query: &str, state: &mut RunState) -> String {
        let options = MultiHopOptions::new(project_id, query);
        match self.retriever.multi_hop_retrieve(&options).await {
            Ok(chunks) if chunks.is_empty() => prompts::NO_RESULTS.to_string(),
            Ok(chunks) => {
                state.add_sources(&chunks);
                format_preview(&chunks, self.config.preview_chunks, self.config.preview_chars)
            }
            Err(e) => {
                warn!(project_id = %project_id, query, error = %e, "Search tool failed");
                prompts::NO_RESULTS.to_string()
            }
        }
    }

    async fn synthesize(&self, query: &str, sources: &[RetrievedChunk]) -> Result<String> {
        let context = synthesis_context(
            sources,
            self.config.synthesis_chunks,
            self.config.synthesis_chars,
        );
        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(prompts::SYNTHESIS_SYSTEM_PROMPT),
                ChatMessage::user(prompts::synthesis_prompt(query, &context)),
            ],
            ..ChatRequest::default()
        };
        let response = self.model.complete(&request).await?;
        Ok(response.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bouwrag_common::config::{MultiHopConfig, RetrievalConfig};
    use bouwrag_common::db::models::ChunkRecord;
    use bouwrag_common::errors::AppError;
    use bouwrag_common::llm::{ChatResponse, ToolCall};
    use bouwrag_common::Embedder;
    use bouwrag_search::{ContentRetriever, MemoryChunkStore};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const DIMENSION: usize = 4;

    /// Same vector for every text, so every chunk matches every search
    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.5; DIMENSION])
        }

        fn model_name(&self) -> &str {
            "flat"
        }

        fn dimension(&self) -> usize {
            DIMENSION
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AppError::EmbeddingError {
                message: "service unavailable".into(),
            })
        }

        fn model_name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            DIMENSION
        }
    }

    /// Replays queued responses, then answers in plain text
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<ChatResponse>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<ChatResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(ChatResponse {
                        text: "Gesynthetiseerd antwoord [1]".into(),
                        ..ChatResponse::default()
                    })
                })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn tool_response(calls: Vec<(&str, serde_json::Value)>) -> Result<ChatResponse> {
        Ok(ChatResponse {
            text: String::new(),
            tool_calls: calls
                .into_iter()
                .enumerate()
                .map(|(i, (name, arguments))| ToolCall {
                    id: format!("call_{}", i),
                    name: name.to_string(),
                    arguments,
                })
                .collect(),
            finish_reason: Some("tool_calls".into()),
        })
    }

    fn search(query: &str) -> (&'static str, serde_json::Value) {
        (SEARCH_TOOL, json!({"query": query, "reasoning": "informatie zoeken"}))
    }

    fn answer(text: &str, confidence: &str) -> (&'static str, serde_json::Value) {
        (
            ANSWER_TOOL,
            json!({"answer": text, "confidence": confidence, "reasoning": "bron gevonden"}),
        )
    }

    fn chunk(project_id: Uuid, index: i32, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: Uuid::new_v4(),
            project_id,
            file_id: Uuid::nil(),
            chunk_index: index,
            text: text.into(),
            source_file: "bouwbesluit.pdf".into(),
            page_number: Some(index + 10),
            section_title: None,
            embedding: vec![0.5; DIMENSION],
        }
    }

    async fn agent_with(
        model: Arc<ScriptedModel>,
        embedder: Arc<dyn Embedder>,
    ) -> (LegalRagAgent, Uuid) {
        let project = Uuid::new_v4();
        let store = MemoryChunkStore::new();
        store
            .insert_many(vec![
                chunk(project, 0, "Artikel 4.163\nDe vrije hoogte is ten minste 2,6 m."),
                chunk(project, 1, "Tabel 4.162\n| Functie | Hoogte |\n| --- | --- |\n| woonfunctie | 2,6 m |"),
            ])
            .await;
        let retriever = ContentRetriever::new(
            Arc::new(store),
            embedder,
            RetrievalConfig::default(),
            DIMENSION,
        );
        let multi_hop = MultiHopRetriever::new(Arc::new(retriever), MultiHopConfig::default());
        let agent = LegalRagAgent::new(model, Arc::new(multi_hop), AgentConfig::default());
        (agent, project)
    }

    #[tokio::test]
    async fn test_answer_at_first_step_stops_loop() {
        let model = ScriptedModel::new(vec![tool_response(vec![answer("2,6 m volgens tabel 4.162", "high")])]);
        let (agent, project) = agent_with(model.clone(), Arc::new(FlatEmbedder)).await;

        let result = agent
            .query(&AgentQueryOptions {
                max_steps: Some(5),
                ..AgentQueryOptions::new(project, "Wat is de minimale vrije hoogte?")
            })
            .await
            .unwrap();

        assert_eq!(result.answer, "2,6 m volgens tabel 4.162");
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.steps.len(), 1);
        assert!(result.steps[0].is_complete);
        assert_eq!(result.search_count, 0);
        assert!(!result.synthesized);
        assert_eq!(model.request_count(), 1);
    }

    #[tokio::test]
    async fn test_search_budget_then_synthesis() {
        let model = ScriptedModel::new(vec![
            tool_response(vec![search("vrije hoogte woonfunctie")]),
            tool_response(vec![search("Tabel 4.162")]),
            tool_response(vec![search("nog een zoekvraag")]),
        ]);
        let (agent, project) = agent_with(model.clone(), Arc::new(FlatEmbedder)).await;

        let result = agent
            .query(&AgentQueryOptions {
                max_steps: Some(3),
                ..AgentQueryOptions::new(project, "Wat is de minimale vrije hoogte?")
            })
            .await
            .unwrap();

        assert_eq!(result.search_count, 2);
        assert!(result.synthesized);
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.answer, "Gesynthetiseerd antwoord [1]");
        // two agent turns plus the synthesis call
        assert_eq!(result.turns, 2);
        assert_eq!(model.request_count(), 3);
        // both searches return the same two chunks
        assert_eq!(result.sources.len(), 2);
        assert!(result.reasoning.last().unwrap().contains("gesynthetiseerd"));
    }

    #[tokio::test]
    async fn test_excess_searches_in_one_turn_are_refused() {
        let model = ScriptedModel::new(vec![tool_response(vec![
            search("een"),
            search("twee"),
            search("drie"),
        ])]);
        let (agent, project) = agent_with(model.clone(), Arc::new(FlatEmbedder)).await;

        let result = agent
            .query(&AgentQueryOptions {
                max_steps: Some(3),
                ..AgentQueryOptions::new(project, "hoogte")
            })
            .await
            .unwrap();

        assert_eq!(result.search_count, 2);
        assert_eq!(result.steps.len(), 3);
        assert_eq!(result.turns, 1);
        assert_eq!(result.steps[2].observation, prompts::SEARCH_BUDGET_EXHAUSTED);
    }

    #[tokio::test]
    async fn test_search_failure_becomes_observation() {
        let model = ScriptedModel::new(vec![
            tool_response(vec![search("vrije hoogte")]),
            tool_response(vec![answer("Niet gevonden in de bronnen.", "low")]),
        ]);
        let (agent, project) = agent_with(model, Arc::new(FailingEmbedder)).await;

        let result = agent
            .query(&AgentQueryOptions::new(project, "Wat is de minimale vrije hoogte?"))
            .await
            .unwrap();

        assert_eq!(result.steps[0].observation, prompts::NO_RESULTS);
        assert!(result.sources.is_empty());
        assert_eq!(result.answer, "Niet gevonden in de bronnen.");
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = ScriptedModel::new(vec![Err(AppError::LlmError {
            message: "rate limited".into(),
        })]);
        let (agent, project) = agent_with(model, Arc::new(FlatEmbedder)).await;

        let result = agent.query(&AgentQueryOptions::new(project, "hoogte")).await;
        assert!(matches!(result, Err(AppError::LlmError { .. })));
    }

    #[tokio::test]
    async fn test_plain_text_reply_without_sources() {
        let model = ScriptedModel::new(vec![Ok(ChatResponse {
            text: "Daar kan ik geen antwoord op geven.".into(),
            ..ChatResponse::default()
        })]);
        let (agent, project) = agent_with(model.clone(), Arc::new(FlatEmbedder)).await;

        let result = agent
            .query(&AgentQueryOptions::new(project, "Wie won het WK?"))
            .await
            .unwrap();

        assert_eq!(result.answer, "Daar kan ik geen antwoord op geven.");
        assert_eq!(result.confidence, Confidence::Low);
        assert!(!result.synthesized);
        assert_eq!(result.turns, 1);
        assert_eq!(model.request_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_gets_error_observation() {
        let model = ScriptedModel::new(vec![
            tool_response(vec![("delete_everything", json!({}))]),
            tool_response(vec![answer("2,6 m", "medium")]),
        ]);
        let (agent, project) = agent_with(model, Arc::new(FlatEmbedder)).await;

        let result = agent
            .query(&AgentQueryOptions::new(project, "hoogte"))
            .await
            .unwrap();

        assert!(result.steps[0].observation.starts_with("Fout:"));
        assert_eq!(result.answer, "2,6 m");
        assert_eq!(result.steps.len(), 2);
    }

    #[test]
    fn test_confidence_parse() {
        assert_eq!(Confidence::parse(" High "), Some(Confidence::High));
        assert_eq!(Confidence::parse("laag"), Some(Confidence::Low));
        assert_eq!(Confidence::parse("zeker"), None);
    }
}
