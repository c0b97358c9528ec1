// orchestrator/src/graph.rs

use agent_tools::{builtin_registry, ToolRegistry, ToolSettings};
use common_utils::{AppConfig, AssistantVariant, ClassifierPolicy, DEFAULT_MODEL};
use router_core::{
    Command, ConversationSummary, LlmClient, Message, Response, RouteDecision, SessionStore, ToolCallRequest,
    ToolResult,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::TurnError;
use crate::experts::classifier::Classifier;
use crate::llm::OpenAiClient;
use crate::locks::ConversationLocks;
use crate::prompts::{round_cap_answer, InstructionSets};
use crate::stats::{Stats, StatsSnapshot};
use crate::turn_executor::{ModelSettings, TurnExecutor};

/// Nodes of the per-turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Start,
    Classify,
    Generate,
    DispatchTools,
    End,
}

/// What a completed turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub conversation_id: String,
    pub answer: String,
    /// Only set by the routed variant.
    pub route: Option<RouteDecision>,
    pub tool_rounds: usize,
    pub hit_round_cap: bool,
    /// Everything appended to the conversation by this turn, user message first.
    pub new_messages: Vec<Message>,
}

pub struct OrchestratorBuilder {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn SessionStore>,
    variant: AssistantVariant,
    instructions: InstructionSets,
    tools: ToolRegistry,
    chat: ModelSettings,
    classifier_model: String,
    classifier_policy: ClassifierPolicy,
    max_tool_rounds: usize,
    llm_timeout: Duration,
}

impl OrchestratorBuilder {
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            llm,
            store,
            variant: AssistantVariant::Tools,
            instructions: InstructionSets::default(),
            tools: ToolRegistry::new(),
            chat: ModelSettings {
                model: DEFAULT_MODEL.to_string(),
                temperature: 0.7,
                max_tokens: 2048,
            },
            classifier_model: DEFAULT_MODEL.to_string(),
            classifier_policy: ClassifierPolicy::Strict,
            max_tool_rounds: 10,
            llm_timeout: Duration::from_secs(60),
        }
    }

    pub fn variant(mut self, variant: AssistantVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn instructions(mut self, instructions: InstructionSets) -> Self {
        self.instructions = instructions;
        self
    }

    /// Tools declared to the model on every generation call.
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn chat_model(mut self, settings: ModelSettings) -> Self {
        self.chat = settings;
        self
    }

    pub fn classifier(mut self, model: &str, policy: ClassifierPolicy) -> Self {
        self.classifier_model = model.to_string();
        self.classifier_policy = policy;
        self
    }

    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            classifier: Classifier::new(
                self.llm.clone(),
                &self.classifier_model,
                self.classifier_policy,
                self.llm_timeout,
            ),
            executor: TurnExecutor::new(self.llm, self.chat, self.llm_timeout),
            variant: self.variant,
            instructions: self.instructions,
            tools: self.tools,
            store: self.store,
            max_tool_rounds: self.max_tool_rounds,
            locks: ConversationLocks::default(),
            stats: Stats::default(),
        }
    }
}

/// Drives one conversation turn from the user's text to a final
/// assistant answer and persists it.
pub struct Orchestrator {
    variant: AssistantVariant,
    instructions: InstructionSets,
    classifier: Classifier,
    executor: TurnExecutor,
    tools: ToolRegistry,
    store: Arc<dyn SessionStore>,
    max_tool_rounds: usize,
    locks: ConversationLocks,
    stats: Stats,
}

impl Orchestrator {
    pub fn builder(llm: Arc<dyn LlmClient>, store: Arc<dyn SessionStore>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(llm, store)
    }

    /// Wires the OpenAI-compatible client and, for the tool-augmented
    /// variant, the builtin tools.
    pub fn from_config(config: &AppConfig, store: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        let llm = OpenAiClient::new(&config.llm_base_url, config.llm_api_key.clone(), config.llm_timeout)?;
        if config.llm_api_key.is_none() {
            warn!("[Orchestrator] No API key configured; requests go out unauthenticated");
        }

        let tools = match config.variant {
            AssistantVariant::Tools => builtin_registry(&ToolSettings {
                weather_default_city: config.weather_default_city.clone(),
                search_top_k: config.search_top_k,
                timeout: config.tool_timeout,
            }),
            AssistantVariant::Routed => ToolRegistry::new(),
        };

        Ok(Self::builder(Arc::new(llm), store)
            .variant(config.variant)
            .tools(tools)
            .chat_model(ModelSettings {
                model: config.chat_model.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            })
            .classifier(&config.classifier_model, config.classifier_policy)
            .max_tool_rounds(config.max_tool_rounds)
            .llm_timeout(config.llm_timeout)
            .build())
    }

    pub fn variant(&self) -> AssistantVariant {
        self.variant
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn process_command(&self, command: Command) -> Result<Response, TurnError> {
        match command {
            Command::ProcessText { conversation_id, text } => {
                let outcome = self.handle_turn(&conversation_id, &text).await?;
                Ok(Response::Text {
                    conversation_id: outcome.conversation_id,
                    text: outcome.answer,
                })
            }
        }
    }

    /// Runs one turn. Nothing is written unless the turn reaches `End`.
    pub async fn handle_turn(&self, conversation_id: &str, user_text: &str) -> Result<TurnOutcome, TurnError> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(TurnError::EmptyQuery);
        }

        let result = {
            let entry = self.locks.acquire(conversation_id);
            let _guard = entry.lock().await;
            self.run_graph(conversation_id, text).await
        };

        if let Err(e) = &result {
            warn!("[Orchestrator] Turn on '{}' failed: {}", conversation_id, e);
        }
        result
    }

    async fn run_graph(&self, conversation_id: &str, text: &str) -> Result<TurnOutcome, TurnError> {
        let history = self.store.read(conversation_id).await?;
        debug!(
            "[Orchestrator] Loaded {} stored messages for '{}'",
            history.len(),
            conversation_id
        );

        let mut turn = vec![Message::user(text)];
        let mut system = self.instructions.tool_agent.as_str();
        let mut route = None;
        let mut pending: Vec<ToolCallRequest> = Vec::new();
        let mut rounds = 0;
        let mut tool_calls = 0;
        let mut hit_round_cap = false;
        let mut state = GraphState::Start;

        while state != GraphState::End {
            let next = match state {
                GraphState::Start => match self.variant {
                    AssistantVariant::Routed => GraphState::Classify,
                    AssistantVariant::Tools => GraphState::Generate,
                },
                GraphState::Classify => {
                    let decision = self.classifier.classify(&self.instructions, text).await?;
                    system = self.instructions.for_route(decision);
                    route = Some(decision);
                    GraphState::Generate
                }
                GraphState::Generate => {
                    let mut messages = Vec::with_capacity(history.len() + turn.len() + 1);
                    messages.push(Message::system(system));
                    messages.extend(history.iter().cloned());
                    messages.extend(turn.iter().cloned());

                    let reply = self.executor.run_turn(&messages, &self.tools).await?;
                    if !reply.has_tool_calls() {
                        turn.push(reply);
                        GraphState::End
                    } else if rounds >= self.max_tool_rounds {
                        warn!(
                            "[Orchestrator] '{}' still requesting tools after {} rounds; stopping",
                            conversation_id, rounds
                        );
                        hit_round_cap = true;
                        turn.push(Message::assistant(round_cap_answer(rounds)));
                        GraphState::End
                    } else {
                        pending = reply.tool_calls.clone();
                        turn.push(reply);
                        GraphState::DispatchTools
                    }
                }
                GraphState::DispatchTools => {
                    let calls = std::mem::take(&mut pending);
                    rounds += 1;
                    tool_calls += calls.len();
                    let results = self.tools.dispatch_all(&calls).await;
                    turn.extend(results.into_iter().map(ToolResult::into_message));
                    GraphState::Generate
                }
                GraphState::End => GraphState::End,
            };
            info!(
                "[Orchestrator] '{}': {:?} -> {:?}",
                conversation_id, state, next
            );
            state = next;
        }

        self.store.append_all(conversation_id, &turn).await?;
        self.stats.record_turn(route, tool_calls, hit_round_cap);

        let answer = turn
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(TurnOutcome {
            conversation_id: conversation_id.to_string(),
            answer,
            route,
            tool_rounds: rounds,
            hit_round_cap,
            new_messages: turn,
        })
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, TurnError> {
        Ok(self.store.list_conversations().await?)
    }

    pub async fn history(&self, conversation_id: &str) -> Result<Vec<Message>, TurnError> {
        Ok(self.store.read(conversation_id).await?)
    }

    /// Waits for any in-flight turn on the conversation before deleting it.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), TurnError> {
        let result = {
            let entry = self.locks.acquire(conversation_id);
            let _guard = entry.lock().await;
            self.store.delete(conversation_id).await
        };
        result?;
        info!("[Orchestrator] Deleted conversation '{}'", conversation_id);
        Ok(())
    }
}
