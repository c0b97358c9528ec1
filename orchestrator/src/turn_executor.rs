// orchestrator/src/turn_executor.rs

use agent_tools::ToolRegistry;
use router_core::{validate_history, LlmClient, LlmRequest, Message};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::TurnError;
use crate::llm::complete_with_timeout;

/// Sampling parameters for generation calls.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Stateless: one LLM call per `run_turn`, safe to call repeatedly with a
/// growing history.
pub struct TurnExecutor {
    llm: Arc<dyn LlmClient>,
    settings: ModelSettings,
    timeout: Duration,
}

impl TurnExecutor {
    pub fn new(llm: Arc<dyn LlmClient>, settings: ModelSettings, timeout: Duration) -> Self {
        Self { llm, settings, timeout }
    }

    /// Sends the whole history plus the registry's declared tools and returns
    /// the single assistant reply. Malformed histories fail before the call.
    pub async fn run_turn(&self, messages: &[Message], tools: &ToolRegistry) -> Result<Message, TurnError> {
        validate_history(messages)?;

        let request = LlmRequest::new(&self.settings.model, messages.to_vec())
            .with_tools(tools.definitions())
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);
        debug!(
            "[TurnExecutor] Calling '{}' with {} messages and {} tools",
            self.llm.name(),
            messages.len(),
            tools.len()
        );

        let reply = complete_with_timeout(self.llm.as_ref(), request, self.timeout).await?;
        if !reply.has_tool_calls() && reply.content.trim().is_empty() {
            return Err(TurnError::Llm(router_core::LlmError::EmptyResponse));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use router_core::{HistoryError, LlmError, ToolCallRequest};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        reply: Message,
    }

    #[async_trait]
    impl LlmClient for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, _request: LlmRequest) -> Result<Message, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    fn executor(reply: Message) -> (Arc<Counting>, TurnExecutor) {
        let llm = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            reply,
        });
        let settings = ModelSettings {
            model: "m".into(),
            temperature: 0.2,
            max_tokens: 64,
        };
        (llm.clone(), TurnExecutor::new(llm, settings, Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn dangling_tool_calls_fail_before_the_llm_is_called() {
        let (llm, executor) = executor(Message::assistant("hi"));
        let history = vec![
            Message::user("weather?"),
            Message::assistant_tool_calls(vec![ToolCallRequest::new("a", "get_weather", json!({}))]),
        ];
        let err = executor.run_turn(&history, &ToolRegistry::new()).await.unwrap_err();
        assert!(matches!(err, TurnError::MalformedHistory(HistoryError::UnansweredToolCalls(_))));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn returns_the_single_assistant_reply() {
        let (llm, executor) = executor(Message::assistant("Hello there"));
        let reply = executor
            .run_turn(&[Message::user("hi")], &ToolRegistry::new())
            .await
            .unwrap();
        assert!(reply.is_final_answer());
        assert_eq!(reply.content, "Hello there");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_final_answer_is_an_error() {
        let (_, executor) = executor(Message::assistant("  "));
        let err = executor
            .run_turn(&[Message::user("hi")], &ToolRegistry::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Llm(LlmError::EmptyResponse)));
    }
}
