// orchestrator/src/experts/classifier.rs

use common_utils::ClassifierPolicy;
use router_core::{LlmClient, LlmError, LlmRequest, RouteDecision};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::llm::complete_with_timeout;
use crate::prompts::{get_classification_messages, InstructionSets};

/// Labels read as "this is a coding question".
pub const POSITIVE_LABELS: [&str; 3] = ["true", "yes", "1"];

/// Maps the model's raw answer to a route.
///
/// `Strict` is an exact, case-sensitive allow-list match, so `"True"` or
/// `"yes please"` route to `General`.
pub fn parse_route_label(raw: &str, policy: ClassifierPolicy) -> RouteDecision {
    let is_positive = match policy {
        ClassifierPolicy::Strict => POSITIVE_LABELS.contains(&raw),
        ClassifierPolicy::Lenient => {
            let normalized = raw
                .trim()
                .trim_matches(|c: char| c == '`' || c == '"' || c == '\'')
                .trim_end_matches(|c: char| c == '.' || c == '!')
                .to_lowercase();
            POSITIVE_LABELS.contains(&normalized.as_str())
        }
    };
    if is_positive {
        RouteDecision::Coding
    } else {
        RouteDecision::General
    }
}

pub struct Classifier {
    llm: Arc<dyn LlmClient>,
    model: String,
    policy: ClassifierPolicy,
    timeout: Duration,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmClient>, model: &str, policy: ClassifierPolicy, timeout: Duration) -> Self {
        Self {
            llm,
            model: model.to_string(),
            policy,
            timeout,
        }
    }

    /// One model call; anything outside the accepted labels is `General`.
    pub async fn classify(&self, instructions: &InstructionSets, query: &str) -> Result<RouteDecision, LlmError> {
        let request = LlmRequest::new(&self.model, get_classification_messages(instructions, query))
            .with_temperature(0.0)
            .with_max_tokens(8);
        let reply = complete_with_timeout(self.llm.as_ref(), request, self.timeout).await?;
        debug!("[Classifier] Raw label: {:?}", reply.content);

        let route = parse_route_label(&reply.content, self.policy);
        info!("[Classifier] Route decided: {}", route);
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use router_core::{Message, Role};
    use std::sync::Mutex;

    #[test]
    fn strict_policy_is_an_exact_allow_list() {
        for label in ["true", "yes", "1"] {
            assert_eq!(parse_route_label(label, ClassifierPolicy::Strict), RouteDecision::Coding);
        }
        for label in ["True", "YES", " true", "true\n", "yes please", "false", ""] {
            assert_eq!(parse_route_label(label, ClassifierPolicy::Strict), RouteDecision::General);
        }
    }

    #[test]
    fn lenient_policy_normalizes_case_and_punctuation() {
        for label in ["True", " YES.\n", "`true`", "\"1\""] {
            assert_eq!(parse_route_label(label, ClassifierPolicy::Lenient), RouteDecision::Coding);
        }
        assert_eq!(parse_route_label("yes please", ClassifierPolicy::Lenient), RouteDecision::General);
        assert_eq!(parse_route_label("False", ClassifierPolicy::Lenient), RouteDecision::General);
    }

    struct FixedLabel {
        label: &'static str,
        seen: Mutex<Vec<LlmRequest>>,
    }

    #[async_trait]
    impl LlmClient for FixedLabel {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, request: LlmRequest) -> Result<Message, LlmError> {
            self.seen.lock().unwrap().push(request);
            Ok(Message::assistant(self.label))
        }
    }

    #[tokio::test]
    async fn classify_sends_instructions_and_query_once() {
        let llm = Arc::new(FixedLabel {
            label: "true",
            seen: Mutex::new(Vec::new()),
        });
        let classifier = Classifier::new(llm.clone(), "tiny", ClassifierPolicy::Strict, Duration::from_secs(5));
        let route = classifier
            .classify(&InstructionSets::default(), "reverse a string in Python")
            .await
            .unwrap();
        assert_eq!(route, RouteDecision::Coding);

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "tiny");
        assert!(seen[0].tools.is_empty());
        assert_eq!(seen[0].messages[0].role, Role::System);
        assert_eq!(seen[0].messages[1].content, "reverse a string in Python");
    }
}
