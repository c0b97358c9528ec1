// agent_tools/src/lib.rs

pub mod email;
pub mod error;
pub mod registry;
pub mod social_post;
#[cfg(test)]
mod test_http;
pub mod weather;
pub mod web_search;

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub use crate::error::{classify_failure, ToolError, FAILURE_MARKER};
pub use crate::registry::{FnTool, Tool, ToolRegistry};

use crate::email::SendEmailTool;
use crate::social_post::PostTweetTool;
use crate::weather::WeatherTool;
use crate::web_search::WebSearchTool;

/// Source of tool credentials, consulted at call time.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads the live process environment; empty values count as unset.
pub fn process_env() -> EnvLookup {
    Arc::new(|key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
}

#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub weather_default_city: String,
    pub search_top_k: usize,
    pub timeout: Duration,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            weather_default_city: "Delhi".to_string(),
            search_top_k: 5,
            timeout: Duration::from_secs(20),
        }
    }
}

/// The four tools the assistant exposes to the model.
pub fn builtin_registry(settings: &ToolSettings) -> ToolRegistry {
    let client = Client::new();
    let env = process_env();

    let mut registry = ToolRegistry::new().with_timeout(settings.timeout);
    registry
        .register(WeatherTool::new(client.clone(), &settings.weather_default_city))
        .register(WebSearchTool::new(client.clone(), settings.search_top_k, env.clone()))
        .register(SendEmailTool::new(env.clone()))
        .register(PostTweetTool::new(client, env));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use router_core::ToolCallRequest;
    use serde_json::json;

    #[test]
    fn builtin_registry_declares_all_tools() {
        let registry = builtin_registry(&ToolSettings::default());
        assert_eq!(
            registry.names(),
            ["get_weather", "web_search", "send_email", "post_tweet"]
        );
        for def in registry.definitions() {
            assert_eq!(def.parameters["type"], "object");
            assert!(def.parameters["required"].is_array());
        }
    }

    #[tokio::test]
    async fn repeated_invalid_calls_fail_the_same_way() {
        let registry = builtin_registry(&ToolSettings::default());
        let bad_email = ToolCallRequest::new("e", "send_email", json!({"to": "x@example.com"}));
        let empty_post = ToolCallRequest::new("t", "post_tweet", json!({"text": ""}));

        for call in [&bad_email, &empty_post] {
            let first = registry.invoke(call).await;
            let second = registry.invoke(call).await;
            assert!(first.failed && second.failed);
            assert!(first.content.starts_with(FAILURE_MARKER));
            assert_eq!(
                classify_failure(&first.content),
                classify_failure(&second.content)
            );
        }
        let result = registry.invoke(&bad_email).await;
        assert_eq!(classify_failure(&result.content), Some("invalid_arguments"));
    }
}
