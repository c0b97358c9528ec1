// orchestrator/src/llm.rs
// OpenAI-compatible chat-completions client (Groq, llama.cpp server, ...).

use async_trait::async_trait;
use reqwest::Client;
use router_core::{LlmClient, LlmError, LlmRequest, Message, Role, ToolCallRequest, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct WireFunction {
    name: String,
    /// JSON-encoded arguments, as the API expects.
    arguments: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

fn to_wire(message: &Message) -> WireMessage {
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
                    function: WireFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };
    // assistant tool-call turns carry `content: null`
    let content = if tool_calls.is_some() && message.content.is_empty() {
        None
    } else {
        Some(message.content.clone())
    };
    WireMessage {
        role: message.role.as_str().to_string(),
        content,
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn tool_spec(def: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.parameters
        }
    })
}

/// Arguments the model could not encode as JSON are forwarded as a JSON
/// string, so the tool's typed decoding reports them.
fn decode_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn from_wire(message: WireMessage) -> Result<Message, LlmError> {
    if Role::parse(&message.role) != Some(Role::Assistant) {
        return Err(LlmError::Decode(format!(
            "expected an assistant message, got role '{}'",
            message.role
        )));
    }
    let tool_calls: Vec<ToolCallRequest> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCallRequest::new(call.id, call.function.name, decode_arguments(&call.function.arguments)))
        .collect();
    let content = message.content.unwrap_or_default();

    if tool_calls.is_empty() {
        Ok(Message::assistant(content))
    } else {
        let mut msg = Message::assistant_tool_calls(tool_calls);
        msg.content = content;
        Ok(msg)
    }
}

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::NotConfigured(e.to_string()))?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Uses a caller-built `reqwest::Client`; its own timeout applies.
    pub fn with_client(client: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(&self, request: LlmRequest) -> Result<Message, LlmError> {
        let tools: Vec<Value> = request.tools.iter().map(tool_spec).collect();
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: request.messages.iter().map(to_wire).collect(),
            tool_choice: if tools.is_empty() { None } else { Some("auto") },
            tools,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let chat_url = format!("{}/chat/completions", self.base_url);
        debug!("[LLM] POST {} ({} messages)", chat_url, body.messages.len());

        let mut builder = self.client.post(&chat_url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: response_text,
            });
        }

        let chat_response: ChatCompletionResponse = serde_json::from_str(&response_text).map_err(|e| {
            LlmError::Decode(format!("{}. Raw text: {}", e, response_text))
        })?;
        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;
        from_wire(choice.message)
    }
}

/// Runs one model call under `limit`. The call is never retried.
pub async fn complete_with_timeout(
    llm: &dyn LlmClient,
    request: LlmRequest,
    limit: Duration,
) -> Result<Message, LlmError> {
    tokio::time::timeout(limit, llm.complete(request))
        .await
        .map_err(|_| LlmError::Timeout(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// One-shot loopback endpoint; the handle yields the raw request.
    async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let body = body.to_string();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let content_length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&buf).into_owned()
        });
        (base_url, handle)
    }

    fn loopback_client(base_url: &str, api_key: Option<&str>) -> OpenAiClient {
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        OpenAiClient::with_client(client, base_url, api_key.map(str::to_string))
    }

    fn weather_tool() -> ToolDefinition {
        ToolDefinition {
            name: "get_weather".into(),
            description: "Current weather".into(),
            parameters: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        }
    }

    #[test]
    fn tool_call_turns_round_trip_through_wire_format() {
        let msg = Message::assistant_tool_calls(vec![ToolCallRequest::new(
            "call_9",
            "get_weather",
            json!({"city": "Paris"}),
        )]);
        let wire = to_wire(&msg);
        assert_eq!(wire.content, None);
        let encoded = serde_json::to_value(&wire).unwrap();
        assert_eq!(encoded["tool_calls"][0]["type"], "function");
        assert_eq!(encoded["tool_calls"][0]["function"]["arguments"], r#"{"city":"Paris"}"#);
        assert_eq!(from_wire(wire).unwrap(), msg);
    }

    #[test]
    fn tool_messages_keep_their_call_id() {
        let wire = to_wire(&Message::tool("call_9", "Weather in Paris is Sunny +20°C"));
        let encoded = serde_json::to_value(&wire).unwrap();
        assert_eq!(encoded["role"], "tool");
        assert_eq!(encoded["tool_call_id"], "call_9");
        assert!(encoded.get("tool_calls").is_none());
    }

    #[test]
    fn decodes_provider_response() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "web_search", "arguments": "{\"query\": \"rust 2024\"}"}
                    }]
                }
            }]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let msg = from_wire(parsed.choices.into_iter().next().unwrap().message).unwrap();
        assert_eq!(msg.tool_calls[0].name, "web_search");
        assert_eq!(msg.tool_calls[0].arguments, json!({"query": "rust 2024"}));
        assert!(msg.content.is_empty());
    }

    #[test]
    fn malformed_arguments_are_forwarded_as_string() {
        assert_eq!(decode_arguments("{city: Paris"), Value::String("{city: Paris".into()));
        assert_eq!(decode_arguments(""), json!({}));
    }

    #[test]
    fn non_assistant_reply_is_a_decode_error() {
        let wire = to_wire(&Message::user("hi"));
        assert!(matches!(from_wire(wire), Err(LlmError::Decode(_))));
    }

    #[tokio::test]
    async fn posts_tools_and_bearer_token_to_chat_completions() {
        let reply = json!({
            "choices": [{"message": {"role": "assistant", "content": "Sunny in Paris."}}]
        });
        let (base_url, server) = serve_once(200, &reply.to_string()).await;
        let client = loopback_client(&base_url, Some("test-key"));

        let request = LlmRequest::new("llama-3.1-8b-instant", vec![Message::user("weather in Paris")])
            .with_tools(vec![weather_tool()])
            .with_temperature(0.5);
        let message = client.complete(request).await.unwrap();
        assert_eq!(message, Message::assistant("Sunny in Paris."));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/chat/completions HTTP/1.1"), "{}", raw);
        assert!(raw.to_lowercase().contains("authorization: bearer test-key"));
        let body: Value = serde_json::from_str(&raw[raw.find("\r\n\r\n").unwrap() + 4..]).unwrap();
        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_weather");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn no_tools_means_no_tool_choice_and_no_auth_header() {
        let reply = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        let (base_url, server) = serve_once(200, &reply.to_string()).await;
        let client = loopback_client(&base_url, None);

        client
            .complete(LlmRequest::new("m", vec![Message::user("hi")]))
            .await
            .unwrap();

        let raw = server.await.unwrap();
        assert!(!raw.to_lowercase().contains("authorization:"));
        let body: Value = serde_json::from_str(&raw[raw.find("\r\n\r\n").unwrap() + 4..]).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_body() {
        let (base_url, server) = serve_once(401, r#"{"error": {"message": "Invalid API Key"}}"#).await;
        let client = loopback_client(&base_url, Some("bad"));

        let err = client
            .complete(LlmRequest::new("m", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        match err {
            LlmError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Invalid API Key"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        server.await.unwrap();
    }

    struct Stalled;

    #[async_trait]
    impl LlmClient for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn complete(&self, _request: LlmRequest) -> Result<Message, LlmError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Message::assistant("late"))
        }
    }

    #[tokio::test]
    async fn sub_second_timeouts_keep_their_duration() {
        let limit = Duration::from_millis(50);
        let err = complete_with_timeout(&Stalled, LlmRequest::new("m", vec![Message::user("hi")]), limit)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Timeout(d) if d == limit));
        assert!(err.to_string().contains("50ms"), "{}", err);
    }
}
