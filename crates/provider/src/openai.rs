//! OpenAI-compatible chat completions provider
//!
//! Works against api.openai.com and OpenRouter (detected from the key prefix
//! or the base URL).

use crate::*;
use reqwest::Client;
use serde_json::json;

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE: &str = "https://openrouter.ai/api/v1";

/// Chat completions client
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
    is_openrouter: bool,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_key = api_key.into();
        let is_openrouter = api_key.starts_with("sk-or-")
            || api_base
                .as_ref()
                .map(|b| b.contains("openrouter"))
                .unwrap_or(false);

        let api_base = api_base
            .unwrap_or_else(|| {
                if is_openrouter {
                    OPENROUTER_BASE.to_string()
                } else {
                    OPENAI_BASE.to_string()
                }
            })
            .trim_end_matches('/')
            .to_string();

        let default_model = default_model.unwrap_or_else(|| {
            if is_openrouter {
                "openai/gpt-4o-mini".to_string()
            } else {
                "gpt-4o-mini".to_string()
            }
        });

        Self {
            client: Client::new(),
            api_key,
            api_base,
            default_model,
            is_openrouter,
        }
    }

    pub fn is_openrouter(&self) -> bool {
        self.is_openrouter
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let messages: Vec<serde_json::Value> = params
            .messages
            .iter()
            .map(|m| {
                let mut obj = json!({ "role": &m.role });
                match &m.content {
                    Some(content) => obj["content"] = json!(content),
                    // assistant tool-call turns must still carry a content key
                    None => obj["content"] = serde_json::Value::Null,
                }
                if let Some(tool_calls) = &m.tool_calls {
                    let calls: Vec<serde_json::Value> = tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": &tc.id,
                                "type": &tc.call_type,
                                "function": {
                                    "name": &tc.function.name,
                                    "arguments": tc.function.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    obj["tool_calls"] = json!(calls);
                }
                if let Some(tool_call_id) = &m.tool_call_id {
                    obj["tool_call_id"] = json!(tool_call_id);
                }
                if let Some(name) = &m.name {
                    obj["name"] = json!(name);
                }
                obj
            })
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });

        if !params.tools.is_empty() {
            body["tools"] = json!(params.tools);
            body["tool_choice"] = match &params.tool_choice {
                ToolChoice::Auto => json!("auto"),
                ToolChoice::Required(name) => {
                    json!({"type": "function", "function": {"name": name}})
                }
                ToolChoice::None => json!("none"),
            };
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let choice = json["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let message = &choice["message"];
        let content = message["content"].as_str().map(|s| s.to_string());
        let finish_reason = choice["finish_reason"]
            .as_str()
            .unwrap_or("stop")
            .to_string();

        let mut tool_calls = Vec::new();
        if let Some(calls) = message["tool_calls"].as_array() {
            for call in calls {
                let function = &call["function"];
                // arguments arrive as a JSON-encoded string; keep the raw value otherwise
                let args = function["arguments"]
                    .as_str()
                    .map(|s| {
                        serde_json::from_str(s)
                            .unwrap_or_else(|_| serde_json::Value::String(s.to_string()))
                    })
                    .unwrap_or_else(|| function["arguments"].clone());

                tool_calls.push(ToolCall {
                    id: call["id"].as_str().unwrap_or("").to_string(),
                    name: function["name"].as_str().unwrap_or("").to_string(),
                    arguments: args,
                });
            }
        }

        let usage = match json["usage"].as_object() {
            Some(usage) => {
                let count = |key: &str| usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                Usage {
                    prompt_tokens: count("prompt_tokens"),
                    completion_tokens: count("completion_tokens"),
                    total_tokens: count("total_tokens"),
                }
            }
            None => Usage::default(),
        };

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl Provider for OpenAiProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        trace!("◆ chat completion against {}", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(&params);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let error = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(ProviderError::Api(error));
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;

        debug!(
            "◆ chat response with {} tool calls",
            json["choices"][0]["message"]["tool_calls"]
                .as_array()
                .map(|v| v.len())
                .unwrap_or(0)
        );

        self.parse_response(json)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params_with(messages: Vec<Message>, tools: Vec<Tool>) -> ChatParams {
        ChatParams {
            model: "gpt-4o-mini".to_string(),
            messages,
            tools,
            max_tokens: 1024,
            temperature: 0.0,
            tool_choice: ToolChoice::Auto,
        }
    }

    #[test]
    fn test_new_with_openai_key() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        assert!(!provider.is_openrouter());
        assert_eq!(provider.api_base(), OPENAI_BASE);
        assert_eq!(provider.default_model(), "gpt-4o-mini");
    }

    #[test]
    fn test_new_with_openrouter_key() {
        let provider = OpenAiProvider::new("sk-or-test", None, None);
        assert!(provider.is_openrouter());
        assert_eq!(provider.api_base(), OPENROUTER_BASE);
        assert_eq!(provider.default_model(), "openai/gpt-4o-mini");
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let provider =
            OpenAiProvider::new("sk-test", Some("http://localhost:8080/v1/".to_string()), None);
        assert_eq!(provider.api_base(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_is_configured() {
        assert!(OpenAiProvider::new("key", None, None).is_configured());
        assert!(!OpenAiProvider::new("", None, None).is_configured());
    }

    #[test]
    fn test_build_request_without_tools() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let request = provider.build_request(&params_with(vec![Message::user("Hello")], vec![]));

        assert_eq!(request["model"], "gpt-4o-mini");
        assert_eq!(request["max_tokens"], 1024);
        assert!(request.get("tools").is_none());
        assert!(request.get("tool_choice").is_none());
        assert_eq!(request["messages"][0]["content"], "Hello");
    }

    #[test]
    fn test_build_request_uses_default_model_when_empty() {
        let provider = OpenAiProvider::new("sk-test", None, Some("gpt-4o".to_string()));
        let mut params = params_with(vec![Message::user("Hi")], vec![]);
        params.model.clear();
        assert_eq!(provider.build_request(&params)["model"], "gpt-4o");
    }

    #[test]
    fn test_build_request_encodes_tool_call_arguments_as_string() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let call = ToolCallDef::new("call_1", "book_flight", json!({"flight_id": "FL123"}));
        let messages = vec![
            Message::assistant_tool_calls(None, vec![call]),
            Message::tool("call_1", "book_flight", "{\"status\":\"success\"}"),
        ];

        let request = provider.build_request(&params_with(messages, vec![]));
        let assistant = &request["messages"][0];
        assert!(assistant["content"].is_null());
        let args = assistant["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(args).unwrap(),
            json!({"flight_id": "FL123"})
        );
        assert_eq!(request["messages"][1]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_build_request_with_tools() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let tools = vec![Tool::new(
            "search_flights",
            "Search flights",
            json!({"type": "object", "properties": {}}),
        )];
        let request = provider.build_request(&params_with(vec![Message::user("Hi")], tools));

        assert_eq!(request["tools"][0]["type"], "function");
        assert_eq!(request["tools"][0]["function"]["name"], "search_flights");
        assert_eq!(request["tool_choice"], "auto");
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let response = provider
            .parse_response(json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_123",
                            "type": "function",
                            "function": {
                                "name": "search_flights",
                                "arguments": "{\"destination\": \"Paris\"}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 20, "completion_tokens": 15, "total_tokens": 35}
            }))
            .unwrap();

        assert!(response.content.is_none());
        assert_eq!(response.tool_calls[0].name, "search_flights");
        assert_eq!(response.tool_calls[0].arguments, json!({"destination": "Paris"}));
        assert_eq!(response.usage.total_tokens, 35);
    }

    #[test]
    fn test_parse_response_keeps_unparseable_arguments() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let response = provider
            .parse_response(json!({
                "choices": [{
                    "message": {
                        "tool_calls": [{
                            "id": "call_1",
                            "function": {"name": "book_flight", "arguments": "not json"}
                        }]
                    }
                }]
            }))
            .unwrap();

        assert_eq!(response.tool_calls[0].arguments, json!("not json"));
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[test]
    fn test_parse_response_empty_choices() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let result = provider.parse_response(json!({"choices": []}));
        assert!(matches!(result, Err(ProviderError::InvalidResponse)));
    }

    #[tokio::test]
    async fn test_chat_without_key_fails_fast() {
        let provider = OpenAiProvider::new("", None, None);
        let result = provider.chat(ChatParams::default()).await;
        assert!(matches!(result, Err(ProviderError::NoApiKey)));
    }
}
