//! Request and response envelopes for the supported inference providers.
//!
//! Every provider speaks JSON over a single POST but disagrees on the URL, the
//! authorization header, the body shape and where the generated text lives.
//! These functions capture those differences without performing any I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Sampling temperature sent to every provider.
pub const TEMPERATURE: f64 = 0.2;

/// Context window requested from Ollama.
pub const OLLAMA_NUM_CTX: u32 = 4096;

/// Upper bound on generated tokens for providers that require one.
pub const MAX_OUTPUT_TOKENS: u32 = 4096;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// An inference backend the dispatcher can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    OpenAi,
    HuggingFace,
    Anthropic,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
#[error("Unknown backend '{0}'. Expected one of: ollama, openai, huggingface, anthropic")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" => Ok(Provider::OpenAi),
            "huggingface" | "hf" => Ok(Provider::HuggingFace),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenAi => "openai",
            Provider::HuggingFace => "huggingface",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Ollama => "http://localhost:11434",
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::HuggingFace => "https://api-inference.huggingface.co/models",
            Provider::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    /// Local Ollama runs without credentials; hosted providers do not.
    pub fn requires_api_key(self) -> bool {
        !matches!(self, Provider::Ollama)
    }

    /// Full URL of the generation endpoint.
    pub fn endpoint(self, base_url: &str, model: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Provider::Ollama => format!("{base}/api/generate"),
            Provider::OpenAi => format!("{base}/chat/completions"),
            Provider::HuggingFace => format!("{base}/{model}"),
            Provider::Anthropic => format!("{base}/messages"),
        }
    }

    /// Non-streaming request body for a single prompt.
    pub fn request_body(self, prompt: &str, model: &str) -> Value {
        match self {
            Provider::Ollama => json!({
                "model": model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "temperature": TEMPERATURE,
                    "num_ctx": OLLAMA_NUM_CTX,
                }
            }),
            Provider::OpenAi => json!({
                "model": model,
                "temperature": TEMPERATURE,
                "messages": [{ "role": "user", "content": prompt }],
            }),
            Provider::HuggingFace => json!({
                "inputs": prompt,
                "parameters": {
                    "temperature": TEMPERATURE,
                    "max_new_tokens": MAX_OUTPUT_TOKENS,
                    "return_full_text": false,
                }
            }),
            Provider::Anthropic => json!({
                "model": model,
                "max_tokens": MAX_OUTPUT_TOKENS,
                "temperature": TEMPERATURE,
                "messages": [{ "role": "user", "content": prompt }],
            }),
        }
    }

    /// Headers carrying the credential.
    ///
    /// Anthropic takes the raw key in `x-api-key`; the others use a bearer
    /// token. Ollama only sends one when a key is configured (e.g. behind an
    /// authenticating proxy).
    pub fn auth_headers(self, api_key: Option<&str>) -> Vec<(&'static str, String)> {
        match (self, api_key) {
            (Provider::Anthropic, Some(key)) => vec![
                ("x-api-key", key.to_string()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ],
            (Provider::Anthropic, None) => {
                vec![("anthropic-version", ANTHROPIC_VERSION.to_string())]
            }
            (_, Some(key)) => vec![("Authorization", format!("Bearer {key}"))],
            (_, None) => vec![],
        }
    }

    /// Primary text field of a response, trimmed. Missing fields read as empty.
    pub fn response_text(self, response: &Value) -> String {
        let text = match self {
            Provider::Ollama => response.get("response").and_then(Value::as_str),
            Provider::OpenAi => response
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str),
            Provider::HuggingFace => response
                .pointer("/0/generated_text")
                .or_else(|| response.get("generated_text"))
                .and_then(Value::as_str),
            Provider::Anthropic => response.pointer("/content/0/text").and_then(Value::as_str),
        };

        text.unwrap_or_default().trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_names() {
        assert_eq!("ollama".parse::<Provider>().unwrap(), Provider::Ollama);
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("hf".parse::<Provider>().unwrap(), Provider::HuggingFace);
        assert_eq!(" anthropic ".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert!("gemini".parse::<Provider>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for provider in [
            Provider::Ollama,
            Provider::OpenAi,
            Provider::HuggingFace,
            Provider::Anthropic,
        ] {
            assert_eq!(provider.to_string().parse::<Provider>().unwrap(), provider);
        }
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            Provider::Ollama.endpoint("http://localhost:11434/", "phi3:mini"),
            "http://localhost:11434/api/generate"
        );
        assert_eq!(
            Provider::HuggingFace.endpoint("https://hf.example/models", "bigcode/starcoder"),
            "https://hf.example/models/bigcode/starcoder"
        );
    }

    #[test]
    fn test_ollama_body_disables_streaming() {
        let body = Provider::Ollama.request_body("hi", "phi3:mini");
        assert_eq!(body["stream"], json!(false));
        assert_eq!(body["model"], json!("phi3:mini"));
        assert_eq!(body["options"]["num_ctx"], json!(4096));
    }

    #[test]
    fn test_chat_bodies_wrap_prompt_in_user_message() {
        for provider in [Provider::OpenAi, Provider::Anthropic] {
            let body = provider.request_body("hi", "m");
            assert_eq!(body["messages"][0]["role"], json!("user"));
            assert_eq!(body["messages"][0]["content"], json!("hi"));
        }
    }

    #[test]
    fn test_auth_header_shapes() {
        assert_eq!(
            Provider::OpenAi.auth_headers(Some("k")),
            vec![("Authorization", "Bearer k".to_string())]
        );
        assert_eq!(
            Provider::HuggingFace.auth_headers(Some("k")),
            vec![("Authorization", "Bearer k".to_string())]
        );
        assert_eq!(
            Provider::Anthropic.auth_headers(Some("k"))[0],
            ("x-api-key", "k".to_string())
        );
        assert!(Provider::Ollama.auth_headers(None).is_empty());
    }

    #[test]
    fn test_requires_api_key() {
        assert!(!Provider::Ollama.requires_api_key());
        assert!(Provider::OpenAi.requires_api_key());
        assert!(Provider::HuggingFace.requires_api_key());
        assert!(Provider::Anthropic.requires_api_key());
    }

    #[test]
    fn test_response_text_per_provider() {
        assert_eq!(
            Provider::Ollama.response_text(&json!({"response": "  hello \n"})),
            "hello"
        );
        assert_eq!(
            Provider::OpenAi
                .response_text(&json!({"choices": [{"message": {"content": "hello"}}]})),
            "hello"
        );
        assert_eq!(
            Provider::HuggingFace.response_text(&json!([{"generated_text": "hello"}])),
            "hello"
        );
        assert_eq!(
            Provider::HuggingFace.response_text(&json!({"generated_text": "hello"})),
            "hello"
        );
        assert_eq!(
            Provider::Anthropic.response_text(&json!({"content": [{"type": "text", "text": "hello"}]})),
            "hello"
        );
    }

    #[test]
    fn test_response_text_missing_field_is_empty() {
        assert_eq!(Provider::Ollama.response_text(&json!({"done": true})), "");
        assert_eq!(Provider::OpenAi.response_text(&json!({"choices": []})), "");
    }
}
