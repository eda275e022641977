//! Command-line and environment configuration.
//!
//! Options are parsed by clap (with environment fallbacks) and turned into
//! plain config values that are handed to each component when it is built.

use std::time::Duration;

use testgen_core::github::CommitPolicy;
use testgen_core::llm::Provider;

use crate::error::Error;

/// Inference backend options
#[derive(Debug, Clone, clap::Args)]
pub struct LlmOptions {
    /// Inference backend (ollama, openai, huggingface, anthropic)
    #[arg(long = "backend", env = "TESTGEN_BACKEND", default_value = "ollama")]
    pub provider: Provider,

    /// Base URL of the backend (defaults to the provider's public endpoint)
    #[arg(long, env = "LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// API key for hosted backends
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Model used to summarise test cases
    #[arg(long, env = "SUMMARY_MODEL", default_value = "phi3:mini")]
    pub summary_model: String,

    /// Model used to write test code
    #[arg(long, env = "CODE_MODEL", default_value = "qwen2.5-coder:7b")]
    pub code_model: String,

    /// Wall-clock timeout for a single model call, in seconds
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value = "180")]
    pub llm_timeout_secs: u64,
}

/// GitHub API and OAuth options
#[derive(Debug, Clone, clap::Args)]
pub struct GitHubOptions {
    /// GitHub REST API root
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// GitHub OAuth token endpoint
    #[arg(
        long,
        env = "GITHUB_OAUTH_URL",
        default_value = "https://github.com/login/oauth/access_token"
    )]
    pub github_oauth_url: String,

    /// OAuth application client id
    #[arg(long, env = "GITHUB_CLIENT_ID")]
    pub github_client_id: Option<String>,

    /// OAuth application client secret
    #[arg(long, env = "GITHUB_CLIENT_SECRET", hide_env_values = true)]
    pub github_client_secret: Option<String>,

    /// OAuth redirect URI registered with the application
    #[arg(long, env = "GITHUB_REDIRECT_URI")]
    pub github_redirect_uri: Option<String>,

    /// Timeout for a single GitHub call, in seconds
    #[arg(long, env = "GITHUB_TIMEOUT_SECS", default_value = "30")]
    pub github_timeout_secs: u64,

    /// What to do when one of several file commits fails (abort, continue)
    #[arg(long, env = "COMMIT_POLICY", default_value = "abort")]
    pub commit_policy: CommitPolicy,
}

/// Model names for each pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Models {
    pub summary: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: Option<String>,
    pub models: Models,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

impl OAuthConfig {
    /// Client id and secret, or a configuration error naming what is missing.
    pub fn credentials(&self) -> Result<(&str, &str), Error> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| Error::MissingCredential("GITHUB_CLIENT_ID is not set".to_string()))?;
        let client_secret = self.client_secret.as_deref().ok_or_else(|| {
            Error::MissingCredential("GITHUB_CLIENT_SECRET is not set".to_string())
        })?;
        Ok((client_id, client_secret))
    }
}

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub oauth_url: String,
    pub oauth: OAuthConfig,
    pub timeout: Duration,
    pub commit_policy: CommitPolicy,
}

/// Treat blank values the same as unset ones.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<LlmOptions> for LlmConfig {
    fn from(options: LlmOptions) -> Self {
        let base_url = non_empty(options.llm_base_url)
            .unwrap_or_else(|| options.provider.default_base_url().to_string());

        Self {
            provider: options.provider,
            base_url,
            api_key: non_empty(options.llm_api_key),
            models: Models {
                summary: options.summary_model,
                code: options.code_model,
            },
            timeout: Duration::from_secs(options.llm_timeout_secs),
        }
    }
}

impl From<GitHubOptions> for GitHubConfig {
    fn from(options: GitHubOptions) -> Self {
        Self {
            api_url: options.github_api_url,
            oauth_url: options.github_oauth_url,
            oauth: OAuthConfig {
                client_id: non_empty(options.github_client_id),
                client_secret: non_empty(options.github_client_secret),
                redirect_uri: non_empty(options.github_redirect_uri),
            },
            timeout: Duration::from_secs(options.github_timeout_secs),
            commit_policy: options.commit_policy,
        }
    }
}

/// Parse the allowed CORS origins.
///
/// Accepts a plain comma-separated list as well as a JSON-ish list such as
/// `["http://a", "http://b"]`.
pub fn parse_allowed_origins(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .replace('"', "")
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}
