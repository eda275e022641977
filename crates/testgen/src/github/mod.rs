pub mod account;
pub mod contribution;

use crate::prelude::{println, *};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use testgen_core::text::truncate;

use crate::config::GitHubConfig;

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";

/// Characters of a GitHub error body kept in error messages.
const ERROR_BODY_CHARS: usize = 300;

/// GitHub module app - root command
#[derive(Debug, clap::Parser)]
#[command(name = "github")]
#[command(about = "GitHub operations (pull requests, repositories)")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Open a pull request with generated test files
    #[clap(name = "pr")]
    Pr(contribution::PrOptions),

    /// List the repositories the token can see
    #[clap(name = "repos")]
    Repos(account::ReposOptions),
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Running GitHub command...");
    }

    match app.command {
        Commands::Pr(options) => contribution::handler(options, global).await,
        Commands::Repos(options) => account::handler(options, global).await,
    }
}

/// Shared GitHub HTTP client.
///
/// Only connection-level settings live here. The user's token is attached to
/// each request, so one client can serve every caller.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    oauth_url: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("testgen/", env!("CARGO_PKG_VERSION"))),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            oauth_url: config.oauth_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Authenticated request against the REST API.
    pub(crate) fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
    ) -> reqwest::RequestBuilder {
        self.http.request(method, self.url(path)).bearer_auth(token)
    }

    /// GET a REST resource and decode it, passing GitHub's status through on failure.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: &str,
    ) -> Result<T, Error> {
        log::debug!("GET {path}");

        let response = self
            .request(reqwest::Method::GET, path, token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Remote {
                status: 502,
                detail: format!("GitHub unreachable: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                detail: error_detail(response).await,
            });
        }

        response.json::<T>().await.map_err(|e| Error::Remote {
            status: 502,
            detail: format!("Failed to parse GitHub response: {e}"),
        })
    }
}

/// Human-readable message from a failed GitHub response.
///
/// GitHub errors carry a `message` field; anything else is reported as text.
pub(crate) async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));

    match message {
        Some(message) => format!("GitHub API Error [{}]: {}", status.as_u16(), message),
        None => format!(
            "GitHub API Error [{}]: {}",
            status.as_u16(),
            truncate(body.trim(), ERROR_BODY_CHARS)
        ),
    }
}

/// Reject absent or blank tokens before any remote call.
pub(crate) fn require_token(token: Option<&str>) -> Result<&str, Error> {
    token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::Unauthorized("Missing GitHub token".to_string()))
}
