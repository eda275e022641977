//! HTTP surface: a thin axum layer over the generate and GitHub operations.

mod handlers;

use std::sync::Arc;

use crate::prelude::{eprintln, *};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use testgen_core::github::CommitPolicy;
use testgen_core::summary::ValidationMode;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::{
    parse_allowed_origins, GitHubConfig, GitHubOptions, LlmConfig, LlmOptions, Models, OAuthConfig,
};
use crate::github::GitHubClient;
use crate::llm::{HttpBackend, ModelBackend};

#[derive(Debug, clap::Parser)]
#[command(name = "serve")]
#[command(about = "Serve the generation and GitHub API over HTTP")]
pub struct App {
    /// Host to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Origins allowed to call the API, comma separated or as a JSON-style list
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "")]
    pub allowed_origins: String,

    /// Reject summaries that do not name the file they cover
    #[arg(long, env = "STRICT_SUMMARIES")]
    pub strict_summaries: bool,

    #[clap(flatten)]
    pub llm: LlmOptions,

    #[clap(flatten)]
    pub github: GitHubOptions,
}

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ModelBackend>,
    pub models: Models,
    pub summary_mode: ValidationMode,
    pub github: GitHubClient,
    pub oauth: OAuthConfig,
    pub commit_policy: CommitPolicy,
}

impl AppState {
    pub fn new(llm: &LlmConfig, github: &GitHubConfig, summary_mode: ValidationMode) -> Result<Self> {
        Ok(Self {
            backend: Arc::new(HttpBackend::new(llm)?),
            models: llm.models.clone(),
            summary_mode,
            github: GitHubClient::new(github)?,
            oauth: github.oauth.clone(),
            commit_policy: github.commit_policy,
        })
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    // Credentials rule out wildcards, so methods and headers mirror the preflight.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn router(state: AppState, origins: &[String]) -> Router {
    Router::new()
        .route("/api/generate-summaries", post(handlers::generate_summaries))
        .route("/api/generate-test-code", post(handlers::generate_test_code))
        .route("/auth/create-pr", post(handlers::create_pr))
        .route("/auth/github/callback", get(handlers::github_callback))
        .route("/auth/github/repositories", get(handlers::repositories))
        .route(
            "/auth/github/repos/{owner}/{repo}/contents",
            get(handlers::root_contents),
        )
        .route(
            "/auth/github/repos/{owner}/{repo}/contents/{*path}",
            get(handlers::contents),
        )
        .layer(cors_layer(origins))
        .with_state(Arc::new(state))
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let llm = LlmConfig::from(app.llm);
    let github = GitHubConfig::from(app.github);
    let origins = parse_allowed_origins(&app.allowed_origins);
    let summary_mode = if app.strict_summaries {
        ValidationMode::Strict
    } else {
        ValidationMode::Lenient
    };

    let state = AppState::new(&llm, &github, summary_mode)?;
    let addr = format!("{}:{}", app.host, app.port);

    log::info!(
        "Backend {} at {} (summaries: {}, code: {})",
        llm.provider,
        llm.base_url,
        llm.models.summary,
        llm.models.code
    );
    if global.verbose {
        eprintln!("testgen API listening on http://{}", addr);
        eprintln!("Allowed origins: {}", origins.join(", "));
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    axum::serve(listener, router(state, &origins))
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}
