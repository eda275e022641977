use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::Json;
use serde::Deserialize;
use testgen_core::codegen::{CodeOutput, CodeRequest};
use testgen_core::github::{
    ContentsOutput, ContributionRequest, LoginOutput, PullRequestOutcome, RepositoryOutput,
};
use testgen_core::summary::{SummariesOutput, SummaryRequest};

use super::AppState;
use crate::error::Error;
use crate::generate::code::code_data;
use crate::generate::summaries::summaries_data;
use crate::github::account::{list_repositories_data, login_data, repo_contents_data};
use crate::github::contribution::create_pull_request_data;

type Shared = State<Arc<AppState>>;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

pub async fn generate_summaries(
    State(state): Shared,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<SummariesOutput>, Error> {
    summaries_data(
        state.backend.as_ref(),
        &state.models.summary,
        request,
        state.summary_mode,
    )
    .await
    .map(Json)
}

pub async fn generate_test_code(
    State(state): Shared,
    Json(request): Json<CodeRequest>,
) -> Result<Json<CodeOutput>, Error> {
    code_data(state.backend.as_ref(), &state.models.code, request)
        .await
        .map(Json)
}

pub async fn create_pr(
    State(state): Shared,
    headers: HeaderMap,
    Json(request): Json<ContributionRequest>,
) -> Result<Json<PullRequestOutcome>, Error> {
    create_pull_request_data(
        &state.github,
        bearer_token(&headers),
        request,
        state.commit_policy,
    )
    .await
    .map(Json)
}

pub async fn github_callback(
    State(state): Shared,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<LoginOutput>, Error> {
    let code = query
        .code
        .ok_or_else(|| Error::BadRequest("Missing OAuth code".to_string()))?;
    login_data(&state.github, &state.oauth, &code).await.map(Json)
}

pub async fn repositories(
    State(state): Shared,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Vec<RepositoryOutput>>, Error> {
    list_repositories_data(&state.github, query.token.as_deref())
        .await
        .map(Json)
}

pub async fn root_contents(
    State(state): Shared,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<ContentsOutput>, Error> {
    repo_contents_data(&state.github, query.token.as_deref(), &owner, &repo, "")
        .await
        .map(Json)
}

pub async fn contents(
    State(state): Shared,
    Path((owner, repo, path)): Path<(String, String, String)>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<ContentsOutput>, Error> {
    repo_contents_data(&state.github, query.token.as_deref(), &owner, &repo, &path)
        .await
        .map(Json)
}
