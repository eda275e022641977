//! GitHub API response types and their pass-through output shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// API Response Types (Deserialization)
// =============================================================================

/// Authenticated user from `GET /user`
#[derive(Debug, Deserialize, Clone)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Repository from `GET /user/repos`
#[derive(Debug, Deserialize, Clone)]
pub struct GitHubRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// Entry of a directory listing from the contents API
#[derive(Debug, Deserialize, Clone)]
pub struct GitHubContentItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// OAuth token exchange response
#[derive(Debug, Deserialize, Clone)]
pub struct OAuthTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

// =============================================================================
// Output Domain Types
// =============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserOutput {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RepositoryOutput {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub language: String,
    pub updated_at: Option<String>,
    pub private: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub size: u64,
}

/// Result of a contents lookup: a directory listing, or the file object as-is.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ContentsOutput {
    Listing(Vec<ContentEntry>),
    File(Value),
}

/// Payload returned once a user has signed in.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoginOutput {
    pub user: UserOutput,
    pub access_token: String,
    pub repositories: Vec<RepositoryOutput>,
}

// =============================================================================
// Pure Transformation Functions
// =============================================================================

pub fn transform_user(user: GitHubUser) -> UserOutput {
    UserOutput {
        login: user.login,
        name: user.name,
        avatar_url: user.avatar_url,
    }
}

pub fn transform_repository(repo: GitHubRepository) -> RepositoryOutput {
    RepositoryOutput {
        id: repo.id,
        name: repo.name,
        full_name: repo.full_name,
        description: repo.description.unwrap_or_default(),
        language: repo.language.unwrap_or_else(|| "Unknown".to_string()),
        updated_at: repo.updated_at,
        private: repo.private,
    }
}

pub fn transform_repositories(repos: Vec<GitHubRepository>) -> Vec<RepositoryOutput> {
    repos.into_iter().map(transform_repository).collect()
}

/// Shape a contents API response.
///
/// Directory listings keep only files and sub-directories; anything else
/// (a single file with its base64 `content`) is passed through untouched.
pub fn transform_contents(value: Value) -> ContentsOutput {
    match value {
        Value::Array(items) => ContentsOutput::Listing(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<GitHubContentItem>(item).ok())
                .filter(|item| item.item_type == "file" || item.item_type == "dir")
                .map(|item| ContentEntry {
                    name: item.name,
                    path: item.path,
                    entry_type: item.item_type,
                    size: item.size.unwrap_or(0),
                })
                .collect(),
        ),
        other => ContentsOutput::File(other),
    }
}
