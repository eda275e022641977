use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use testgen_core::github::contribution::{encode_repo_path, is_contained_path};
use testgen_core::github::{
    transform_contents, transform_repositories, transform_user, ContentsOutput, GitHubRepository,
    GitHubUser, LoginOutput, OAuthTokenResponse, RepoSlug, RepositoryOutput, UserOutput,
};

use super::{error_detail, require_token, GitHubClient};
use crate::config::{GitHubConfig, GitHubOptions, OAuthConfig};

#[derive(Debug, clap::Args, Clone)]
pub struct ReposOptions {
    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[clap(flatten)]
    pub github: GitHubOptions,
}

/// Trade an OAuth authorization code for an access token.
pub async fn exchange_code(
    client: &GitHubClient,
    oauth: &OAuthConfig,
    code: &str,
) -> Result<String, Error> {
    if code.trim().is_empty() {
        return Err(Error::BadRequest("Missing OAuth code".to_string()));
    }
    let (client_id, client_secret) = oauth.credentials()?;

    let mut form = vec![
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("code", code),
    ];
    if let Some(redirect_uri) = oauth.redirect_uri.as_deref() {
        form.push(("redirect_uri", redirect_uri));
    }

    let response = client
        .http
        .post(&client.oauth_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::Remote {
            status: 502,
            detail: format!("GitHub unreachable: {e}"),
        })?;

    if !response.status().is_success() {
        log::warn!("{}", error_detail(response).await);
        return Err(Error::BadRequest("GitHub OAuth failed".to_string()));
    }

    let token: OAuthTokenResponse = response
        .json()
        .await
        .map_err(|_| Error::BadRequest("GitHub OAuth failed".to_string()))?;

    match token.access_token.filter(|t| !t.is_empty()) {
        Some(access_token) => Ok(access_token),
        None => {
            log::warn!(
                "OAuth exchange rejected: {} {}",
                token.error.unwrap_or_default(),
                token.error_description.unwrap_or_default()
            );
            Err(Error::BadRequest("GitHub OAuth failed".to_string()))
        }
    }
}

pub async fn fetch_user(client: &GitHubClient, token: &str) -> Result<UserOutput, Error> {
    let user: GitHubUser = client.get_json("/user", &[], token).await?;
    Ok(transform_user(user))
}

pub async fn list_repositories_data(
    client: &GitHubClient,
    token: Option<&str>,
) -> Result<Vec<RepositoryOutput>, Error> {
    let token = require_token(token)?;
    let repos: Vec<GitHubRepository> = client
        .get_json("/user/repos", &[("per_page", "100")], token)
        .await?;
    Ok(transform_repositories(repos))
}

/// Directory listing or file object at `path` in `owner/repo`.
pub async fn repo_contents_data(
    client: &GitHubClient,
    token: Option<&str>,
    owner: &str,
    repo: &str,
    path: &str,
) -> Result<ContentsOutput, Error> {
    let token = require_token(token)?;
    let slug: RepoSlug = format!("{owner}/{repo}").parse()?;

    let path = path.trim_matches('/');
    if !path.is_empty() && !is_contained_path(path) {
        return Err(Error::BadRequest(format!("Invalid repository path '{path}'")));
    }
    let resource = if path.is_empty() {
        format!("{}/contents", slug.api_path())
    } else {
        format!("{}/contents/{}", slug.api_path(), encode_repo_path(path))
    };

    let value: serde_json::Value = client.get_json(&resource, &[], token).await?;
    Ok(transform_contents(value))
}

/// Complete a sign-in: exchange the code, then load the profile and repositories together.
pub async fn login_data(
    client: &GitHubClient,
    oauth: &OAuthConfig,
    code: &str,
) -> Result<LoginOutput, Error> {
    let access_token = exchange_code(client, oauth, code).await?;

    let (user, repositories) = tokio::join!(
        fetch_user(client, &access_token),
        list_repositories_data(client, Some(&access_token))
    );

    let user = user.map_err(|e| {
        log::warn!("Profile fetch failed after OAuth: {e}");
        Error::Unauthorized("Failed to fetch user profile".to_string())
    })?;

    Ok(LoginOutput {
        user,
        access_token,
        repositories: repositories?,
    })
}

pub async fn handler(options: ReposOptions, global: crate::Global) -> Result<()> {
    let config = GitHubConfig::from(options.github);
    let client = GitHubClient::new(&config)?;

    if global.verbose {
        eprintln!("Fetching repositories from {}", config.api_url);
    }

    let repos = list_repositories_data(&client, options.token.as_deref()).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&repos)?);
        return Ok(());
    }

    println!("\nFound {} repository(ies):\n", repos.len().to_string().bold());
    if repos.is_empty() {
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["Repository", "Language", "Visibility", "Updated"]);
    for repo in &repos {
        let visibility = if repo.private {
            "private".yellow()
        } else {
            "public".green()
        };
        table.add_row(prettytable::row![
            &repo.full_name,
            &repo.language,
            visibility,
            repo.updated_at.as_deref().unwrap_or("-")
        ]);
    }
    table.printstd();

    Ok(())
}
