use std::path::PathBuf;

use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use rand::Rng;
use serde_json::Value;
use testgen_core::github::{
    ApiCall, CommitPolicy, ContributionFailure, ContributionRequest, GeneratedFile, Method,
    PullRequestOutcome, RepoSlug, StepCause, Workflow,
};
use testgen_core::github::contribution::is_contained_path;

use super::{error_detail, require_token, GitHubClient};
use crate::config::{GitHubConfig, GitHubOptions};

/// A `name=path` pair from the command line.
#[derive(Debug, Clone)]
pub struct FileArg {
    pub file: String,
    pub path: PathBuf,
}

fn parse_file_arg(raw: &str) -> std::result::Result<FileArg, String> {
    match raw.split_once('=') {
        Some((file, path)) if !file.trim().is_empty() && !path.trim().is_empty() => Ok(FileArg {
            file: file.trim().to_string(),
            path: PathBuf::from(path.trim()),
        }),
        _ => Err(format!("expected <name>=<path>, got '{raw}'")),
    }
}

#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # Commit two generated test files and open a pull request:
  testgen github pr --repo octocat/hello-world \\
    --file math.ts=out/math.test.js --file strings.ts=out/strings.test.js

  # Keep going when one of the commits fails:
  testgen github pr --repo octocat/hello-world --file a.ts=a.test.js --commit-policy continue

NOTES:
  - Each file lands in tests/generated/<name>.test.js on a new feature/add-tests-* branch
  - The branch is not deleted if a later step fails")]
pub struct PrOptions {
    /// Target repository (owner/name)
    #[arg(long)]
    pub repo: String,

    /// Generated file as <name>=<path>; repeat for several files
    #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_file_arg, required = true)]
    pub files: Vec<FileArg>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[clap(flatten)]
    pub github: GitHubOptions,
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
    }
}

impl GitHubClient {
    /// Perform one workflow call and classify the outcome.
    pub(crate) async fn send_call(&self, call: &ApiCall, token: &str) -> Result<Value, StepCause> {
        let mut request = self.request(http_method(call.method), &call.path, token);
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| StepCause::Transport {
            detail: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StepCause::Status {
                status: status.as_u16(),
                detail: error_detail(response).await,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| StepCause::Transport {
                detail: e.to_string(),
            })?;

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| StepCause::MalformedResponse {
            detail: format!("response is not JSON: {e}"),
        })
    }
}

/// Six lowercase hex characters, fresh for every attempt.
fn branch_suffix() -> String {
    format!("{:06x}", rand::thread_rng().gen_range(0..0x0100_0000u32))
}

/// Drive the workflow until it stops, one call at a time.
pub(crate) async fn run_workflow(
    client: &GitHubClient,
    token: &str,
    mut workflow: Workflow,
) -> Result<PullRequestOutcome, ContributionFailure> {
    while let Some(call) = workflow.next_call() {
        log::info!("[{}] {:?} {}", call.step, call.method, call.path);

        match client.send_call(&call, token).await {
            Ok(body) => workflow.on_success(&body),
            Err(cause) => {
                log::warn!("[{}] {}", call.step, cause);
                workflow.on_failure(cause);
            }
        }
    }

    workflow.finish()
}

/// Commit `request.files` to a fresh branch and open a pull request.
pub async fn create_pull_request_data(
    client: &GitHubClient,
    token: Option<&str>,
    request: ContributionRequest,
    policy: CommitPolicy,
) -> Result<PullRequestOutcome, Error> {
    let token = require_token(token)?;
    let repo: RepoSlug = request.repo.parse()?;

    if request.files.is_empty() {
        return Err(Error::BadRequest(
            "At least one generated file is required to open a pull request".to_string(),
        ));
    }
    if let Some(bad) = request.files.iter().find(|f| !is_contained_path(&f.file)) {
        return Err(Error::BadRequest(format!("Invalid file name '{}'", bad.file)));
    }

    let workflow = Workflow::new(repo, request.files, &branch_suffix(), policy);
    log::info!(
        "Opening pull request on {} from branch {}",
        request.repo,
        workflow.branch()
    );

    let outcome = run_workflow(client, token, workflow).await?;
    log::info!("Pull request created: {}", outcome.url);

    Ok(outcome)
}

fn read_generated_files(args: &[FileArg]) -> Result<Vec<GeneratedFile>> {
    args.iter()
        .map(|arg| {
            let code = std::fs::read_to_string(&arg.path)
                .wrap_err_with(|| format!("Failed to read {}", arg.path.display()))?;
            Ok(GeneratedFile {
                file: arg.file.clone(),
                code,
            })
        })
        .collect()
}

pub async fn handler(options: PrOptions, global: crate::Global) -> Result<()> {
    let files = read_generated_files(&options.files)?;
    let config = GitHubConfig::from(options.github);
    let client = GitHubClient::new(&config)?;

    if global.verbose {
        eprintln!(
            "Committing {} file(s) to {} ({:?} on commit failure)",
            files.len(),
            options.repo,
            config.commit_policy
        );
    }

    let request = ContributionRequest {
        repo: options.repo,
        files,
    };

    let outcome = match create_pull_request_data(
        &client,
        options.token.as_deref(),
        request,
        config.commit_policy,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            if let Some(failure) = err.contribution() {
                if let Some(branch) = &failure.progress.branch {
                    eprintln!(
                        "{} branch '{}' was created with {} commit(s) and left in place",
                        "note:".yellow().bold(),
                        branch,
                        failure.progress.committed.len()
                    );
                }
            }
            return Err(err.into());
        }
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("{} {}", "Pull request:".green().bold(), outcome.url);
    println!("{} {}", "Branch:".bold(), outcome.branch);

    if !outcome.skipped.is_empty() {
        println!("\n{}", "Skipped files:".yellow().bold());
        let mut table = new_table();
        table.add_row(prettytable::row!["File", "Reason"]);
        for skipped in &outcome.skipped {
            table.add_row(prettytable::row![&skipped.file, &skipped.reason]);
        }
        table.printstd();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::tests::config;
    use axum::http::StatusCode;
    use serde_json::json;
    use testgen_core::github::Step;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "gho_test";

    fn request(files: &[&str]) -> ContributionRequest {
        ContributionRequest {
            repo: "octo/hello".to_string(),
            files: files
                .iter()
                .map(|file| GeneratedFile {
                    file: file.to_string(),
                    code: format!("test('{file}', () => {{}});"),
                })
                .collect(),
        }
    }

    async fn mount_repo_and_ref(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/octo/hello"))
            .and(header("authorization", "Bearer gho_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "full_name": "octo/hello",
                "default_branch": "develop"
            })))
            .expect(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/hello/git/ref/heads/develop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/develop",
                "object": {"sha": "abc123", "type": "commit"}
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_create_branch(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/repos/octo/hello/git/refs"))
            .and(body_partial_json(json!({"sha": "abc123"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ref": "x"})))
            .expect(1)
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&config(&server.uri())).unwrap()
    }

    #[test]
    fn test_branch_suffix_is_six_hex_chars() {
        let suffix = branch_suffix();
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_parse_file_arg() {
        let arg = parse_file_arg("math.ts=out/math.test.js").unwrap();
        assert_eq!(arg.file, "math.ts");
        assert_eq!(arg.path, PathBuf::from("out/math.test.js"));

        assert!(parse_file_arg("math.ts").is_err());
        assert!(parse_file_arg("=out.js").is_err());
    }

    #[tokio::test]
    async fn test_happy_path_opens_pull_request() {
        let server = MockServer::start().await;
        mount_repo_and_ref(&server).await;
        mount_create_branch(&server).await;

        Mock::given(method("PUT"))
            .and(path("/repos/octo/hello/contents/tests/generated/a.ts.test.js"))
            .and(body_partial_json(json!({"message": "feat: Add generated test for a.ts"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"content": {}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/octo/hello/contents/tests/generated/b.ts.test.js"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"content": {}})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/repos/octo/hello/pulls"))
            .and(body_partial_json(json!({
                "title": "feat: Add auto-generated tests",
                "base": "develop"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "html_url": "https://github.com/octo/hello/pull/7"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = create_pull_request_data(
            &client(&server),
            Some(TOKEN),
            request(&["a.ts", "b.ts"]),
            CommitPolicy::Abort,
        )
        .await
        .unwrap();

        assert_eq!(outcome.url, "https://github.com/octo/hello/pull/7");
        assert!(outcome.branch.starts_with("feature/add-tests-"));
        assert!(outcome.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_missing_base_ref_stops_before_branch_creation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/hello"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/hello/git/ref/heads/main"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = create_pull_request_data(
            &client(&server),
            Some(TOKEN),
            request(&["a.ts"]),
            CommitPolicy::Abort,
        )
        .await
        .unwrap_err();

        let failure = err.contribution().unwrap();
        assert_eq!(failure.step, Step::FetchBaseRef);
        assert_eq!(failure.progress.branch, None);
        assert!(matches!(err, Error::RemoteStepFailure(_)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("fetch_base_ref"));
        assert!(err.to_string().contains("Not Found"));
    }

    #[tokio::test]
    async fn test_existing_branch_is_conflict() {
        let server = MockServer::start().await;
        mount_repo_and_ref(&server).await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/hello/git/refs"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "Reference already exists"
            })))
            .mount(&server)
            .await;

        let err = create_pull_request_data(
            &client(&server),
            Some(TOKEN),
            request(&["a.ts"]),
            CommitPolicy::Abort,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_failed_commit_aborts_and_reports_progress() {
        let server = MockServer::start().await;
        mount_repo_and_ref(&server).await;
        mount_create_branch(&server).await;
        Mock::given(method("PUT"))
            .and(path("/repos/octo/hello/contents/tests/generated/a.ts.test.js"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/octo/hello/contents/tests/generated/b.ts.test.js"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"message": "Invalid request"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/hello/pulls"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = create_pull_request_data(
            &client(&server),
            Some(TOKEN),
            request(&["a.ts", "b.ts"]),
            CommitPolicy::Abort,
        )
        .await
        .unwrap_err();

        let failure = err.contribution().unwrap();
        assert_eq!(failure.step, Step::CommitFiles);
        assert!(failure.progress.branch.is_some());
        assert_eq!(failure.progress.committed, vec!["a.ts".to_string()]);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_continue_policy_skips_failed_commit() {
        let server = MockServer::start().await;
        mount_repo_and_ref(&server).await;
        mount_create_branch(&server).await;
        Mock::given(method("PUT"))
            .and(path("/repos/octo/hello/contents/tests/generated/a.ts.test.js"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/octo/hello/contents/tests/generated/b.ts.test.js"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/hello/pulls"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "html_url": "https://github.com/octo/hello/pull/8"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = create_pull_request_data(
            &client(&server),
            Some(TOKEN),
            request(&["a.ts", "b.ts"]),
            CommitPolicy::Continue,
        )
        .await
        .unwrap();

        assert_eq!(outcome.url, "https://github.com/octo/hello/pull/8");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].file, "a.ts");
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_remote_call() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = create_pull_request_data(
            &client(&server),
            None,
            request(&["a.ts"]),
            CommitPolicy::Abort,
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_repo_and_empty_files_are_bad_requests() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let client = client(&server);

        let mut bad_repo = request(&["a.ts"]);
        bad_repo.repo = "not-a-slug".to_string();
        let err = create_pull_request_data(&client, Some(TOKEN), bad_repo, CommitPolicy::Abort)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = create_pull_request_data(&client, Some(TOKEN), request(&[]), CommitPolicy::Abort)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_traversing_file_name_never_reaches_github() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let request = request(&["src/a.ts", "../../../../other/repo/contents/evil"]);
        let err = create_pull_request_data(
            &client(&server),
            Some(TOKEN),
            request,
            CommitPolicy::Continue,
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("../../../../other/repo/contents/evil"));
    }
}
