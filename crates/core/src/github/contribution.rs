//! The pull-request contribution workflow as a pure state machine.
//!
//! The workflow runs `FetchRepoInfo → FetchBaseRef → CreateBranch →
//! CommitFiles (once per file) → OpenPullRequest → Done`. Each step needs the
//! identifiers returned by the previous one, so the machine hands out one
//! [`ApiCall`] at a time and waits to be told how it went. The caller owns the
//! HTTP transport; this module never performs I/O.
//!
//! A failed step moves the machine to `Failed` and no further calls are
//! produced. Remote changes already made (the branch, earlier commits) are left
//! in place and reported through [`Progress`].

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::slug::RepoSlug;

/// Used when the repository metadata has no `default_branch`.
pub const DEFAULT_BRANCH_FALLBACK: &str = "main";

pub const BRANCH_PREFIX: &str = "feature/add-tests-";

/// Directory that receives generated test files.
pub const TESTS_DIR: &str = "tests/generated";

pub const PR_TITLE: &str = "feat: Add auto-generated tests";

pub const PR_BODY: &str =
    "This PR introduces a suite of generated test cases to improve code coverage.";

/// Generated test code destined for the target repository.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GeneratedFile {
    /// Identifier of the source file the tests cover.
    pub file: String,
    pub code: String,
}

/// Body of a create-PR request.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ContributionRequest {
    /// Target repository as `owner/name`.
    pub repo: String,
    pub files: Vec<GeneratedFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    FetchRepoInfo,
    FetchBaseRef,
    CreateBranch,
    CommitFiles,
    OpenPullRequest,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::FetchRepoInfo => "fetch_repo_info",
            Step::FetchBaseRef => "fetch_base_ref",
            Step::CreateBranch => "create_branch",
            Step::CommitFiles => "commit_files",
            Step::OpenPullRequest => "open_pull_request",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

/// One GitHub REST call requested by the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub step: Step,
    pub method: Method,
    /// Path relative to the API root, starting with `/`.
    pub path: String,
    pub body: Option<Value>,
}

/// What to do when committing one of several files fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitPolicy {
    /// Stop the workflow at the first failed commit.
    #[default]
    Abort,
    /// Record the file as skipped and keep going. The pull request is still
    /// opened as long as one file made it.
    Continue,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
#[error("Unknown commit policy '{0}'. Expected 'abort' or 'continue'")]
pub struct UnknownCommitPolicy(pub String);

impl FromStr for CommitPolicy {
    type Err = UnknownCommitPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(CommitPolicy::Abort),
            "continue" => Ok(CommitPolicy::Continue),
            other => Err(UnknownCommitPolicy(other.to_string())),
        }
    }
}

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepCause {
    /// GitHub answered with a non-2xx status.
    Status { status: u16, detail: String },
    /// The request never got an answer (connection, DNS, timeout).
    Transport { detail: String },
    /// GitHub answered 2xx without a field the next step needs.
    MalformedResponse { detail: String },
    /// The caller stopped driving the workflow mid-way.
    Interrupted,
}

impl StepCause {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StepCause::Status { status: 409, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            StepCause::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for StepCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepCause::Status { status, detail } => {
                write!(f, "GitHub API Error [{status}]: {detail}")
            }
            StepCause::Transport { detail } => write!(f, "GitHub unreachable: {detail}"),
            StepCause::MalformedResponse { detail } => {
                write!(f, "Unexpected GitHub response: {detail}")
            }
            StepCause::Interrupted => f.write_str("workflow stopped before completing this step"),
        }
    }
}

/// A file whose commit failed under [`CommitPolicy::Continue`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// Remote changes made so far. Nothing here is rolled back on failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Progress {
    /// Set once the branch exists on the remote.
    pub branch: Option<String>,
    /// Files committed to the branch, in order.
    pub committed: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// Terminal failure of the workflow.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
#[error("Step '{step}' failed: {cause}")]
pub struct ContributionFailure {
    pub step: Step,
    pub cause: StepCause,
    pub progress: Progress,
}

impl ContributionFailure {
    pub fn is_conflict(&self) -> bool {
        self.cause.is_conflict()
    }
}

/// Successful workflow result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestOutcome {
    /// Browsable URL of the pull request.
    pub url: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    FetchRepoInfo,
    FetchBaseRef { base: String },
    CreateBranch { base: String, sha: String },
    CommitFiles { base: String, index: usize },
    OpenPullRequest { base: String },
    Done { url: String },
    Failed { step: Step, cause: StepCause },
}

impl State {
    /// Step the state is waiting on, `None` once terminal.
    pub fn step(&self) -> Option<Step> {
        match self {
            State::FetchRepoInfo => Some(Step::FetchRepoInfo),
            State::FetchBaseRef { .. } => Some(Step::FetchBaseRef),
            State::CreateBranch { .. } => Some(Step::CreateBranch),
            State::CommitFiles { .. } => Some(Step::CommitFiles),
            State::OpenPullRequest { .. } => Some(Step::OpenPullRequest),
            State::Done { .. } | State::Failed { .. } => None,
        }
    }
}

/// Branch name for a given random suffix.
pub fn branch_name(suffix: &str) -> String {
    format!("{BRANCH_PREFIX}{suffix}")
}

/// Repository path of the generated test file for `file`.
pub fn test_file_path(file: &str) -> String {
    format!("{TESTS_DIR}/{file}.test.js")
}

pub fn commit_message(file: &str) -> String {
    format!("feat: Add generated test for {file}")
}

/// Percent-encode each segment of a repository path, keeping the slashes.
pub fn encode_repo_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `path` stays inside the directory it is joined to.
///
/// Rejects empty input, a leading `/`, empty segments and `.`/`..` segments,
/// which URL resolution would otherwise collapse.
pub fn is_contained_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Base64 body expected by the contents API.
pub fn encode_content(code: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(code.as_bytes())
}

/// The workflow for one contribution attempt.
#[derive(Debug, Clone)]
pub struct Workflow {
    repo: RepoSlug,
    files: Vec<GeneratedFile>,
    branch: String,
    policy: CommitPolicy,
    state: State,
    progress: Progress,
}

impl Workflow {
    pub fn new(
        repo: RepoSlug,
        files: Vec<GeneratedFile>,
        branch_suffix: &str,
        policy: CommitPolicy,
    ) -> Self {
        Self {
            repo,
            files,
            branch: branch_name(branch_suffix),
            policy,
            state: State::FetchRepoInfo,
            progress: Progress::default(),
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// The next call to perform, or `None` once the workflow is terminal.
    pub fn next_call(&self) -> Option<ApiCall> {
        let repo = self.repo.api_path();

        match &self.state {
            State::FetchRepoInfo => Some(ApiCall {
                step: Step::FetchRepoInfo,
                method: Method::Get,
                path: repo,
                body: None,
            }),
            State::FetchBaseRef { base } => Some(ApiCall {
                step: Step::FetchBaseRef,
                method: Method::Get,
                path: format!("{repo}/git/ref/heads/{base}"),
                body: None,
            }),
            State::CreateBranch { sha, .. } => Some(ApiCall {
                step: Step::CreateBranch,
                method: Method::Post,
                path: format!("{repo}/git/refs"),
                body: Some(json!({
                    "ref": format!("refs/heads/{}", self.branch),
                    "sha": sha,
                })),
            }),
            State::CommitFiles { index, .. } => {
                let file = &self.files[*index];
                Some(ApiCall {
                    step: Step::CommitFiles,
                    method: Method::Put,
                    path: format!(
                        "{repo}/contents/{}",
                        encode_repo_path(&test_file_path(&file.file))
                    ),
                    body: Some(json!({
                        "message": commit_message(&file.file),
                        "content": encode_content(&file.code),
                        "branch": self.branch,
                    })),
                })
            }
            State::OpenPullRequest { base } => Some(ApiCall {
                step: Step::OpenPullRequest,
                method: Method::Post,
                path: format!("{repo}/pulls"),
                body: Some(json!({
                    "title": PR_TITLE,
                    "body": PR_BODY,
                    "head": self.branch,
                    "base": base,
                })),
            }),
            State::Done { .. } | State::Failed { .. } => None,
        }
    }

    /// Advance after a 2xx response carrying `body`.
    pub fn on_success(&mut self, body: &Value) {
        let state = std::mem::replace(&mut self.state, State::FetchRepoInfo);

        self.state = match state {
            State::FetchRepoInfo => {
                let base = body
                    .get("default_branch")
                    .and_then(Value::as_str)
                    .filter(|branch| !branch.is_empty())
                    .unwrap_or(DEFAULT_BRANCH_FALLBACK)
                    .to_string();
                State::FetchBaseRef { base }
            }
            State::FetchBaseRef { base } => {
                match body.pointer("/object/sha").and_then(Value::as_str) {
                    Some(sha) => State::CreateBranch {
                        base,
                        sha: sha.to_string(),
                    },
                    None => State::Failed {
                        step: Step::FetchBaseRef,
                        cause: StepCause::MalformedResponse {
                            detail: format!("ref for '{base}' has no object.sha"),
                        },
                    },
                }
            }
            State::CreateBranch { base, .. } => {
                self.progress.branch = Some(self.branch.clone());
                if self.files.is_empty() {
                    State::OpenPullRequest { base }
                } else {
                    State::CommitFiles { base, index: 0 }
                }
            }
            State::CommitFiles { base, index } => {
                self.progress.committed.push(self.files[index].file.clone());
                self.after_commit(base, index, None)
            }
            State::OpenPullRequest { .. } => {
                match body.get("html_url").and_then(Value::as_str) {
                    Some(url) => State::Done {
                        url: url.to_string(),
                    },
                    None => State::Failed {
                        step: Step::OpenPullRequest,
                        cause: StepCause::MalformedResponse {
                            detail: "pull request has no html_url".to_string(),
                        },
                    },
                }
            }
            terminal @ (State::Done { .. } | State::Failed { .. }) => terminal,
        };
    }

    /// Record a failed call for the current step.
    pub fn on_failure(&mut self, cause: StepCause) {
        let state = std::mem::replace(&mut self.state, State::FetchRepoInfo);

        self.state = match state {
            State::CommitFiles { base, index } if self.policy == CommitPolicy::Continue => {
                self.progress.skipped.push(SkippedFile {
                    file: self.files[index].file.clone(),
                    reason: cause.to_string(),
                });
                self.after_commit(base, index, Some(cause))
            }
            terminal @ (State::Done { .. } | State::Failed { .. }) => terminal,
            active => State::Failed {
                step: active.step().unwrap_or(Step::FetchRepoInfo),
                cause,
            },
        };
    }

    fn after_commit(&self, base: String, index: usize, last_failure: Option<StepCause>) -> State {
        let next = index + 1;
        if next < self.files.len() {
            return State::CommitFiles { base, index: next };
        }

        match last_failure {
            Some(cause) if self.progress.committed.is_empty() => State::Failed {
                step: Step::CommitFiles,
                cause,
            },
            _ => State::OpenPullRequest { base },
        }
    }

    /// Consume the workflow and report its result.
    pub fn finish(self) -> Result<PullRequestOutcome, ContributionFailure> {
        match self.state {
            State::Done { url } => Ok(PullRequestOutcome {
                url,
                branch: self.branch,
                skipped: self.progress.skipped,
            }),
            State::Failed { step, cause } => Err(ContributionFailure {
                step,
                cause,
                progress: self.progress,
            }),
            active => Err(ContributionFailure {
                step: active.step().unwrap_or(Step::FetchRepoInfo),
                cause: StepCause::Interrupted,
                progress: self.progress,
            }),
        }
    }
}
