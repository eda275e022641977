//! GitHub transformations: API shapes, repository slugs and the contribution workflow.

pub mod contribution;
pub mod slug;
pub mod types;

pub use contribution::{
    ApiCall, CommitPolicy, ContributionFailure, ContributionRequest, GeneratedFile, Method,
    Progress, PullRequestOutcome, SkippedFile, State, Step, StepCause, Workflow,
};
pub use slug::{RepoSlug, SlugError};
pub use types::{
    transform_contents, transform_repositories, transform_user, ContentsOutput, GitHubRepository,
    GitHubUser, LoginOutput, OAuthTokenResponse, RepositoryOutput, UserOutput,
};
