use serde::{Deserialize, Serialize};

/// A source file submitted for summarisation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FileInput {
    /// File name as shown to the model (usually a repository path).
    pub filename: String,
    /// File content. Only a bounded excerpt reaches the prompt.
    pub content: String,
}

/// A request to summarise the test cases for a set of files.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SummaryRequest {
    pub files: Vec<FileInput>,
}

/// A normalized test-case summary.
///
/// `file` is always a single string once it leaves the validator: lists are
/// joined with `", "`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TestSummary {
    pub title: String,
    pub description: String,
    pub framework: Option<String>,
    pub file: Option<String>,
}

/// Response payload for the summaries pipeline.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SummariesOutput {
    pub summaries: Vec<TestSummary>,
}

/// The shapes a model may use for the `file` field.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum FileField {
    Single(String),
    Many(Vec<String>),
}

impl FileField {
    /// Collapse the field to the single-string output contract.
    pub fn normalize(self) -> String {
        match self {
            FileField::Single(file) => file,
            FileField::Many(files) => files.join(", "),
        }
    }
}

/// How strictly the `file` field is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// `file` may be missing; it is reported as `null`.
    #[default]
    Lenient,
    /// Every summary must name the file(s) it covers.
    Strict,
}
