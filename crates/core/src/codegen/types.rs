use serde::{Deserialize, Serialize};

/// A request for runnable test code covering one summary.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CodeRequest {
    /// Free-text test-case summary (usually a `TestSummary` rendered by the client).
    pub summary: String,
    /// Target test framework, e.g. "Jest" or "pytest".
    pub framework: String,
}

/// Response payload for the code-generation pipeline.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CodeOutput {
    pub code: String,
}
