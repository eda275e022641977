//! Summary pipeline: prompt construction, JSON extraction and schema validation.

pub mod extract;
pub mod prompt;
pub mod types;
pub mod validate;

pub use extract::{extract_json_array, ExtractError};
pub use prompt::build_summary_prompt;
pub use types::{FileField, FileInput, SummariesOutput, SummaryRequest, TestSummary, ValidationMode};
pub use validate::{normalize_file_field, validate_summaries, SchemaError};
