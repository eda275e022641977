pub mod extract;
pub mod prompt;
pub mod types;

pub use extract::strip_code_fences;
pub use prompt::build_code_prompt;
pub use types::{CodeOutput, CodeRequest};
