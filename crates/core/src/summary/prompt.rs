use super::types::FileInput;
use crate::text::truncate;

/// Characters of each file that are shown to the model.
pub const EXCERPT_CHARS: usize = 4000;

const SUMMARY_INSTRUCTIONS: &str = r#"You are an expert software tester. Your only task is to generate a list of high-level test case summaries based on the provided code files.

The output MUST be a valid JSON array of objects. Do not include any text, conversation, or explanations outside of the JSON.

Example of the required output format:
```json
[
  {
    "title": "Verify user authentication flow",
    "description": "Tests the user login and logout process with valid and invalid credentials.",
    "framework": "Jest",
    "file": "auth.js"
  },
  {
    "title": "Validate data fetching logic",
    "description": "Tests the component's ability to fetch and display data from the API correctly.",
    "framework": "Jest",
    "file": "data-component.tsx"
  }
]
```

Here are the code files to analyze:"#;

/// Markdown fence tag for a file name, based on its extension.
pub fn fence_language(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "kt" => "kotlin",
        "cs" => "csharp",
        _ => "",
    }
}

/// Render one file as a fenced prompt section.
fn render_file(file: &FileInput) -> String {
    format!(
        "### File: {}\n```{}\n{}\n```",
        file.filename,
        fence_language(&file.filename),
        truncate(&file.content, EXCERPT_CHARS)
    )
}

/// Build the summary prompt for a set of files.
pub fn build_summary_prompt(files: &[FileInput]) -> String {
    let sections = files
        .iter()
        .map(render_file)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{SUMMARY_INSTRUCTIONS}\n{sections}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content: &str) -> FileInput {
        FileInput {
            filename: name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_fence_language_known_extensions() {
        assert_eq!(fence_language("src/a.ts"), "typescript");
        assert_eq!(fence_language("App.TSX"), "typescript");
        assert_eq!(fence_language("index.js"), "javascript");
        assert_eq!(fence_language("main.py"), "python");
        assert_eq!(fence_language("lib.rs"), "rust");
    }

    #[test]
    fn test_fence_language_unknown_or_missing() {
        assert_eq!(fence_language("Makefile"), "");
        assert_eq!(fence_language("notes.txt"), "");
    }

    #[test]
    fn test_prompt_contains_every_file() {
        let prompt = build_summary_prompt(&[
            file("a.ts", "export const x = 1"),
            file("b.py", "def f(): pass"),
        ]);

        assert!(prompt.contains("### File: a.ts\n```typescript\nexport const x = 1\n```"));
        assert!(prompt.contains("### File: b.py\n```python\ndef f(): pass\n```"));
        assert!(prompt.starts_with("You are an expert software tester."));
    }

    #[test]
    fn test_prompt_truncates_long_content() {
        let long = "x".repeat(EXCERPT_CHARS + 500);
        let prompt = build_summary_prompt(&[file("big.js", &long)]);

        assert!(prompt.contains(&"x".repeat(EXCERPT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(EXCERPT_CHARS + 1)));
    }
}
