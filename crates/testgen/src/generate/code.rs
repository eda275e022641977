use crate::prelude::{eprintln, println, *};
use testgen_core::codegen::{build_code_prompt, strip_code_fences, CodeOutput, CodeRequest};

use crate::config::{LlmConfig, LlmOptions};
use crate::llm::{DispatchError, HttpBackend, ModelBackend};

#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # Write a Jest test for a summary:
  testgen generate code --summary \"add() returns the sum of two numbers\" --framework Jest

  # Read the summary from a file and save the code:
  testgen generate code --summary \"$(cat summary.txt)\" --framework pytest > test_add.py")]
pub struct CodeOptions {
    /// Test-case summary to implement
    #[arg(long)]
    pub summary: String,

    /// Target test framework (Jest, pytest, ...)
    #[arg(long)]
    pub framework: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[clap(flatten)]
    pub llm: LlmOptions,
}

/// Run the code pipeline: prompt, dispatch, strip fences.
pub async fn code_data(
    backend: &dyn ModelBackend,
    model: &str,
    request: CodeRequest,
) -> Result<CodeOutput, Error> {
    if request.summary.trim().is_empty() {
        return Err(Error::BadRequest("A test summary is required".to_string()));
    }
    if request.framework.trim().is_empty() {
        return Err(Error::BadRequest("A test framework is required".to_string()));
    }

    let prompt = build_code_prompt(&request);
    log::info!(
        "Requesting {} test code from {}",
        request.framework.trim(),
        backend.name()
    );

    let raw = backend.send(&prompt, model).await?;
    let code = strip_code_fences(&raw);

    // A reply that was nothing but fences is as useless as an empty one.
    if code.is_empty() {
        return Err(DispatchError::EmptyResponse {
            backend: backend.name(),
            model: model.to_string(),
        }
        .into());
    }

    Ok(CodeOutput { code })
}

pub async fn handler(options: CodeOptions, global: crate::Global) -> Result<()> {
    let config = LlmConfig::from(options.llm);
    let backend = HttpBackend::new(&config)?;

    if global.verbose {
        eprintln!(
            "Sending summary to {} ({})",
            config.provider, config.models.code
        );
    }

    let spinner = super::spinner("Generating test code...");
    let result = code_data(
        &backend,
        &config.models.code,
        CodeRequest {
            summary: options.summary,
            framework: options.framework,
        },
    )
    .await;
    spinner.finish_and_clear();
    let data = result?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{}", data.code);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::CannedBackend;

    fn request() -> CodeRequest {
        CodeRequest {
            summary: "add() returns the sum".to_string(),
            framework: "Jest".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fenced_reply_is_stripped() {
        let backend = CannedBackend::new("```js\ntest('adds', () => {});\n```");

        let output = code_data(&backend, "qwen2.5-coder:7b", request())
            .await
            .unwrap();

        assert_eq!(output.code, "test('adds', () => {});");
        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts[0].1, "qwen2.5-coder:7b");
        assert!(prompts[0].0.contains("Jest"));
        assert!(prompts[0].0.contains("add() returns the sum"));
    }

    #[tokio::test]
    async fn test_unfenced_reply_passes_through() {
        let backend = CannedBackend::new("def test_add():\n    assert add(1, 2) == 3");

        let output = code_data(&backend, "m", request()).await.unwrap();
        assert_eq!(output.code, "def test_add():\n    assert add(1, 2) == 3");
    }

    #[tokio::test]
    async fn test_fences_only_is_empty_output() {
        let backend = CannedBackend::new("```\n```");

        let err = code_data(&backend, "m", request()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyOutput(_)));
    }

    #[tokio::test]
    async fn test_blank_framework_is_bad_request() {
        let backend = CannedBackend::new("code");
        let mut request = request();
        request.framework = "   ".to_string();

        let err = code_data(&backend, "m", request).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(backend.calls(), 0);
    }
}
