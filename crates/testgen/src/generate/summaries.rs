use std::path::PathBuf;

use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use testgen_core::summary::{
    build_summary_prompt, extract_json_array, validate_summaries, FileInput, SummariesOutput,
    SummaryRequest, ValidationMode,
};

use crate::config::{LlmConfig, LlmOptions};
use crate::llm::{HttpBackend, ModelBackend};

#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # Summarise the tests for two files with the local Ollama server:
  testgen generate summaries src/math.ts src/strings.ts

  # Use a hosted backend and require every summary to name its file:
  testgen generate summaries src/app.py --backend openai --summary-model gpt-4o-mini --strict")]
pub struct SummariesOptions {
    /// Source files to summarise
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Reject summaries that do not name the file they cover
    #[arg(long)]
    pub strict: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[clap(flatten)]
    pub llm: LlmOptions,
}

/// Run the summaries pipeline: prompt, dispatch, extract, validate.
///
/// Shared by the CLI handler and the HTTP route.
pub async fn summaries_data(
    backend: &dyn ModelBackend,
    model: &str,
    request: SummaryRequest,
    mode: ValidationMode,
) -> Result<SummariesOutput, Error> {
    if request.files.is_empty() {
        return Err(Error::BadRequest(
            "At least one file is required to generate summaries".to_string(),
        ));
    }

    let prompt = build_summary_prompt(&request.files);
    log::info!(
        "Requesting summaries for {} file(s) from {}",
        request.files.len(),
        backend.name()
    );

    let raw = backend.send(&prompt, model).await?;
    let records = extract_json_array(&raw).inspect_err(|e| log::warn!("{e}"))?;
    let summaries = validate_summaries(records, mode).inspect_err(|e| log::warn!("{e}"))?;

    log::info!("Model produced {} summary(ies)", summaries.len());
    Ok(SummariesOutput { summaries })
}

fn read_files(paths: &[PathBuf]) -> Result<Vec<FileInput>> {
    paths
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
            Ok(FileInput {
                filename: path.display().to_string(),
                content,
            })
        })
        .collect()
}

pub async fn handler(options: SummariesOptions, global: crate::Global) -> Result<()> {
    let files = read_files(&options.paths)?;
    let config = LlmConfig::from(options.llm);
    let backend = HttpBackend::new(&config)?;
    let mode = if options.strict {
        ValidationMode::Strict
    } else {
        ValidationMode::Lenient
    };

    if global.verbose {
        eprintln!(
            "Sending {} file(s) to {} ({})",
            files.len(),
            config.provider,
            config.models.summary
        );
    }

    let spinner = super::spinner("Generating test summaries...");
    let result = summaries_data(
        &backend,
        &config.models.summary,
        SummaryRequest { files },
        mode,
    )
    .await;
    spinner.finish_and_clear();
    let data = result?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!(
        "\nGenerated {} test summary(ies):\n",
        data.summaries.len().to_string().bold()
    );

    let mut table = new_table();
    table.add_row(prettytable::row!["#", "Title", "Framework", "File"]);
    for (idx, summary) in data.summaries.iter().enumerate() {
        table.add_row(prettytable::row![
            idx + 1,
            summary.title.bold(),
            summary.framework.as_deref().unwrap_or("-"),
            summary.file.as_deref().unwrap_or("-")
        ]);
    }
    table.printstd();

    for (idx, summary) in data.summaries.iter().enumerate() {
        println!(
            "\n{} {}\n  {}",
            format!("[{}]", idx + 1).yellow().bold(),
            summary.title.white().bold(),
            summary.description
        );
    }

    Ok(())
}
