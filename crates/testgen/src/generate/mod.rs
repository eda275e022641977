pub mod code;
pub mod summaries;

use crate::prelude::{println, *};

/// Generate module app - root command
#[derive(Debug, clap::Parser)]
#[command(name = "generate")]
#[command(about = "Generate test summaries and test code with an LLM")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Summarise the test cases worth writing for a set of source files
    #[clap(name = "summaries")]
    Summaries(summaries::SummariesOptions),

    /// Write runnable test code for one test-case summary
    #[clap(name = "code")]
    Code(code::CodeOptions),
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Running generate command...");
    }

    match app.command {
        Commands::Summaries(options) => summaries::handler(options, global).await,
        Commands::Code(options) => code::handler(options, global).await,
    }
}

/// Spinner shown while waiting on the model.
pub(crate) fn spinner(message: &str) -> indicatif::ProgressBar {
    let spinner = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}
