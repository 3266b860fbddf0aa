use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use sustainlens::{
    config, logging,
    pipeline::{AnalysisApi, AnalysisInput, AnalysisService},
};

#[derive(Parser)]
#[command(
    name = "sdg-cli",
    about = "Run the SustainLens pipeline from the command line and print JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a page and print its bounded paragraph text.
    Scrape { url: String },
    /// Classify, extract keywords and store results for a URL or a local PDF.
    Analyze(AnalyzeArgs),
    /// Print the most recently stored classification.
    Latest,
    /// Print the embedding of a text.
    Embed { text: String },
}

#[derive(Args)]
struct AnalyzeArgs {
    #[arg(long, conflicts_with = "pdf")]
    url: Option<String>,
    #[arg(long)]
    pdf: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_cli_tracing();

    let service = AnalysisService::from_config(config::get_config())
        .await
        .context("initializing analysis service")?;

    let output = match cli.command {
        Command::Scrape { url } => {
            let document = service.scrape(&url).await?;
            json!({ "extracted_text": document.text })
        }
        Command::Analyze(args) => {
            let report = service.analyze(analysis_input(args)?).await?;
            serde_json::to_value(&report)?
        }
        Command::Latest => {
            json!({ "stored_data": service.retrieve_classifications().await? })
        }
        Command::Embed { text } => {
            let embedding = service.generate_embedding(&text).await?;
            json!({ "dimensions": embedding.len(), "embedding": embedding })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn analysis_input(args: AnalyzeArgs) -> Result<AnalysisInput> {
    match (args.url, args.pdf) {
        (Some(url), _) => Ok(AnalysisInput::Url(url)),
        (None, Some(path)) => {
            let bytes =
                fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.pdf".to_string());
            Ok(AnalysisInput::Pdf { filename, bytes })
        }
        (None, None) => bail!("either --url or --pdf is required"),
    }
}
