use anyhow::Result;
use clap::{Parser, Subcommand};
use pagesift_runtime::cli::{self, classify_cmd, doctor, extract_cmd};

#[derive(Parser)]
#[command(name = "pagesift")]
#[command(about = "Extract structured content from web pages, rendering them when needed")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a summary, metadata, links or text from a URL
    Extract(extract_cmd::ExtractArgs),

    /// Report whether a URL needs JavaScript rendering
    Classify(classify_cmd::ClassifyArgs),

    /// Check that a browser is available and the configuration is valid
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_tracing();

    match cli.command {
        Commands::Extract(args) => extract_cmd::run(args).await,
        Commands::Classify(args) => classify_cmd::run(args).await,
        Commands::Doctor => doctor::run().await,
    }
}
