//! shotlens: analyze recognized screenshot text from the command line.
//!
//! Input is a recognition dump (serialized `RecognitionOutput` or a bare
//! array of text blocks), as produced by a platform OCR service.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use shotlens_analysis::HeuristicReconstructor;
use shotlens_cli::{
    build_pipeline, load_dump, load_recognition, render, OutputFormat, ReplayRecognizer,
};
use shotlens_core::ImageInput;
use shotlens_jobs::{AnalysisMode, AnalysisService, ServiceConfig};

#[derive(Parser)]
#[command(name = "shotlens")]
#[command(author, version, about = "Screenshot understanding from recognized text")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis pipeline on a recognition dump
    Analyze {
        /// Recognition dump (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Image identifier (default: the input file stem)
        #[arg(long)]
        id: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Ollama model for reconstruction (default: SHOTLENS_OLLAMA_MODEL)
        #[arg(short, long)]
        model: Option<String>,

        /// Write logs to this file with daily rotation instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Print the heuristic document reconstruction only
    Reconstruct {
        /// Recognition dump or block array (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze {
            input,
            id,
            format,
            model,
            log_file,
        } => {
            let _guard = shotlens_cli::logging::init(log_file.as_deref());
            cmd_analyze(input, id, format, model).await
        }
        Commands::Reconstruct { input } => {
            let _guard = shotlens_cli::logging::init(None);
            cmd_reconstruct(input)
        }
    }
}

async fn cmd_analyze(
    input: PathBuf,
    id: Option<String>,
    format: OutputFormat,
    model: Option<String>,
) -> Result<()> {
    let (recognition, bytes) = load_dump(&input)?;
    let image_id = id.unwrap_or_else(|| {
        input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string()
    });
    info!(image_id = %image_id, blocks = recognition.blocks.len(), "Analyzing recognition dump");

    let service = AnalysisService::new(
        Arc::new(ReplayRecognizer::new(recognition)),
        build_pipeline(model).await,
        ServiceConfig::from_env(),
    );
    let outcome = service
        .analyze(ImageInput::new(image_id, bytes, 0, 0), AnalysisMode::Forced)
        .await?;

    println!("{}", render(outcome.result(), format)?);
    Ok(())
}

fn cmd_reconstruct(input: PathBuf) -> Result<()> {
    let recognition = load_recognition(&input)?;
    let document = HeuristicReconstructor::new().reconstruct(&recognition.blocks);
    println!("{}", document.markdown);
    Ok(())
}
