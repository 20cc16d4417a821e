//! CLI application for batch image classification.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber, filter::LevelFilter};

use commands::{classify, config};

/// Classify every tagged image in a folder and write a text report
#[derive(Parser)]
#[command(name = "imgclass")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder containing the images to classify
    input_folder: PathBuf,

    /// Report file to write
    output_file: PathBuf,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of classes the model scores
    #[arg(long)]
    class_count: Option<usize>,

    /// ONNX model to run with the tract backend
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Record failing files in the report and keep going
    #[arg(long)]
    continue_on_error: bool,

    /// Fail unless the selected device is an accelerator
    #[arg(long)]
    require_accelerator: bool,

    /// Match image extensions case-insensitively
    #[arg(long)]
    ignore_case: bool,

    /// Also write a per-file CSV summary
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Usage errors exit with 1 rather than clap's default of 2
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    // Set up logging based on verbosity; RUST_LOG directives refine it
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = config::load(&cli)?;
    classify::run(&cli, &config)
}
