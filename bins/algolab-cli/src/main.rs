mod commands;

use algolab_common::config::EngineConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "algolab-cli")]
#[command(about = "AlgoLab CLI - Run and grade JavaScript exercise submissions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a submission against an exercise's test cases
    Grade {
        /// Exercise JSON file
        #[arg(short, long)]
        exercise: PathBuf,

        /// Submission source file (defaults to the exercise's starter code)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Function to call (defaults to the first declared function)
        #[arg(short, long)]
        function: Option<String>,

        /// Print the full report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Run one function call and print the execution result
    Run {
        /// Source file
        #[arg(short, long)]
        source: PathBuf,

        /// Function to call
        #[arg(short, long)]
        function: Option<String>,

        /// Input as JSON text
        #[arg(short, long, default_value = "null")]
        input: String,

        /// Spread a JSON array input into positional arguments
        #[arg(long, default_value = "false")]
        spread: bool,
    },

    /// Grade every exercise's reference solution
    Verify {
        /// Exercise file or directory of exercise files
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Write a default engine configuration
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Result<EngineConfig> {
    EngineConfig::load_default().context("Failed to load engine configuration")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let success = match cli.command {
        Commands::Grade {
            exercise,
            source,
            function,
            json,
        } => {
            let config = load_config()?;
            commands::grade(&config, &exercise, source.as_deref(), function.as_deref(), json)?
        }
        Commands::Run {
            source,
            function,
            input,
            spread,
        } => {
            let config = load_config()?;
            commands::run(&config, &source, function.as_deref(), &input, spread)?
        }
        Commands::Verify { path } => {
            let config = load_config()?;
            commands::verify(&config, &path).await?
        }
        Commands::Init { path } => {
            commands::init_project(&path)?;
            true
        }
    };

    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
