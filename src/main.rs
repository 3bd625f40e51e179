use anyhow::Result;
use clap::{Parser, Subcommand};
use prompt_lab::{
    connect, generate_sample, Backend, CallMode, Config, InputMode, RunReport, Runner,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prompt-lab", version, about = "Run OpenAPI generation prompt experiments")]
struct Cli {
    /// Workspace root; results are written under it
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,
    /// Stream the response instead of waiting for it
    #[arg(long, global = true)]
    stream: bool,
    /// Model backend (overrides LLM)
    #[arg(long, global = true)]
    backend: Option<String>,
    /// Completion token budget (overrides LLM_MAX_TOKENS)
    #[arg(long, global = true)]
    max_tokens: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send an Apex class to the model
    Apex { file: PathBuf },
    /// Send a YAML experiment to the model
    Experiment { file: PathBuf },
    /// Send a file's text to the model unchanged
    Raw { file: PathBuf },
    /// Write a sample experiment file
    Sample {
        filename: String,
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

impl Command {
    fn title(&self) -> &'static str {
        match self {
            Command::Apex { .. } => "Send Apex class to LLM",
            Command::Experiment { .. } => "Send experiment to LLM",
            Command::Raw { .. } => "Send raw prompt to LLM",
            Command::Sample { .. } => "Generate sample experiment",
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(name) = &cli.backend {
        config.backend = Backend::resolve(name)?;
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.max_tokens = max_tokens;
    }
    if cli.stream {
        config.call_mode = CallMode::Streaming;
    }
    Ok(config)
}

async fn execute(cli: &Cli) -> Result<PathBuf> {
    let (mode, file) = match &cli.command {
        Command::Sample { filename, dir } => return Ok(generate_sample(dir, filename)?),
        Command::Apex { file } => (InputMode::SingleSource, file),
        Command::Experiment { file } => (InputMode::StructuredExperiment, file),
        Command::Raw { file } => (InputMode::RawPrompt, file),
    };

    let config = load_config(cli)?;
    debug!(backend = %config.backend, endpoint = %config.endpoint, "configuration loaded");
    let model = connect(&config)?;
    let runner = Runner::new(model, config, &cli.workspace);

    let RunReport { output_path, .. } = runner.run_file(mode, file).await?;
    Ok(output_path)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prompt_lab=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let title = cli.command.title();

    match execute(&cli).await {
        Ok(path) => {
            println!("{} command completed successfully: {}", title, path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{} command failed: {}", title, err);
            Ok(ExitCode::FAILURE)
        }
    }
}
