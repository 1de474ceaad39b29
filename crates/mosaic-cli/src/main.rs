mod analyze;
mod extract;
mod prompt;

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mosaic")]
#[command(about = "Multi-platform public profile extraction")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract public profile data. Prompts for anything not given.
    Extract {
        /// Username or search pattern used on every selected platform.
        #[arg(long)]
        pattern: Option<String>,
        /// Platform numbers or names, comma separated, or `all`.
        #[arg(long)]
        platforms: Option<String>,
        /// Fixed candidate selection for search-based platforms (`1,3`, `all`).
        #[arg(long)]
        select: Option<String>,
        /// Overrides `MOSAIC_RESULTS_DIR`.
        #[arg(long)]
        results_dir: Option<PathBuf>,
    },
    /// List supported platforms.
    Platforms,
    /// Analyze an extracted document with a local Ollama model.
    Analyze {
        /// Prompt template name (file stem under the prompts directory).
        #[arg(long)]
        prompt: Option<String>,
        /// Result file name under the results directory.
        #[arg(long)]
        data: Option<String>,
        /// Ollama model; defaults to `MOSAIC_OLLAMA_MODEL`.
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", console::style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = mosaic_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Extract {
            pattern,
            platforms,
            select,
            results_dir,
        }) => {
            let args = extract::ExtractArgs {
                pattern,
                platforms,
                select,
                results_dir,
            };
            with_interrupt(async move { extract::run_extract(&config, args).await }).await
        }
        Some(Commands::Platforms) => {
            extract::print_platforms();
            Ok(())
        }
        Some(Commands::Analyze {
            prompt,
            data,
            model,
        }) => {
            let args = analyze::AnalyzeArgs {
                prompt,
                data,
                model,
            };
            with_interrupt(async move { analyze::run_analyze(&config, args).await }).await
        }
        None => {
            let args = extract::ExtractArgs::default();
            with_interrupt(async move { extract::run_extract(&config, args).await }).await
        }
    }
}

/// How a raced task ended.
#[derive(Debug)]
enum Finished {
    Completed(anyhow::Result<()>),
    Interrupted,
}

/// Run `task` on its own tokio task and race it against `interrupt`.
///
/// The task may block its worker thread on a prompt; the race is still
/// polled from here.
async fn race_interrupt<F, I>(task: F, interrupt: I) -> anyhow::Result<Finished>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
    I: Future<Output = std::io::Result<()>>,
{
    let handle = tokio::spawn(task);
    tokio::select! {
        joined = handle => Ok(Finished::Completed(joined?)),
        signal = interrupt => {
            signal?;
            Ok(Finished::Interrupted)
        }
    }
}

/// Ctrl-C exits with status 130 immediately, even while a prompt is open.
async fn with_interrupt<F>(task: F) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    match race_interrupt(task, tokio::signal::ctrl_c()).await? {
        Finished::Completed(result) => result,
        Finished::Interrupted => {
            tracing::info!("interrupted by user");
            eprintln!("\n{}", console::style("interrupted by user").yellow());
            std::process::exit(130);
        }
    }
}
