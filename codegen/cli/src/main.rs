//! `codegen-ts` - generate a typed API client for a Flotiq project.

mod credential;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use codegen_lib::{
    CodegenConfig, JsonFingerprintFile, Pipeline, PipelineError, RemoteClient, Watcher,
};
use owo_colors::OwoColorize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to determine current directory: {0}")]
    CurrentDir(std::io::Error),

    #[error("no API key provided; pass --flotiq-api-key or set {}", credential::API_KEY_ENV)]
    MissingApiKey,

    #[error("failed to read {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("prompt failed: {0}")]
    Prompt(#[from] inquire::InquireError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Generate a typed Fetch API client for your Flotiq project.
#[derive(Debug, Parser)]
#[command(name = "codegen-ts", version, about)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate the API client for your Flotiq project
    Generate(GenerateArgs),
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Flotiq API key (read-only key is enough)
    #[arg(long = "flotiq-api-key", value_name = "KEY")]
    flotiq_api_key: Option<String>,

    /// Regenerate the client whenever the content schema changes
    #[arg(short, long)]
    watch: bool,

    /// Suppress console output and never prompt
    #[arg(short, long)]
    silent: bool,

    /// Compile the client to JavaScript
    #[arg(short = 'c', long = "compiled-js")]
    compiled_js: bool,
}

fn init_tracing(verbose: u8, writer: output::LogWriter) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn,codegen_lib=info".to_string(),
            1 => "info,codegen_lib=debug".to_string(),
            2 => "debug,codegen_lib=trace".to_string(),
            _ => "trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbose >= 2)
                .with_level(true)
                .with_file(verbose >= 3)
                .with_line_number(verbose >= 3)
                .with_writer(writer)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let Commands::Generate(args) = cli.command;

    let log_writer = output::LogWriter::default();
    // Silent mode installs no subscriber at all.
    if !args.silent {
        init_tracing(cli.verbose, log_writer.clone());
    }

    let silent = args.silent;
    match run(args, &log_writer).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !silent {
                eprintln!("{} {e}", "An error occurred:".red());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: GenerateArgs, log_writer: &output::LogWriter) -> Result<(), CliError> {
    let cwd = std::env::current_dir().map_err(CliError::CurrentDir)?;
    let api_key = credential::resolve(args.flotiq_api_key.as_deref(), &cwd, args.silent)?;

    let config = CodegenConfig::from_env(cwd).with_compile(args.compiled_js);
    let client = RemoteClient::from_config(&config, api_key);
    let pipeline = Pipeline::from_config(client, &config);

    if args.watch {
        watch(pipeline, &config, args.silent, log_writer).await;
        return Ok(());
    }

    pipeline.run().await?;
    if !args.silent {
        output::print_generated(pipeline.destination());
    }
    Ok(())
}

/// Polls until Ctrl-C. Failures inside the loop are reported, not returned.
async fn watch(
    pipeline: Pipeline<RemoteClient>,
    config: &CodegenConfig,
    silent: bool,
    log_writer: &output::LogWriter,
) {
    let (tx, mut rx) = mpsc::channel(32);
    let watcher = Watcher::new(
        pipeline,
        JsonFingerprintFile::new(config.fingerprint_file.clone()),
    )
    .with_events(tx);

    let spinner = (!silent).then(|| output::spinner("Watching for changes ..."));
    if let Some(spinner) = &spinner {
        log_writer.attach(spinner.clone());
    }
    let reporter = {
        let spinner = spinner.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if !silent {
                    output::report_event(spinner.as_ref(), &event);
                }
            }
        })
    };

    let summary = watcher
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    // Closes the event channel so the reporter drains and exits.
    drop(watcher);
    if let Err(e) = reporter.await {
        tracing::warn!(error = %e, "Event reporter stopped unexpectedly");
    }

    log_writer.detach();
    tracing::debug!(
        ticks = summary.ticks,
        regenerations = summary.regenerations,
        failures = summary.failures,
        "Watch summary"
    );

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    if !silent {
        output::print_terminated();
    }
}
