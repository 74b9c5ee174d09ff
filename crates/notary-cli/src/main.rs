//! # notary CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber and
//! dispatches to subcommand handlers. Command output goes to stdout as
//! JSON; logs go to stderr.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use notary_cli::context::{build_service, ServiceArgs};
use notary_cli::digest::{run_digest, DigestArgs};
use notary_cli::document::{run_pending, run_upload, run_validate, UploadArgs, ValidateArgs};
use notary_cli::reconcile::run_reconcile;

/// Document notary backed by a public timestamping calendar.
#[derive(Parser, Debug)]
#[command(name = "notary", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    service: ServiceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the SHA-256 digest of a file.
    Digest(DigestArgs),

    /// Notarize a file and print the upload receipt.
    Upload(UploadArgs),

    /// Resolve a document's proof now and print the validation report.
    Validate(ValidateArgs),

    /// Run one reconciliation pass over STAMPING documents.
    Reconcile,

    /// List documents awaiting confirmation.
    Pending,
}

fn init_tracing(verbose: u8, json: bool) {
    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<u8> {
    let mut stdout = std::io::stdout().lock();
    if let Commands::Digest(args) = &cli.command {
        return run_digest(args, &mut stdout);
    }

    let service = build_service(&cli.service).await?;
    match cli.command {
        Commands::Digest(_) => Ok(0),
        Commands::Upload(args) => run_upload(&service, &args, &mut stdout).await,
        Commands::Validate(args) => run_validate(&service, &args, &mut stdout).await,
        Commands::Reconcile => run_reconcile(&service, &mut stdout).await,
        Commands::Pending => run_pending(&service, &mut stdout).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "notary CLI starting");

    match dispatch(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
