//! Repograph command-line entry point

use clap::{Parser, Subcommand};
use repograph::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

/// Repograph: inspect and maintain a repository document graph
#[derive(Parser, Debug)]
#[command(name = "repograph")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a stored document with its references resolved
    Get {
        /// Collection name (person, institution, entity, compilation, ...)
        collection: String,
        /// Document ID
        id: String,
        /// Follow references of referenced documents too
        #[arg(long)]
        deep: bool,
    },
    /// View an entity or compilation as a given caller
    View {
        /// "entity" or "compilation"
        kind: cli::GuardedKind,
        /// Document ID
        id: String,
        #[command(flatten)]
        caller: cli::CallerArgs,
    },
    /// Compose a compilation, hiding entities the caller may not see
    Compose {
        /// Compilation ID
        id: String,
        #[command(flatten)]
        caller: cli::CallerArgs,
    },
    /// Remove an owner from a person's or institution's relation maps
    Unlink {
        /// "person" or "institution"
        kind: cli::HolderKind,
        /// Person or institution ID
        id: String,
        /// Owning entity or compilation ID
        owner: String,
    },
    /// Delete persons and institutions no owner links to
    Sweep {
        /// Report orphans without deleting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Drop null and dangling references from an entity or compilation
    Prune {
        /// "entity" or "compilation"
        kind: cli::GuardedKind,
        /// Document ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = if let Some(path) = &args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    match args.command {
        Command::Get {
            collection,
            id,
            deep,
        } => cli::run_get(&config, collection, id, deep, args.json).await,
        Command::View { kind, id, caller } => {
            cli::run_view(&config, kind, id, caller, args.json).await
        }
        Command::Compose { id, caller } => cli::run_compose(&config, id, caller, args.json).await,
        Command::Unlink { kind, id, owner } => {
            cli::run_unlink(&config, kind, id, owner, args.json).await
        }
        Command::Sweep { dry_run } => cli::run_sweep(&config, dry_run, args.json).await,
        Command::Prune { kind, id } => cli::run_prune(&config, kind, id, args.json).await,
    }
}
