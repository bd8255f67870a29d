//! Arbor CLI: the main entry point.
//!
//! Commands:
//! - `init`: write the default config
//! - `status`: show configuration and store status
//! - `import`: load fragments from a JSON file
//! - `assemble`: run one assembly pass for a session
//! - `diagrams`: list recent diagrams
//! - `show`: print a diagram payload
//! - `fragment`: show the diagrams a fragment belongs to

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "arbor",
    about = "Arbor: assembles thinking fragments into reasoning diagrams",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init,

    /// Show configuration and store status
    Status,

    /// Import fragments from a JSON array file
    Import {
        /// Path to the JSON file
        file: String,
    },

    /// Assemble diagrams from the session's fragments
    Assemble {
        /// Session the run belongs to
        #[arg(short, long)]
        session: String,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List recent diagrams
    Diagrams {
        /// Maximum number of diagrams to list
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Print a diagram's payload
    Show {
        /// Diagram id
        id: String,
    },

    /// Show which diagrams a fragment belongs to
    Fragment {
        /// Fragment id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Import { file } => commands::import::run(&file).await?,
        Commands::Assemble { session, json } => commands::assemble::run(&session, json).await?,
        Commands::Diagrams { limit } => commands::diagrams::list(limit).await?,
        Commands::Show { id } => commands::diagrams::show(&id).await?,
        Commands::Fragment { id } => commands::fragment::run(&id).await?,
    }

    Ok(())
}
