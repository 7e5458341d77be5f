//! # Ink Router CLI (`ink`)
//!
//! The `ink` binary dispatches questions through the studio assistant's
//! routing and caching engine and inspects its configuration.
//!
//! ## Usage
//!
//! ```bash
//! ink --config ./config/ink.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ink ask "<query>"` | Dispatch one query and print the answer |
//! | `ink route "<query>"` | Show category scores and extracted entities |
//! | `ink pipelines` | List configured pipelines |
//! | `ink knowledge` | Validate and summarise the knowledge file |
//! | `ink chat` | Interactive session over stdin |
//!
//! ## Examples
//!
//! ```bash
//! # Routed question
//! ink ask "what is traditional tattoo style?"
//!
//! # Pin a pipeline, mobile suggestion cap, JSON output
//! ink ask "how much is a half sleeve?" --pipeline sales_assistant --mobile --json
//!
//! # Why did this go to ServiceOps?
//! ink route "I want to book an appointment"
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use clap::{Parser, Subcommand};
use ink_router::{ask, config, knowledge, pipelines};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Ink Router CLI: query routing and response caching for a tattoo
/// studio assistant.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "ink",
    about = "Ink Router — query routing and response caching for a tattoo studio assistant",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ink.toml`. A missing file means built-in
    /// defaults: the bundled studio knowledge and four pipelines.
    #[arg(long, global = true, default_value = "./config/ink.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Dispatch a single query.
    ///
    /// Runs the full request path: rate limit, cache, routing and
    /// execution. Exits non-zero if the dispatch fails.
    Ask {
        /// The question to answer.
        query: String,

        /// Pipeline to dispatch to.
        #[arg(long, default_value = "tattoo_knowledge")]
        pipeline: String,

        /// Client identifier used for rate limiting.
        #[arg(long, default_value = "cli")]
        client: String,

        /// Use the pipeline's mobile suggestion cap.
        #[arg(long)]
        mobile: bool,

        /// Print the full dispatch result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show how a query would be routed.
    ///
    /// Prints per-category keyword scores, the selected category and the
    /// extracted entities. Nothing is dispatched.
    Route {
        /// The question to route.
        query: String,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List configured pipelines.
    Pipelines,

    /// Validate the knowledge file and print a summary.
    Knowledge,

    /// Start an interactive session.
    ///
    /// Reads one question per line from stdin. Conversation history is
    /// carried between turns; cache statistics are printed on exit.
    Chat {
        /// Pipeline to dispatch to.
        #[arg(long, default_value = "tattoo_knowledge")]
        pipeline: String,

        /// Client identifier used for rate limiting.
        #[arg(long, default_value = "cli")]
        client: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Ask {
            query,
            pipeline,
            client,
            mobile,
            json,
        } => {
            ask::run_ask(&cfg, &query, &pipeline, &client, mobile, json).await?;
        }
        Commands::Route { query, json } => {
            ask::run_route(&cfg, &query, json)?;
        }
        Commands::Pipelines => {
            pipelines::run_list_pipelines(&cfg)?;
        }
        Commands::Knowledge => {
            knowledge::run_knowledge(&cfg)?;
        }
        Commands::Chat { pipeline, client } => {
            ask::run_chat(&cfg, &pipeline, &client).await?;
        }
    }

    Ok(())
}
