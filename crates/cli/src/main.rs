//! Connector CLI, the main entry point.
//!
//! Commands:
//! - `init`      Write a default config file
//! - `serve`     Start the HTTP gateway and the training scheduler
//! - `ask`       Send one prompt through the routed provider
//! - `enqueue`   Queue training messages from a JSON file or stdin
//! - `train`     Process one training batch now
//! - `providers` Show the provider catalog
//! - `routes`    Show configured routes

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "connector",
    about = "Connector: routes prompts to LLM providers with layered context",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.connector/config.toml)
    #[arg(long, global = true, env = "CONNECTOR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,

    /// Start the HTTP gateway and the training scheduler
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a question through the configured route
    Ask {
        /// Routing data type
        #[arg(short = 't', long)]
        data_type: String,

        /// Routing characteristic
        #[arg(short, long)]
        characteristic: String,

        /// Module key for module-tier context
        #[arg(short, long)]
        module: Option<String>,

        /// Profile id for profile-tier context
        #[arg(short, long)]
        profile: Option<String>,

        /// Print the answer chunk by chunk
        #[arg(short, long)]
        stream: bool,

        /// The question
        prompt: String,
    },

    /// Queue training messages (one JSON object or an array; `-` reads stdin)
    Enqueue {
        input: String,
    },

    /// Process one batch of pending training items
    Train {
        /// Override the configured batch size
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Show the provider catalog
    Providers,

    /// Show configured routes
    Routes,
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

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init => commands::init::run(config_path).await?,
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Ask {
            data_type,
            characteristic,
            module,
            profile,
            stream,
            prompt,
        } => {
            let args = commands::ask::AskArgs {
                data_type,
                characteristic,
                module,
                profile,
                stream,
                prompt,
            };
            commands::ask::run(config_path, args).await?
        }
        Commands::Enqueue { input } => commands::enqueue::run(config_path, &input).await?,
        Commands::Train { batch_size } => commands::train::run(config_path, batch_size).await?,
        Commands::Providers => commands::providers::run(config_path).await?,
        Commands::Routes => commands::routes::run(config_path).await?,
    }

    Ok(())
}
