//! LocalAgent CLI: the main entry point.
//!
//! Commands:
//! - `generate`: Generate code for a task
//! - `review`: Review a snippet or a source file
//! - `history`: List recent tasks from memory
//! - `mcp`: Send a context-protocol envelope
//! - `serve`: Start the HTTP gateway
//! - `doctor`: Diagnose the model server and memory store
//! - `config`: Show or initialize configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "localagent",
    about = "LocalAgent: code generation and review on a local model server",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code for a task
    Generate {
        /// What the code should do
        #[arg(short, long)]
        task: String,

        /// Extra context passed to the agent
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Review code (inline, or a path to a .py/.rs/.txt file)
    Review {
        #[arg(short, long)]
        code: String,
    },

    /// Show recent tasks from memory
    History {
        /// Number of entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Send a context-protocol request
    Mcp {
        #[arg(long)]
        context_type: String,

        /// JSON object payload
        #[arg(long, default_value = "{}")]
        payload: String,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Diagnose system health
    Doctor,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for results
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let json = cli.json;
    match cli.command {
        Commands::Generate { task, context } => {
            commands::generate::run(&task, context.as_deref(), json).await?
        }
        Commands::Review { code } => commands::review::run(&code, json).await?,
        Commands::History { limit } => commands::history::run(limit, json).await?,
        Commands::Mcp {
            context_type,
            payload,
        } => commands::mcp::run(&context_type, &payload).await?,
        Commands::Serve { port, host } => commands::serve::run(port, host).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Init { force } => commands::config_cmd::init(force).await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}
