//! CodiCode CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Execute one task and print the result
//! - `agent`   — Interactive mode, one task per line
//! - `tools`   — List the built-in tools
//! - `config`  — Show or initialize the configuration
//! - `doctor`  — Diagnose config and backend health

use clap::{Args, Parser, Subcommand};
use codicode_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "codicode",
    about = "CodiCode — autonomous coding agent for local language models",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,
}

/// One-invocation overrides on top of the loaded config.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Model to use
    #[arg(long, global = true)]
    model: Option<String>,

    /// Backend base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Maximum loop iterations per task
    #[arg(long, global = true)]
    max_steps: Option<u32>,

    /// Maximum failed tool calls per task
    #[arg(long, global = true)]
    max_errors: Option<u32>,

    /// Stream replies as they are generated
    #[arg(long, global = true)]
    stream: bool,
}

impl Overrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.llm.base_url = base_url.clone();
        }
        if let Some(max_steps) = self.max_steps {
            config.agent.max_steps = max_steps;
        }
        if let Some(max_errors) = self.max_errors {
            config.agent.max_tool_errors = max_errors;
        }
        if self.stream {
            config.agent.stream = true;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single task
    Run {
        /// The task, in plain language
        task: String,
    },

    /// Interactive mode: each line is a task
    Agent,

    /// List available tools
    Tools,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose system health
    Doctor,
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

    let loaded = AppConfig::load().map(|mut config| {
        cli.overrides.apply(&mut config);
        config
    });

    // Initialize tracing
    let verbose = cli.verbose || loaded.as_ref().is_ok_and(|c| c.agent.verbose);
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // `doctor` and `config path|init` must work even with a broken config
    match cli.command {
        Commands::Doctor => return commands::doctor::run(loaded).await,
        Commands::Config {
            action: ConfigAction::Path,
        } => return commands::config_cmd::path(),
        Commands::Config {
            action: ConfigAction::Init { force },
        } => return commands::config_cmd::init(force),
        _ => {}
    }

    let config = loaded.map_err(|e| format!("Failed to load config: {e}"))?;
    config.validate()?;
    tracing::debug!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        base_url = %config.llm.base_url,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Run { task } => commands::run::run(&config, &task).await?,
        Commands::Agent => commands::agent::run(&config).await?,
        Commands::Tools => commands::tools::run(&config)?,
        Commands::Config {
            action: ConfigAction::Show,
        } => commands::config_cmd::show(&config)?,
        Commands::Config { .. } | Commands::Doctor => {}
    }

    Ok(())
}
