use std::sync::Arc;

use clap::{Parser, Subcommand};
use coach_cli::{AppConfig, AppState, ServerConfig, commands, repl, run_server};
use tracing_subscriber::EnvFilter;

/// Training assistant: index documents, chat, evaluate and inspect results
#[derive(Parser, Debug)]
#[command(name = "coach", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the PDFs, embed their chunks and write the index
    BuildIndex,
    /// Replay the evaluation dataset and record one run per question
    Eval,
    /// Chat in the terminal
    Chat {
        /// Resume the session of an existing user
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Print the runs of an evaluation experiment
    Dashboard {
        /// Experiment name; defaults to the first `eval_` experiment
        #[arg(long)]
        experiment: Option<String>,
    },
    /// Serve the HTTP API and dashboard
    Serve {
        #[arg(long, env = "COACH_HOST", default_value = "127.0.0.1")]
        host: String,
        #[arg(long, env = "COACH_PORT", default_value_t = 8501)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    match cli.command {
        Commands::BuildIndex => commands::build_index(&config).await,
        Commands::Eval => commands::eval(&config).await,
        Commands::Dashboard { experiment } => {
            commands::dashboard(&config, experiment.as_deref()).await
        }
        Commands::Chat { user_id } => {
            let chain = config.retrieval_chain(config.chat_llm()?).await?;
            repl::run(config.store()?, chain, user_id).await
        }
        Commands::Serve { host, port } => {
            let chain = config.retrieval_chain(config.chat_llm()?).await?;
            let state = AppState::new(config.store()?, config.tracking(), Arc::new(chain));
            run_server(ServerConfig { host, port }, state).await
        }
    }
}
