#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qexpand_core::{AnswerSource, CancellationFlag};
use tracing::warn;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod command;
mod export;
mod seeds;

use command::{
    CommandStrategy, DocsInput, DocsStrategy, DomainsInput, DomainsStrategy, ExpandInput,
    ExpandStrategy, InfoStrategy, InitStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "qexpand")]
#[command(about = "Graph-guided query expansion for RAG evaluation datasets", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/qexpand/config.json
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,
    /// Show version
    Version,
    /// Show the effective configuration and service wiring
    Info,
    /// Expand seed questions into a QA dataset for one domain
    Expand {
        /// JSON seed file: [{"id": "...", "text": "..."}]; built-in seeds when omitted
        seeds: Option<PathBuf>,

        /// Domain to expand
        #[arg(short = 'd', long)]
        domain: Option<String>,

        /// Target number of QA pairs
        #[arg(short = 'n', long)]
        target: Option<usize>,

        /// Answer source: llm, datastore or search
        #[arg(short = 's', long)]
        source: Option<AnswerSource>,

        /// Datastore id overriding the configured one
        #[arg(long)]
        datastore_id: Option<String>,

        /// Output directory
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Stop after this many expansion rounds
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Do not answer the seed questions themselves
        #[arg(long)]
        no_seed_answers: bool,
    },
    /// Expand the built-in example domains, each in its own session
    Domains {
        /// Domains to run; all built-in domains when omitted
        names: Vec<String>,

        /// Target number of QA pairs per domain
        #[arg(short = 'n', long)]
        target: Option<usize>,

        /// Answer source: llm, datastore or search
        #[arg(short = 's', long)]
        source: Option<AnswerSource>,

        /// Output directory
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Generate golden QA pairs from local documents
    Docs {
        /// Directory of text documents
        #[arg(long)]
        dir: PathBuf,

        /// Total number of questions to spread over all chunks
        #[arg(short = 'n', long, default_value_t = 100)]
        total: usize,

        /// Output directory
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Flip `cancel` on Ctrl-C so running sessions stop between questions.
fn cancel_on_ctrl_c(cancel: CancellationFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current question before stopping");
            cancel.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = command::load_config(cli.config.as_deref())
        .map_or_else(|_| "info".to_string(), |config| config.logging.level);
    init_tracing(&level)?;

    let cancel = CancellationFlag::new();

    match cli.command {
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
        Commands::Info => InfoStrategy.execute(cli.config).await,
        Commands::Expand {
            seeds,
            domain,
            target,
            source,
            datastore_id,
            output,
            max_rounds,
            no_seed_answers,
        } => {
            cancel_on_ctrl_c(cancel.clone());
            ExpandStrategy
                .execute(ExpandInput {
                    config_path: cli.config,
                    seeds,
                    domain,
                    target,
                    source,
                    datastore_id,
                    output,
                    max_rounds,
                    no_seed_answers,
                    cancel,
                })
                .await
        }
        Commands::Domains {
            names,
            target,
            source,
            output,
        } => {
            cancel_on_ctrl_c(cancel.clone());
            DomainsStrategy
                .execute(DomainsInput {
                    config_path: cli.config,
                    names,
                    target,
                    source,
                    output,
                    cancel,
                })
                .await
        }
        Commands::Docs { dir, total, output } => {
            DocsStrategy
                .execute(DocsInput {
                    config_path: cli.config,
                    dir,
                    total,
                    output,
                })
                .await
        }
    }
}
