use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};

use docent_index::{IndexStore, Indexer, shared};
use docent_llm::openai::OpenAiProvider;
use docent_query::{LiveCapabilities, QueryWorkflow};

mod config;

use config::Config;

#[derive(Parser)]
#[command(
    name = "docent",
    version,
    about = "Question answering over a Markdown documentation corpus"
)]
struct Cli {
    /// Configuration file.
    #[arg(long, default_value = "docent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the corpus and bring the index up to date.
    Index {
        /// Re-chunk and re-embed every file, ignoring stored fingerprints.
        #[arg(long)]
        rebuild: bool,
    },
    /// Ask a question against the indexed corpus.
    Ask {
        /// The question, as remaining arguments.
        question: Vec<String>,
        /// Print the full response envelope as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let provider = OpenAiProvider::new(
        config.api_key()?,
        config.provider.base_url.clone(),
        config.provider.model.clone(),
        config.provider.embedding_model.clone(),
        config.provider.max_tokens,
    );

    match cli.command {
        Command::Index { rebuild } => run_index(&config, provider, rebuild).await,
        Command::Ask { question, json } => run_ask(&config, provider, &question, json).await,
    }
}

async fn run_index(config: &Config, provider: OpenAiProvider, rebuild: bool) -> anyhow::Result<()> {
    let current = IndexStore::load(&config.snapshot_path)?.unwrap_or_default();
    let indexer = Indexer::new(provider, config.indexer_config());
    let (_, report) = indexer.run(&config.corpus_dir, &current, rebuild).await?;

    println!(
        "indexed {} file(s), {} unchanged, {} removed ({} chunks total, {:.1}s)",
        report.indexed,
        report.unchanged,
        report.removed,
        report.total_chunks,
        report.elapsed.as_secs_f64()
    );
    if report.incomplete > 0 {
        println!(
            "{} file(s) had embedding failures and will be retried next run",
            report.incomplete
        );
    }
    Ok(())
}

async fn run_ask(
    config: &Config,
    provider: OpenAiProvider,
    question: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let question = question.join(" ");
    if question.trim().is_empty() {
        bail!("empty question; usage: docent ask <question>");
    }

    let store = match IndexStore::load(&config.snapshot_path)? {
        Some(store) => store,
        None => {
            tracing::warn!("no index snapshot found; run `docent index` first");
            IndexStore::new()
        }
    };

    let workflow = QueryWorkflow::new(
        LiveCapabilities::new(provider, shared(store)),
        config.workflow_config(),
    );
    let response = workflow.run(&question).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}\n", response.answer);
    if !response.metadata.sources.is_empty() {
        println!("Sources:");
        for source in &response.metadata.sources {
            println!(
                "  {} ({}, score {:.2})",
                source.title, source.url, source.score
            );
        }
    }
    Ok(())
}
