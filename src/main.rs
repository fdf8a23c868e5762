//! mailsift - Entry point for the command-line interface

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use mailsift::config::Settings;
use mailsift::domain::MessageId;
use mailsift::embedding::resolve_backend;
use mailsift::services::{IndexService, SearchMode, SearchResult, SearchService};
use mailsift::storage::{queries::messages, Database};

#[derive(Parser)]
#[command(
    name = "mailsift",
    version,
    about = "Local full-text and semantic search over mbox mail archives"
)]
struct Cli {
    /// Path to the SQLite database where the index is stored.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index an mbox archive
    Index {
        /// Path to the mbox file to ingest.
        source: PathBuf,

        /// Skip computing embeddings for this batch.
        #[arg(long)]
        no_embeddings: bool,

        /// Embedding backend spec: hash, hash:<dim>, or a
        /// sentence-transformers model name.
        #[arg(long)]
        backend: Option<String>,
    },
    /// Search the index
    Search {
        /// The query to execute.
        query: String,

        /// Maximum number of results to display.
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Search mode: lexical, semantic, or hybrid.
        #[arg(long, default_value = "lexical")]
        mode: String,

        /// Embedding backend spec for semantic and hybrid modes.
        #[arg(long)]
        backend: Option<String>,
    },
    /// Display the stored content of a message
    Show {
        /// The Message-ID of the mail to display.
        message_id: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load();
    let db_path = cli.db.unwrap_or_else(|| settings.database_path());

    match cli.command {
        Command::Index {
            source,
            no_embeddings,
            backend,
        } => run_index(&db_path, &settings, &source, no_embeddings, backend),
        Command::Search {
            query,
            limit,
            mode,
            backend,
        } => run_search(&db_path, &settings, &query, limit, &mode, backend),
        Command::Show { message_id } => run_show(&db_path, &message_id),
    }
}

fn run_index(
    db_path: &PathBuf,
    settings: &Settings,
    source: &PathBuf,
    no_embeddings: bool,
    backend_override: Option<String>,
) -> anyhow::Result<()> {
    let mut database = Database::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    let backend = if no_embeddings || !settings.embedding.enabled {
        None
    } else {
        let spec = backend_override
            .as_deref()
            .or(settings.embedding.backend.as_deref());
        Some(resolve_backend(spec).context("failed to construct embedding backend")?)
    };

    let outcome = IndexService::new(&mut database, backend)
        .index_mbox(source)
        .with_context(|| format!("failed to index {}", source.display()))?;

    println!(
        "Processed {} messages; inserted/updated {} records.",
        outcome.processed, outcome.inserted
    );
    if let Some(backend) = outcome.backend {
        println!("Embeddings stored under backend {backend}.");
    }
    Ok(())
}

fn run_search(
    db_path: &PathBuf,
    settings: &Settings,
    query: &str,
    limit: usize,
    mode: &str,
    backend_override: Option<String>,
) -> anyhow::Result<()> {
    let mode: SearchMode = mode.parse().map_err(|err: String| anyhow::anyhow!(err))?;

    let database = Database::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    let service = match mode {
        SearchMode::Lexical => SearchService::new(&database),
        SearchMode::Semantic | SearchMode::Hybrid => {
            let spec = backend_override
                .as_deref()
                .or(settings.embedding.backend.as_deref());
            let backend =
                resolve_backend(spec).context("failed to construct embedding backend")?;
            SearchService::with_backend(&database, backend)
        }
    };

    let results = service.search(query, limit, mode)?;
    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for result in &results {
        render_result(result);
    }
    println!("{}", "-".repeat(72));
    println!("Displayed {} result(s).", results.len());
    Ok(())
}

fn render_result(result: &SearchResult) {
    println!("{}", "-".repeat(72));
    let subject = if result.subject.is_empty() {
        "(no subject)"
    } else {
        &result.subject
    };
    println!("Subject: {subject}");
    if let Some(from) = &result.from_addr {
        println!("From:    {from}");
    }
    if let Some(to) = &result.to_addr {
        println!("To:      {to}");
    }
    if let Some(date) = &result.date {
        println!("Date:    {date}");
    }
    if !result.snippet.is_empty() {
        println!();
        println!("{}", result.snippet);
        println!();
    }
}

fn run_show(db_path: &PathBuf, message_id: &str) -> anyhow::Result<()> {
    let database = Database::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    let record = messages::fetch(database.conn(), &MessageId::from(message_id))?;
    let Some(record) = record else {
        println!("Message {message_id:?} not found in the index.");
        std::process::exit(1);
    };

    let subject = if record.subject.is_empty() {
        "(no subject)"
    } else {
        &record.subject
    };
    println!("Subject: {subject}");
    println!("From:    {}", record.from_addr.as_deref().unwrap_or("-"));
    println!("To:      {}", record.to_addr.as_deref().unwrap_or("-"));
    println!("Date:    {}", record.date.as_deref().unwrap_or("-"));
    println!();
    if record.body.is_empty() {
        println!("(no body)");
    } else {
        println!("{}", record.body);
    }
    Ok(())
}
