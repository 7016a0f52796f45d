use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use wiki_index::{load_documents, load_queries, InvertedIndex};

#[derive(Parser, Debug)]
#[command(name = "wiki_index")]
#[command(about = "Build and query a word-to-document inverted index", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a dataset of `<id> <text>` lines
    Build {
        /// Dataset file, one document per line
        #[arg(long, env = "WIKI_INDEX_DATASET")]
        dataset: PathBuf,

        /// Where to write the index
        #[arg(long, env = "WIKI_INDEX_PATH")]
        index: PathBuf,
    },
    /// Run AND queries, one per line of the query file
    Query {
        /// Index produced by `build`
        #[arg(long, env = "WIKI_INDEX_PATH")]
        index: PathBuf,

        /// File with one whitespace-separated query per line
        #[arg(long = "query_file", visible_alias = "query-file")]
        query_file: PathBuf,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries results only.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Build { dataset, index } => run_build(&dataset, &index),
        Command::Query { index, query_file } => run_query(&index, &query_file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_build(dataset: &Path, index_path: &Path) -> Result<()> {
    let documents = load_documents(dataset)
        .with_context(|| format!("build: failed to load dataset {}", dataset.display()))?;

    let index = InvertedIndex::build(&documents);

    index
        .save_to_file(index_path)
        .with_context(|| format!("build: failed to write index {}", index_path.display()))?;

    let stats = index.stats();
    info!(
        documents = stats.documents,
        terms = stats.terms,
        path = %index_path.display(),
        "build finished"
    );
    println!("{}", serde_json::to_string(&stats)?);
    Ok(())
}

fn run_query(index_path: &Path, query_file: &Path) -> Result<()> {
    let index = InvertedIndex::load_from_file(index_path)
        .with_context(|| format!("query: failed to load index {}", index_path.display()))?;

    let queries = load_queries(query_file)
        .with_context(|| format!("query: failed to read queries {}", query_file.display()))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for words in &queries {
        let ids = index.query(words);
        writeln!(out, "{}", serde_json::to_string(&ids)?)?;
    }
    out.flush()?;

    info!(queries = queries.len(), "queries answered");
    Ok(())
}
