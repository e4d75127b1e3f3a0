//! Binary entry point for suhoc.
//!
//! This binary provides the CLI for the knowledge graph pipeline:
//! chunking, extraction, normalization, loading, asking, and scoring.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow option_if_let_else for argument fallback chains
#![allow(clippy::option_if_let_else)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use suhoc::config::SuhocConfig;
use suhoc::embedding::build_embedder;
use suhoc::llm::build_provider;
use suhoc::models::{
    GraphInput, read_fragments_file, read_graph_file, read_text_file, write_json_file,
    write_snapshot_file,
};
use suhoc::observability;
use suhoc::services::{
    AnswerService, Chunker, EvaluationService, ExtractionService, GraphLoader, Normalizer,
    RetrievalService, read_qa_pairs_file,
};
use suhoc::storage::{GraphStore, Neo4jStore};

/// Suhoc - knowledge graph construction and question answering for
/// Vietnamese history texts.
#[derive(Parser)]
#[command(name = "suhoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Split a text file into chunks.
    Chunk {
        /// Input text file.
        #[arg(short, long)]
        input: PathBuf,

        /// Write the chunks as JSON instead of listing them.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Chunk budget in characters.
        #[arg(long)]
        max_chars: Option<usize>,

        /// Overlap between split windows in characters.
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Chunk a text file and extract graph fragments with the LLM.
    Extract {
        /// Input text file.
        #[arg(short, long)]
        input: PathBuf,

        /// Fragments file to write.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Merge a fragments file into a normalized snapshot.
    Normalize {
        /// Fragments file to read.
        #[arg(short, long)]
        input: PathBuf,

        /// Snapshot file to write.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the merge report as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Load a graph file into the store, replacing its content.
    Load {
        /// Fragments or snapshot file.
        #[arg(default_value = "graph_documents.json")]
        input: PathBuf,

        /// Items per write batch.
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Answer a question from the loaded graph.
    Ask {
        /// The question to answer.
        question: String,

        /// Print the retrieved context before the answer.
        #[arg(long)]
        show_context: bool,
    },

    /// Score generated answers against reference answers.
    Eval {
        /// QA pairs file (JSON array or CSV with question,answer columns).
        #[arg(short, long)]
        questions: PathBuf,

        /// Write the full report as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show store entity and relationship counts.
    Stats,
}

fn main() -> ExitCode {
    // Load .env before config so NEO4J_* and SUHOC_* variables apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match SuhocConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Dispatches a parsed command.
fn run_command(cli: Cli, config: SuhocConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Chunk {
            input,
            output,
            max_chars,
            overlap,
        } => cmd_chunk(&config, input, output, max_chars, overlap),
        Commands::Extract { input, output } => cmd_extract(&config, input, output),
        Commands::Normalize {
            input,
            output,
            report,
        } => cmd_normalize(input, output, report),
        Commands::Load { input, batch_size } => cmd_load(&config, input, batch_size),
        Commands::Ask {
            question,
            show_context,
        } => cmd_ask(&config, &question, show_context),
        Commands::Eval { questions, output } => cmd_eval(&config, questions, output),
        Commands::Stats => cmd_stats(&config),
    }
}

/// Splits a text file into chunks.
fn cmd_chunk(
    config: &SuhocConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    max_chars: Option<usize>,
    overlap: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_text_file(&input)?;
    let chunker = Chunker::new(
        max_chars.unwrap_or(config.chunking.max_chars),
        overlap.unwrap_or(config.chunking.overlap),
    );
    let chunks = chunker.chunk_source(&text, &input.display().to_string());

    println!("Chunked {}:", input.display());
    println!("  Chunks: {}", chunks.len());
    match output {
        Some(path) => {
            write_json_file(&path, &chunks)?;
            println!("  Written to: {}", path.display());
        },
        None => {
            for chunk in &chunks {
                println!("  {} ({} chars)", chunk.id, chunk.text.chars().count());
            }
        },
    }

    Ok(())
}

/// Chunks a text file and extracts one fragment per chunk.
fn cmd_extract(
    config: &SuhocConfig,
    input: PathBuf,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_text_file(&input)?;
    let chunker = Chunker::new(config.chunking.max_chars, config.chunking.overlap);
    let chunks = chunker.chunk_source(&text, &input.display().to_string());

    let provider = build_provider(&config.llm)?;
    let extraction = ExtractionService::new(provider);
    let (fragments, report) = extraction.extract_all(&chunks);
    write_json_file(&output, &fragments)?;

    println!("Extracted {}:", input.display());
    println!("  Chunks: {}", report.chunks);
    println!("  Fragments: {}", report.fragments);
    println!("  Failed chunks: {}", report.failed_chunks);
    if report.discarded_nodes > 0 || report.discarded_relationships > 0 {
        println!(
            "  Discarded records: {} nodes, {} relationships",
            report.discarded_nodes, report.discarded_relationships
        );
    }
    println!("  Written to: {}", output.display());

    Ok(())
}

/// Merges fragments into a normalized snapshot.
fn cmd_normalize(
    input: PathBuf,
    output: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let fragments = read_fragments_file(&input)?;
    let (snapshot, report) = Normalizer::new().normalize(&fragments);

    println!("Normalized {}:", input.display());
    println!("  Fragments: {}", report.fragments);
    println!(
        "  Entities: {} ({} merged, {} skipped)",
        report.entities, report.merged_entities, report.skipped_nodes
    );
    println!(
        "  Relationships: {} ({} dangling, {} duplicates dropped)",
        report.relationships, report.dangling_relationships, report.duplicate_relationships
    );
    if let Some(path) = output {
        write_snapshot_file(&path, &snapshot)?;
        println!("  Snapshot written to: {}", path.display());
    }
    if let Some(path) = report_path {
        write_json_file(&path, &report)?;
        println!("  Report written to: {}", path.display());
    }

    Ok(())
}

/// Loads a graph file into the store, clearing previous content.
fn cmd_load(
    config: &SuhocConfig,
    input: PathBuf,
    batch_size: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (snapshot, normalize_report) = match read_graph_file(&input)? {
        GraphInput::Snapshot(snapshot) => (snapshot, None),
        GraphInput::Fragments(fragments) => {
            let (snapshot, report) = Normalizer::new().normalize(&fragments);
            (snapshot, Some(report))
        },
        GraphInput::Fragment(fragment) => {
            let (snapshot, report) = Normalizer::new().normalize(std::slice::from_ref(&*fragment));
            (snapshot, Some(report))
        },
    };

    let store = Neo4jStore::connect(&config.store, config.load.reconnect_attempts)?;
    let loader = GraphLoader::new(store)
        .with_batch_size(batch_size.unwrap_or(config.load.batch_size));
    let report = loader.load(&snapshot)?;

    println!("Loaded {}:", input.display());
    if let Some(n) = normalize_report {
        println!(
            "  Normalized: {} fragments, {} dangling edges dropped",
            n.fragments, n.dangling_relationships
        );
    }
    println!(
        "  Entities: {} in {} batches",
        report.entities, report.entity_batches
    );
    println!(
        "  Relationships: {} in {} batches",
        report.relationships, report.relationship_batches
    );
    println!("  Duration: {} ms", report.duration_ms);

    Ok(())
}

/// Answers a question from the loaded graph.
fn cmd_ask(
    config: &SuhocConfig,
    question: &str,
    show_context: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Neo4jStore::connect(&config.store, config.load.reconnect_attempts)?;
    let embedder = build_embedder(&config.embedding)?;
    let retrieval =
        RetrievalService::from_config(store, &config.retrieval).with_embedder(embedder);
    let context = retrieval.retrieve(question)?;

    let provider = build_provider(&config.llm)?;
    let answers = AnswerService::new(provider);
    let answer = answers.answer(question, &context)?;

    if show_context {
        println!("Context ({} triples):", answer.triples);
        for line in answer.context.lines() {
            println!("  {line}");
        }
        println!();
    }
    println!("{}", answer.text);

    Ok(())
}

/// Scores generated answers against references with ROUGE.
fn cmd_eval(
    config: &SuhocConfig,
    questions: PathBuf,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pairs = read_qa_pairs_file(&questions)?;

    let store = Neo4jStore::connect(&config.store, config.load.reconnect_attempts)?;
    let embedder = build_embedder(&config.embedding)?;
    let retrieval =
        RetrievalService::from_config(store, &config.retrieval).with_embedder(embedder);
    let provider = build_provider(&config.llm)?;
    let answers = AnswerService::new(provider);

    let report = EvaluationService::new().evaluate(&pairs, |question| {
        let context = retrieval.retrieve(question)?;
        answers.answer(question, &context).map(|a| a.text)
    });

    println!("Evaluated {}:", questions.display());
    println!("  Questions: {}", report.total);
    println!("  Failed: {}", report.failed);
    println!("  Mean ROUGE-1 F1: {:.4}", report.mean_rouge_1_f1);
    println!("  Mean ROUGE-L F1: {:.4}", report.mean_rouge_l_f1);
    if let Some(path) = output {
        write_json_file(&path, &report)?;
        println!("  Report written to: {}", path.display());
    }

    Ok(())
}

/// Prints store entity and relationship counts.
fn cmd_stats(config: &SuhocConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = Neo4jStore::connect(&config.store, config.load.reconnect_attempts)?;
    let stats = store.stats()?;

    println!("Graph store at {}:", store.uri());
    println!("  Entities: {}", stats.entities);
    println!("  Relationships: {}", stats.relationships);

    Ok(())
}
