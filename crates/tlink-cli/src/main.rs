//! tlink CLI - Command-line interface
//!
//! Usage:
//!   tlink encode <doc.json> [--kind TIME]
//!   tlink candidates <doc.json> [--strategy adjacent]
//!   tlink train <doc.json>... --out instances.jsonl
//!   tlink evaluate <gold.json> <system.json>

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tlink_core::{Document, LoggingConfig, PipelineConfig, ScopeKind, Span};
use tlink_extractor::features::{relation_or_noop, ArgumentTypes, TokenDistance, WordVectors};
use tlink_extractor::{
    effective_scope, AggregateMetrics, Annotator, ArgumentKinds, BioChunking, CandidateStrategy,
    CategoryCounter, CategoryInversion, Evaluator, JsonlDataWriter, RelationAnnotator,
    StrategyKind,
};

#[derive(Parser)]
#[command(name = "tlink")]
#[command(about = "Temporal relation extraction toolkit")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print per-sentence BIO labels for the mentions of one kind
    Encode {
        /// Document JSON
        document: PathBuf,
        /// Mention kind to encode
        #[arg(long, default_value = "TIMEX")]
        kind: String,
        /// Emit bare B/I labels
        #[arg(long)]
        untyped: bool,
    },
    /// Print the candidate pairs a strategy proposes
    Candidates {
        /// Document JSON
        document: PathBuf,
        #[command(flatten)]
        pairing: Pairing,
    },
    /// Write relation training instances for a set of documents
    Train {
        /// Document JSON files
        #[arg(required = true)]
        documents: Vec<PathBuf>,
        /// Output JSON-lines file
        #[arg(long)]
        out: PathBuf,
        /// Word vectors file (optional)
        #[arg(long)]
        vectors: Option<PathBuf>,
        #[command(flatten)]
        pairing: Pairing,
    },
    /// Compare system output against gold annotations
    Evaluate {
        /// Gold document JSON
        gold: PathBuf,
        /// System document JSON (with output)
        system: PathBuf,
    },
}

/// Candidate generation options
#[derive(Args)]
struct Pairing {
    /// all, adjacent, consecutive, container or dependency
    #[arg(long, default_value = "all")]
    strategy: String,
    /// Scope to pair within: sentence, segment or document
    #[arg(long, default_value = "sentence")]
    scope: ScopeKind,
    /// Kind of the first argument
    #[arg(long, default_value = "EVENT")]
    arg1: String,
    /// Kind of the second argument
    #[arg(long, default_value = "EVENT")]
    arg2: String,
}

impl Pairing {
    fn strategy(&self, config: &PipelineConfig) -> anyhow::Result<Box<dyn CandidateStrategy>> {
        let Some(kind) = StrategyKind::from_str(&self.strategy) else {
            bail!("unknown strategy: {}", self.strategy);
        };
        let kinds = ArgumentKinds::new(self.arg1.clone(), self.arg2.clone());
        Ok(kind.build(kinds, &config.relations))
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_file(path)?.with_env_override()?,
        None => PipelineConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_document(path: &Path) -> anyhow::Result<Document> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Document::from_json(&json).with_context(|| format!("failed to load {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Encode {
            document,
            kind,
            untyped,
        } => encode(&load_document(&document)?, &kind, untyped),
        Commands::Candidates { document, pairing } => {
            candidates(&load_document(&document)?, &pairing, &config)
        }
        Commands::Train {
            documents,
            out,
            vectors,
            pairing,
        } => train(&documents, &out, vectors.as_deref(), &pairing, &config),
        Commands::Evaluate { gold, system } => {
            evaluate(&load_document(&gold)?, &load_document(&system)?, &config)
        }
    }
}

fn encode(doc: &Document, kind: &str, untyped: bool) -> anyhow::Result<()> {
    let codec = if untyped {
        BioChunking::untyped(kind)
    } else {
        BioChunking::new(kind)
    };

    for sentence in doc.scopes(ScopeKind::Sentence) {
        let tokens = doc.tokens_in(&sentence);
        let mentions: Vec<Span> = doc
            .mentions_in(kind, &sentence)
            .into_iter()
            .filter(|m| m.canonical)
            .cloned()
            .collect();
        let outcomes = codec.create_outcomes(&tokens, &mentions);

        let line: Vec<String> = tokens
            .iter()
            .zip(&outcomes)
            .map(|(token, label)| format!("{}/{}", doc.covered_text(token), label))
            .collect();
        println!("{}", line.join(" "));
    }
    Ok(())
}

fn candidates(doc: &Document, pairing: &Pairing, config: &PipelineConfig) -> anyhow::Result<()> {
    let strategy = pairing.strategy(config)?;
    let pairs: Vec<_> = doc
        .scopes(effective_scope(strategy.as_ref(), pairing.scope))
        .iter()
        .flat_map(|scope| strategy.candidates(doc, scope))
        .collect();
    println!("{}", serde_json::to_string_pretty(&pairs)?);
    Ok(())
}

fn train(
    documents: &[PathBuf],
    out: &Path,
    vectors: Option<&Path>,
    pairing: &Pairing,
    config: &PipelineConfig,
) -> anyhow::Result<()> {
    let writer = JsonlDataWriter::create(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    let counter = Arc::new(CategoryCounter::new());

    let mut annotator =
        RelationAnnotator::training(pairing.strategy(config)?, Box::new(writer), config)
            .with_scope(pairing.scope)
            .with_counter(counter.clone())
            .with_extractor(Box::new(ArgumentTypes))
            .with_extractor(Box::new(TokenDistance));
    if let Some(path) = vectors {
        let loaded = WordVectors::load(path);
        annotator = annotator.with_extractor(relation_or_noop("word-vectors", loaded));
    }

    for path in documents {
        tracing::debug!(path = %path.display(), "Training on document");
        let mut doc = load_document(path)?;
        annotator
            .process(&mut doc)
            .with_context(|| format!("training failed on {}", path.display()))?;
    }

    let summary = annotator.finalize()?;
    print!("{}", counter.report());
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn evaluate(gold: &Document, system: &Document, config: &PipelineConfig) -> anyhow::Result<()> {
    let evaluator =
        Evaluator::new().with_inversion(CategoryInversion::from_config(&config.relations));
    let mut aggregate = AggregateMetrics {
        num_documents: 1,
        ..Default::default()
    };

    let predicted_spans = system.output.spans();
    if !predicted_spans.is_empty() {
        // only score gold mentions of the kinds the system produced
        let kinds: Vec<&str> = predicted_spans.iter().map(|s| s.span.kind.as_str()).collect();
        let gold_spans: Vec<Span> = gold
            .mentions
            .iter()
            .filter(|m| m.canonical && kinds.contains(&m.kind.as_str()))
            .cloned()
            .collect();
        aggregate.add_span_metrics(&evaluator.evaluate_spans(predicted_spans, &gold_spans));
    }
    aggregate.add_relation_metrics(
        &evaluator.evaluate_relations(system.output.relations(), &gold.relations),
    );

    print!("{}", aggregate.report());
    Ok(())
}
