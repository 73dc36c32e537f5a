//! `nyaya`: command-line front end for the legal triage pipeline.
//!
//! Usage:
//!   nyaya run "someone stole my bike"              # one deliberation, verdict JSON on stdout
//!   nyaya run --report < situation.txt              # full run report
//!   nyaya session --config nyaya.yaml               # one situation per line, `:reset` clears history
//!   nyaya search data/ipc.csv "theft of a bicycle"  # query a single corpus
//!   nyaya columns data/judgments.csv --kind case-law
//!
//! Logs go to stderr (`RUST_LOG`, default `info`) so stdout stays machine-readable.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use nyaya_core::{
    ColumnMapping, Corpus, CorpusKind, CorpusSpec, DeliberationState, GateResult, TextIndex,
    Verdict, DEFAULT_TOP_K,
};
use nyaya_runtime::{DeliberationCoordinator, LlmUsage, RuntimeConfig, RuntimeResult, Session};

#[derive(Parser)]
#[command(name = "nyaya", version)]
#[command(about = "Deliberate over a legal situation with five reviewing stages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one deliberation and print the verdict
    Run {
        /// The situation; read from stdin when omitted
        situation: Option<String>,

        /// Runtime config (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the full run report instead of just the verdict
        #[arg(long)]
        report: bool,
    },

    /// Read situations line by line; `:reset` clears the session, `:quit` exits
    Session {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "cli")]
        id: String,
    },

    /// Search one corpus file
    Search {
        /// Corpus file (.csv or .json)
        path: PathBuf,

        query: String,

        #[arg(long, default_value = "statutes", value_parser = parse_kind)]
        kind: CorpusKind,

        #[arg(long)]
        key_field: Option<String>,

        #[arg(long)]
        content_field: Option<String>,

        #[arg(short, default_value_t = DEFAULT_TOP_K)]
        k: usize,
    },

    /// Show a corpus's columns and the suggested key/content mapping
    Columns {
        path: PathBuf,

        #[arg(long, default_value = "statutes", value_parser = parse_kind)]
        kind: CorpusKind,
    },
}

fn parse_kind(raw: &str) -> Result<CorpusKind, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(|_| {
        format!("unknown corpus kind '{raw}' (expected statutes, evidence-rules or case-law)")
    })
}

/// What `run --report` prints.
#[derive(Serialize)]
struct RunReport<'a> {
    verdict: &'a Verdict,
    trace: &'a [DeliberationState],
    ethics_gate: &'a Option<GateResult>,
    confidence_gate: &'a Option<GateResult>,
    usage: &'a LlmUsage,
    elapsed_ms: u64,
}

impl<'a> From<&'a RuntimeResult> for RunReport<'a> {
    fn from(result: &'a RuntimeResult) -> Self {
        Self {
            verdict: &result.verdict,
            trace: &result.trace,
            ethics_gate: &result.ethics_gate,
            confidence_gate: &result.confidence_gate,
            usage: &result.llm_usage,
            elapsed_ms: result.elapsed.as_millis() as u64,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Run {
            situation,
            config,
            report,
        } => run(situation, config.as_deref(), report).await,
        Command::Session { config, id } => session(config.as_deref(), id).await,
        Command::Search {
            path,
            query,
            kind,
            key_field,
            content_field,
            k,
        } => {
            let spec = CorpusSpec {
                kind,
                path,
                key_field,
                content_field,
            };
            search(&spec, &query, k)
        }
        Command::Columns { path, kind } => columns(&path, kind),
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

fn build_coordinator(config: RuntimeConfig) -> Result<DeliberationCoordinator> {
    DeliberationCoordinator::builder()
        .config(config)
        .build()
        .context("building the deliberation coordinator (is GROQ_API_KEY set?)")
}

fn exit_code(verdict: &Verdict) -> ExitCode {
    match verdict {
        Verdict::Success { .. } => ExitCode::SUCCESS,
        Verdict::Refused { .. } => ExitCode::from(2),
        Verdict::Error { .. } => ExitCode::FAILURE,
    }
}

async fn run(situation: Option<String>, config: Option<&Path>, report: bool) -> Result<ExitCode> {
    let situation = match situation {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading situation from stdin")?;
            buf
        }
    };
    let situation = situation.trim();
    if situation.is_empty() {
        bail!("no situation given");
    }

    let coordinator = build_coordinator(load_config(config)?)?;
    let mut session = Session::new("cli");
    let cancel = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let result = coordinator
        .deliberate_until(&mut session, situation, cancel)
        .await;

    let json = if report {
        serde_json::to_string_pretty(&RunReport::from(&result))?
    } else {
        serde_json::to_string_pretty(&result.verdict)?
    };
    println!("{json}");
    Ok(exit_code(&result.verdict))
}

async fn session(config: Option<&Path>, id: String) -> Result<ExitCode> {
    let coordinator = build_coordinator(load_config(config)?)?;
    let mut session = Session::new(id);

    for line in std::io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        match line.trim() {
            "" => continue,
            ":quit" => break,
            ":reset" => {
                session.reset();
                continue;
            }
            ":history" => {
                println!("{}", serde_json::to_string(session.history())?);
                continue;
            }
            situation => {
                let result = coordinator.deliberate(&mut session, situation).await;
                println!("{}", serde_json::to_string(&result.verdict)?);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn search(spec: &CorpusSpec, query: &str, k: usize) -> Result<ExitCode> {
    let index: TextIndex = spec
        .build()
        .with_context(|| format!("indexing {}", spec.path.display()))?;
    tracing::info!(
        corpus = %spec.kind,
        documents = index.len(),
        vocabulary = index.vocabulary_size(),
        "Index ready"
    );

    let results = index.search(query, k);
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(ExitCode::SUCCESS)
}

fn columns(path: &Path, kind: CorpusKind) -> Result<ExitCode> {
    let corpus = Corpus::load(path).with_context(|| format!("loading {}", path.display()))?;

    #[derive(Serialize)]
    struct ColumnsReport<'a> {
        columns: &'a [String],
        rows: usize,
        suggested: Option<ColumnMapping>,
    }

    let report = ColumnsReport {
        columns: corpus.columns(),
        rows: corpus.len(),
        suggested: ColumnMapping::suggest(corpus.columns(), kind),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}
