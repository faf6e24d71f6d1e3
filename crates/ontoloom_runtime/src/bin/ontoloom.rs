//! Ontoloom CLI entry point.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ontoloom_foundation::{Error, ErrorKind, Result};
use ontoloom_graph::{BlobStore, FsBlobStore, MemoryGraph};
use ontoloom_runtime::{ModelContext, OntoloomConfig, Repl, Session, logging};
use tracing::info;

/// Ontoloom - compile an XML ontology schema and edit a graph of objects against it
#[derive(Parser, Debug)]
#[command(name = "ontoloom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./ontoloom.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Schema resource to load at start
    #[arg(short, long)]
    schema: Option<String>,

    /// Directory holding schemas and generated artifacts
    #[arg(long)]
    blob_dir: Option<PathBuf>,

    /// Store snapshot file, loaded at start and written on exit
    #[arg(long)]
    store: Option<PathBuf>,

    /// Print command responses as JSON lines
    #[arg(long)]
    json: bool,

    /// Run the commands in these files, then exit
    #[arg(short, long, value_name = "FILE", num_args = 1..)]
    batch: Vec<PathBuf>,

    /// Print status and exit
    #[arg(long)]
    status: bool,
}

impl Cli {
    /// Layers flags over the file configuration.
    fn config(&self) -> Result<OntoloomConfig> {
        let mut config = OntoloomConfig::discover(self.config.as_deref())?;
        if let Some(schema) = &self.schema {
            config.schema = Some(schema.clone());
        }
        if let Some(dir) = &self.blob_dir {
            config.blobs.dir.clone_from(dir);
        }
        if let Some(file) = &self.store {
            config.store.file = Some(file.clone());
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    match run(&Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError: {e}\x1b[0m");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = cli.config()?;
    logging::init(&config.log)?;

    let graph = Arc::new(match &config.store.file {
        Some(path) => MemoryGraph::open(path)?,
        None => MemoryGraph::new(),
    });
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::open(&config.blobs.dir)?);
    let context = Arc::new(
        ModelContext::new(graph.clone(), blobs).with_retry(config.retry.policy()),
    );
    if let Some(schema) = &config.schema {
        context.load_schema(schema)?;
    }

    let code = if cli.status {
        println!("{}", context.status());
        ExitCode::SUCCESS
    } else {
        let mut repl = Repl::new(Session::new(Arc::clone(&context)))?.with_json(cli.json);
        if let Some(path) = &config.store.file {
            repl = repl.with_snapshot(graph.clone(), path.clone());
        }
        if cli.batch.is_empty() {
            repl.run()?;
            ExitCode::SUCCESS
        } else {
            let mut failures = 0;
            for file in &cli.batch {
                let script = fs::read_to_string(file).map_err(|e| {
                    Error::new(ErrorKind::IoError(format!("failed to read '{}': {e}", file.display())))
                })?;
                info!(file = %file.display(), "running batch");
                failures += repl.run_script(&script);
            }
            if failures == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    };

    if let Some(path) = &config.store.file {
        graph.save_to_file(path)?;
    }
    Ok(code)
}
