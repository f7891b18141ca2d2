//! Sightings CLI: process staged provider records into the observation index.
//!
//! Usage:
//!   sightings run [--provider ID ...] [--mode full|incremental] [--config PATH] [--db PATH]
//!   sightings stage --provider ID FILE [--db PATH]
//!   sightings status [--db PATH]

use clap::{Parser, Subcommand};
use serde::Deserialize;
use sightings::storage::{HarvestInfoStore, VerbatimStore};
use sightings::{
    CancellationToken, DataProvider, DiffusionManager, FactoryContext, JsonLinesExporter,
    ObservationProcessor, PipelineConfig, ProcessMode, ProcessingCoordinator, ProviderId,
    RunResult, RunStatus, SqliteStore, Stores, VerbatimRecord,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "sightings",
    version,
    about = "Species-observation processing pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,
}

#[derive(Subcommand)]
enum Commands {
    /// Process staged records of the configured providers
    Run {
        /// Pipeline configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only process these provider ids (repeatable)
        #[arg(long = "provider")]
        providers: Vec<u32>,
        /// full deletes the provider's committed data first
        #[arg(long, default_value = "incremental")]
        mode: ProcessMode,
        /// Write public observations as JSON Lines to this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
    /// Stage verbatim records from a JSON Lines file of {"key", "payload"} objects
    Stage {
        #[arg(long)]
        provider: u32,
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Show the last run of every provider
    Status,
}

#[derive(Deserialize)]
struct StagedLine {
    key: String,
    payload: serde_json::Value,
}

const STAGE_CHUNK: usize = 1_000;

/// Get the default database path (~/.local/share/sightings/sightings.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("sightings").join("sightings.db")
}

fn open_store(db: Option<PathBuf>) -> Result<Arc<SqliteStore>, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    SqliteStore::open(&db_path)
        .map(Arc::new)
        .map_err(|e| format!("Failed to open database {}: {}", db_path.display(), e))
}

fn select_providers(config: &PipelineConfig, ids: &[u32]) -> Result<Vec<DataProvider>, String> {
    if ids.is_empty() {
        return Ok(config.providers.clone());
    }
    ids.iter()
        .map(|&id| {
            config
                .providers
                .iter()
                .find(|p| p.id == ProviderId(id))
                .cloned()
                .ok_or_else(|| format!("provider {} is not configured", id))
        })
        .collect()
}

fn print_runs(runs: &[RunResult]) {
    println!(
        "{:>8}  {:<10}  {:>9}  {:>9}  {:>7}  {:>6}",
        "PROVIDER", "STATUS", "PUBLIC", "PROTECTED", "INVALID", "FAILED"
    );
    println!("{}", "-".repeat(60));
    for run in runs {
        println!(
            "{:>8}  {:<10}  {:>9}  {:>9}  {:>7}  {:>6}",
            run.provider_id,
            run.status,
            run.public_count,
            run.protected_count,
            run.invalid_count,
            run.failed_count
        );
        if let Some(message) = &run.message {
            println!("          {}", message);
        }
    }
}

fn cmd_run(
    store: Arc<SqliteStore>,
    config_path: Option<&Path>,
    provider_ids: &[u32],
    mode: ProcessMode,
    export_dir: Option<PathBuf>,
) -> i32 {
    let config = match config_path {
        Some(path) => PipelineConfig::load(path),
        None => Ok(PipelineConfig::default()),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let providers = match select_providers(&config, provider_ids) {
        Ok(p) if p.is_empty() => {
            eprintln!("Error: no providers configured");
            return 1;
        }
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let context = match FactoryContext::load(
        store.as_ref(),
        store.as_ref(),
        store.as_ref(),
        DiffusionManager::new(config.diffusion.clone()),
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to load reference data: {}", e);
            return 1;
        }
    };

    let mut processor = ObservationProcessor::new(Stores::sqlite(store), context, &config);
    if let Some(dir) = export_dir.or_else(|| config.export_dir.clone()) {
        processor = processor.with_export(Arc::new(JsonLinesExporter::new(dir)));
    }
    let coordinator = ProcessingCoordinator::new(Arc::new(processor), config.max_concurrent_providers);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return 1;
        }
    };
    let cancel = CancellationToken::new();
    let runs = runtime.block_on(async {
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping after the current batches");
                interrupt.cancel();
            }
        });
        coordinator.process_providers(&providers, mode, &cancel).await
    });

    print_runs(&runs);
    if runs.iter().all(|r| r.status == RunStatus::Succeeded) {
        0
    } else {
        1
    }
}

fn cmd_stage(store: &SqliteStore, provider: u32, path: &Path) -> i32 {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", path.display(), e);
            return 1;
        }
    };

    let mut chunk = Vec::with_capacity(STAGE_CHUNK);
    let mut staged = 0usize;
    for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StagedLine>(&line) {
            Ok(entry) => chunk.push(VerbatimRecord::new(ProviderId(provider), entry.key, entry.payload)),
            Err(e) => {
                eprintln!("Error: line {}: {}", n + 1, e);
                return 1;
            }
        }
        if chunk.len() == STAGE_CHUNK {
            if let Err(e) = store.insert_verbatim(&chunk) {
                eprintln!("Error: {}", e);
                return 1;
            }
            staged += chunk.len();
            chunk.clear();
        }
    }
    if let Err(e) = store.insert_verbatim(&chunk) {
        eprintln!("Error: {}", e);
        return 1;
    }
    staged += chunk.len();

    let total = store.count_verbatim(ProviderId(provider)).unwrap_or(0);
    println!("Staged {} records for provider {} ({} total)", staged, provider, total);
    0
}

fn cmd_status(store: &SqliteStore) -> i32 {
    match store.list_runs() {
        Ok(runs) if runs.is_empty() => {
            println!("No runs recorded.");
            0
        }
        Ok(runs) => {
            print_runs(&runs);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let store = match open_store(cli.db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Run {
            config,
            providers,
            mode,
            export_dir,
        } => cmd_run(store, config.as_deref(), &providers, mode, export_dir),
        Commands::Stage { provider, file } => cmd_stage(&store, provider, &file),
        Commands::Status => cmd_status(&store),
    };
    std::process::exit(code);
}
