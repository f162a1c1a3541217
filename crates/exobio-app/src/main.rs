//! Exobio application binary - composition root.
//!
//! Ties together the Exobio crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Open the publication store (SQLite)
//! 3. Construct the text encoder and index manager
//! 4. Dispatch the requested subcommand (seed, build, search, timeline)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use exobio_core::config::ExobioConfig;
use exobio_core::types::{IndexDocument, Publication, PublicationFilters};
use exobio_corpus::{Database, PublicationStore};
use exobio_vector::{DynTextEncoder, HashEncoder, OnnxTextEncoder, SearchIndex, TextEncoder};

mod cli;

use cli::{CliArgs, Command};

/// Construct the text encoder from configuration.
///
/// Uses the ONNX model when its files are present under the configured
/// model directory; otherwise falls back to the deterministic hash encoder
/// so the backend stays usable without a model download.
fn make_encoder(config: &ExobioConfig) -> Box<dyn DynTextEncoder> {
    let model_dir = expand_home(&config.encoder.model_dir);

    if model_dir.join("model.onnx").exists() && model_dir.join("tokenizer.json").exists() {
        match OnnxTextEncoder::from_directory(&model_dir, config.encoder.max_tokens) {
            Ok(encoder) => {
                if TextEncoder::dimensions(&encoder) != config.encoder.dimension {
                    tracing::warn!(
                        configured = config.encoder.dimension,
                        detected = TextEncoder::dimensions(&encoder),
                        "Configured embedding dimension differs from model output"
                    );
                }
                tracing::info!(
                    model = %config.encoder.model_name,
                    "Using ONNX text encoder"
                );
                return Box::new(encoder);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load ONNX model — using hash encoder");
            }
        }
    } else {
        tracing::warn!(
            dir = %model_dir.display(),
            "No encoder model found — using deterministic hash encoder"
        );
    }

    Box::new(HashEncoder::new())
}

/// True if the publication passes every set filter.
fn matches_filters(publication: &Publication, filters: &PublicationFilters) -> bool {
    let contains = |haystack: &str, needle: &str| {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    };

    if let Some(ref organism) = filters.organism {
        if !contains(&publication.organism, organism) {
            return false;
        }
    }
    if let Some(ref experiment_type) = filters.experiment_type {
        if !contains(&publication.experiment_type, experiment_type) {
            return false;
        }
    }
    if let Some(ref mission) = filters.mission {
        if !contains(&publication.mission, mission) {
            return false;
        }
    }
    if let Some(year) = filters.year {
        if publication.year != year {
            return false;
        }
    }
    true
}

/// Expand ~ to home directory in a path string.
fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&path[2..])
    } else {
        PathBuf::from(path)
    }
}

async fn run_search(
    store: &PublicationStore,
    manager: &SearchIndex,
    config: &ExobioConfig,
    query: &str,
    k: Option<usize>,
    filters: &PublicationFilters,
) -> Result<(), Box<dyn std::error::Error>> {
    let k = k
        .unwrap_or(config.search.default_k)
        .min(config.search.max_k);

    if manager.is_ready() {
        // Fetch extra candidates when filters are set, since filtering
        // happens after the nearest-neighbor query.
        let fetch_count = if filters.is_empty() { k } else { k * 3 };
        let hits = manager.search(query, fetch_count).await?;

        let mut shown = 0;
        for hit in hits {
            let Some(publication) = store.find_by_id(hit.document_id)? else {
                continue;
            };
            if !matches_filters(&publication, filters) {
                continue;
            }

            println!(
                "{:.4}  [{}] {} ({}, {})",
                hit.similarity_score,
                publication.id,
                publication.title,
                publication.year,
                publication.mission
            );
            shown += 1;
            if shown >= k {
                break;
            }
        }

        if shown == 0 {
            println!("No results.");
        }
    } else {
        tracing::warn!("No vector index available — falling back to substring search");
        let results = store.search(Some(query), filters)?;
        if results.is_empty() {
            println!("No results.");
        }
        for publication in results.iter().take(k) {
            println!(
                "[{}] {} ({}, {})",
                publication.id, publication.title, publication.year, publication.mission
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing.
    let default_level = args
        .resolve_log_level()
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    // Config.
    let config_file = args.resolve_config_path();
    let config = ExobioConfig::load_or_default(&config_file);
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| expand_home(&config.general.data_dir));

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let db_path = data_dir.join("publications.db");
    let db = Arc::new(Database::new(&db_path)?);
    let store = PublicationStore::new(Arc::clone(&db));
    tracing::info!(path = %db_path.display(), "Publication store opened");

    // Vector index manager.
    let manager = SearchIndex::new_dyn(
        make_encoder(&config),
        config.index_path(&data_dir),
        config.metadata_path(&data_dir),
    )
    .with_encode_timeout(Duration::from_millis(config.encoder.timeout_ms));

    match args.command {
        Command::Seed => {
            let inserted = store.seed_samples()?;
            if inserted == 0 {
                println!("Store already contains publications — nothing seeded.");
            } else {
                println!("Seeded {} sample publications.", inserted);
            }
        }

        Command::Build => {
            let publications = store.list_all()?;
            let documents: Vec<IndexDocument> =
                publications.iter().map(IndexDocument::from).collect();

            match manager.build_index(&documents).await {
                Ok(report) => {
                    println!(
                        "Indexed {} publications ({} degraded).",
                        report.indexed(),
                        report.degraded()
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Index build failed");
                    return Err(e.into());
                }
            }
        }

        Command::Search {
            ref query,
            k,
            ref organism,
            ref experiment_type,
            ref mission,
            year,
        } => {
            let filters = PublicationFilters {
                organism: organism.clone(),
                experiment_type: experiment_type.clone(),
                mission: mission.clone(),
                year,
            };

            // Restore a persisted index if one exists; a missing or
            // inconsistent artifact just means substring fallback.
            manager.load()?;

            run_search(&store, &manager, &config, query, k, &filters).await?;
        }

        Command::Timeline => {
            for entry in store.timeline()? {
                println!(
                    "{}  [{}] {} — {} ({})",
                    entry.year, entry.id, entry.title, entry.mission, entry.experiment_type
                );
            }
        }
    }

    Ok(())
}
