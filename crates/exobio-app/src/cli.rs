//! CLI argument definitions for the Exobio backend.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Exobio — a knowledge-exploration backend for space-biology publications.
#[derive(Parser, Debug)]
#[command(name = "exobio", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory for the publication database and index artifacts.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Seed the bundled sample publications into an empty store.
    Seed,

    /// Build the vector index from all stored publications.
    Build,

    /// Search publications semantically (or by substring without an index).
    Search {
        /// Query text.
        query: String,

        /// Number of results to return.
        #[arg(short, long)]
        k: Option<usize>,

        /// Filter by organism (substring match).
        #[arg(long)]
        organism: Option<String>,

        /// Filter by experiment type (substring match).
        #[arg(long)]
        experiment_type: Option<String>,

        /// Filter by mission (substring match).
        #[arg(long)]
        mission: Option<String>,

        /// Filter by publication year (exact).
        #[arg(long)]
        year: Option<i32>,
    },

    /// Print the experiment timeline.
    Timeline,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > EXOBIO_CONFIG env var > ~/.exobio/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("EXOBIO_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    /// Returns `None` if not overridden.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".exobio").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".exobio").join("config.toml");
    }
    PathBuf::from("config.toml")
}
