use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the Exobio backend.
///
/// Loaded from `~/.exobio/config.toml` by default. Each section corresponds
/// to one subsystem; missing sections fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExobioConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

impl ExobioConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ExobioConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Absolute path of the index artifact blob inside the data directory.
    pub fn index_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.index.index_file)
    }

    /// Absolute path of the index metadata file inside the data directory.
    pub fn metadata_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.index.metadata_file)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the publication database and index artifacts.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.exobio/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Text encoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Embedding model identifier (informational, recorded in logs).
    pub model_name: String,
    /// Directory containing `model.onnx` and `tokenizer.json`.
    pub model_dir: String,
    /// Embedding dimension produced by the model.
    pub dimension: usize,
    /// Token budget; input is truncated beyond this length.
    pub max_tokens: usize,
    /// Per-document encoding timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            model_name: "pubmedbert-base-abstract".to_string(),
            model_dir: "~/.exobio/models/pubmedbert".to_string(),
            dimension: 768,
            max_tokens: 512,
            timeout_ms: 10_000,
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default number of results returned by a semantic search.
    pub default_k: usize,
    /// Maximum number of results a caller may request.
    pub max_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_k: 10,
            max_k: 100,
        }
    }
}

/// Index artifact configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// File name of the serialized vector index blob.
    pub index_file: String,
    /// File name of the metadata file holding the document id list.
    pub metadata_file: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_file: "vector_index.bin".to_string(),
            metadata_file: "vector_metadata.json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ExobioConfig::default();
        assert_eq!(config.general.data_dir, "~/.exobio/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.encoder.dimension, 768);
        assert_eq!(config.encoder.max_tokens, 512);
        assert_eq!(config.search.default_k, 10);
        assert_eq!(config.index.index_file, "vector_index.bin");
        assert_eq!(config.index.metadata_file, "vector_metadata.json");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/custom/data"
log_level = "debug"

[encoder]
model_name = "minilm"
dimension = 384
max_tokens = 256
timeout_ms = 2000

[search]
default_k = 5
max_k = 50
"#;
        let file = create_temp_config(content);
        let config = ExobioConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/custom/data");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.encoder.model_name, "minilm");
        assert_eq!(config.encoder.dimension, 384);
        assert_eq!(config.search.default_k, 5);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[general]
log_level = "warn"
"#;
        let file = create_temp_config(content);
        let config = ExobioConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        // Remaining fields use defaults
        assert_eq!(config.encoder.dimension, 768);
        assert_eq!(config.search.default_k, 10);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ExobioConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.exobio/data");
    }

    #[test]
    fn test_load_invalid_toml_errors() {
        let file = create_temp_config("not [ valid toml");
        assert!(ExobioConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = ExobioConfig::default();
        config.save(&path).unwrap();

        let reloaded = ExobioConfig::load(&path).unwrap();
        assert_eq!(reloaded.general.data_dir, config.general.data_dir);
        assert_eq!(reloaded.encoder.dimension, config.encoder.dimension);
        assert_eq!(reloaded.index.index_file, config.index.index_file);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ExobioConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let deserialized: ExobioConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.general.log_level, config.general.log_level);
        assert_eq!(deserialized.encoder.max_tokens, config.encoder.max_tokens);
    }

    #[test]
    fn test_artifact_paths() {
        let config = ExobioConfig::default();
        let data_dir = Path::new("/data");
        assert_eq!(
            config.index_path(data_dir),
            PathBuf::from("/data/vector_index.bin")
        );
        assert_eq!(
            config.metadata_path(data_dir),
            PathBuf::from("/data/vector_metadata.json")
        );
    }
}
