//! Index manager: owns the similarity index lifecycle.
//!
//! `SearchIndex` composes a text encoder and a [`FlatIndex`], turning a
//! publication collection into a queryable index and persisting the
//! index/document-id pair as a unit. It is the only component that mutates
//! index state; everything else goes through `build_index` and `search`.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use exobio_core::error::ExobioError;
use exobio_core::types::IndexDocument;

use crate::encoder::{DynTextEncoder, TextEncoder};
use crate::index::FlatIndex;

/// A single hit returned from a semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Identifier of the matching document.
    pub document_id: i64,
    /// Cosine similarity score against the query.
    pub similarity_score: f32,
}

/// Per-document outcome of an index build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// The document was embedded normally.
    Embedded,
    /// Encoding failed; the document was indexed with a zero vector so the
    /// build could continue.
    Degraded { reason: String },
}

/// Result of a completed index build.
///
/// Every supplied document is indexed; `statuses` records which of them
/// carry a degraded (zero-vector) embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub statuses: Vec<(i64, DocumentStatus)>,
}

impl BuildReport {
    /// Number of documents in the index.
    pub fn indexed(&self) -> usize {
        self.statuses.len()
    }

    /// Number of documents indexed with a degraded embedding.
    pub fn degraded(&self) -> usize {
        self.statuses
            .iter()
            .filter(|(_, status)| matches!(status, DocumentStatus::Degraded { .. }))
            .count()
    }
}

/// Metadata persisted alongside the index blob.
///
/// The count field is cross-checked against both the id list and the
/// blob's own vector count on load; any disagreement rejects the artifact.
#[derive(Debug, Serialize, Deserialize)]
struct IndexMetadata {
    dimension: usize,
    count: usize,
    document_ids: Vec<i64>,
}

/// Index plus the document ids its positions map back to.
///
/// `document_ids[i]` corresponds to row i of the index; the pair is
/// replaced as a unit on every rebuild.
struct IndexState {
    index: FlatIndex,
    document_ids: Vec<i64>,
}

/// Manager for building, querying, and persisting the similarity index.
///
/// Uses dynamic dispatch (`Box<dyn DynTextEncoder>`) so that production
/// code can supply `OnnxTextEncoder` while tests use `HashEncoder`.
pub struct SearchIndex {
    encoder: Box<dyn DynTextEncoder>,
    state: RwLock<Option<IndexState>>,
    index_path: PathBuf,
    metadata_path: PathBuf,
    encode_timeout: Duration,
}

impl SearchIndex {
    /// Create a manager with the given encoder and artifact paths.
    ///
    /// The manager starts with no index loaded; call [`SearchIndex::load`]
    /// to restore a persisted artifact or [`SearchIndex::build_index`] to
    /// build one.
    pub fn new(
        encoder: impl TextEncoder + 'static,
        index_path: PathBuf,
        metadata_path: PathBuf,
    ) -> Self {
        Self::new_dyn(Box::new(encoder), index_path, metadata_path)
    }

    /// Create a manager from a pre-boxed dynamic encoder.
    pub fn new_dyn(
        encoder: Box<dyn DynTextEncoder>,
        index_path: PathBuf,
        metadata_path: PathBuf,
    ) -> Self {
        Self {
            encoder,
            state: RwLock::new(None),
            index_path,
            metadata_path,
            encode_timeout: Duration::from_secs(10),
        }
    }

    /// Override the per-document encoding timeout.
    pub fn with_encode_timeout(mut self, timeout: Duration) -> Self {
        self.encode_timeout = timeout;
        self
    }

    /// True if an index is currently built or loaded.
    pub fn is_ready(&self) -> bool {
        self.state.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Build (or rebuild) the index from the given document collection.
    ///
    /// Each document's title and abstract are concatenated, encoded, and
    /// L2-normalized. A document whose encoding fails (or times out) is
    /// indexed with a zero vector rather than aborting the build; the
    /// returned [`BuildReport`] records those degradations. The previous
    /// index, if any, stays in place until the new one is complete, and is
    /// preserved unchanged if the build fails.
    pub async fn build_index(
        &self,
        documents: &[IndexDocument],
    ) -> Result<BuildReport, ExobioError> {
        if documents.is_empty() {
            return Err(ExobioError::Index(
                "cannot build an index over an empty document collection".to_string(),
            ));
        }

        let mut rows: Vec<Vec<f32>> = Vec::with_capacity(documents.len());
        let mut document_ids: Vec<i64> = Vec::with_capacity(documents.len());
        let mut statuses: Vec<(i64, DocumentStatus)> = Vec::with_capacity(documents.len());

        // Encode sequentially in document order; row i must stay aligned
        // with document_ids[i].
        for document in documents {
            let text = document.embedding_text();
            let (mut vector, status) = self.encode_or_zero(&text).await;

            if let DocumentStatus::Degraded { ref reason } = status {
                warn!(
                    document_id = document.id,
                    reason = %reason,
                    "Document indexed with degraded embedding"
                );
            }

            normalize(&mut vector);
            rows.push(vector);
            document_ids.push(document.id);
            statuses.push((document.id, status));
        }

        let index = FlatIndex::build(&rows)?;

        {
            let mut state = self.write_state()?;
            *state = Some(IndexState {
                index,
                document_ids,
            });
        }

        let report = BuildReport { statuses };
        info!(
            documents = report.indexed(),
            degraded = report.degraded(),
            "Vector index built"
        );

        if let Err(e) = self.save() {
            warn!(error = %e, "Failed to persist index artifact");
        }

        Ok(report)
    }

    /// Search for the k documents most similar to the query text.
    ///
    /// Returns an empty list when no index is built or loaded (cold start
    /// is not an error). Query encoding failures degrade to a zero vector,
    /// which scores 0 against every document rather than failing the call.
    pub async fn search(&self, query_text: &str, k: usize) -> Result<Vec<SearchHit>, ExobioError> {
        if !self.is_ready() {
            return Ok(Vec::new());
        }

        let (mut query, status) = self.encode_or_zero(query_text).await;
        if let DocumentStatus::Degraded { ref reason } = status {
            debug!(reason = %reason, "Query encoded with degraded embedding");
        }
        normalize(&mut query);

        let guard = self.read_state()?;
        let Some(state) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let hits = state.index.query(&query, k)?;

        // Positions outside the id list can only come from corrupted state;
        // skip them instead of crashing.
        Ok(hits
            .into_iter()
            .filter_map(|(position, similarity_score)| {
                state
                    .document_ids
                    .get(position)
                    .map(|&document_id| SearchHit {
                        document_id,
                        similarity_score,
                    })
            })
            .collect())
    }

    /// Persist the current index and its document ids to disk.
    ///
    /// Both files are written to a temporary path and renamed into place so
    /// a concurrent reader never observes a torn write. A manager with no
    /// index is a no-op.
    pub fn save(&self) -> Result<(), ExobioError> {
        let (blob, metadata) = {
            let guard = self.read_state()?;
            let Some(state) = guard.as_ref() else {
                return Ok(());
            };
            let metadata = IndexMetadata {
                dimension: state.index.dimensions(),
                count: state.index.len(),
                document_ids: state.document_ids.clone(),
            };
            (state.index.to_bytes(), metadata)
        };

        write_atomic(&self.index_path, &blob)?;
        write_atomic(
            &self.metadata_path,
            serde_json::to_string(&metadata)?.as_bytes(),
        )?;

        info!(
            documents = metadata.count,
            index = %self.index_path.display(),
            "Index artifact saved"
        );
        Ok(())
    }

    /// Restore the index/document-id pair from disk.
    ///
    /// Returns `Ok(true)` when a consistent artifact was loaded. A missing,
    /// unreadable, or mutually inconsistent artifact leaves the manager in
    /// the "no index" state and returns `Ok(false)` rather than failing.
    pub fn load(&self) -> Result<bool, ExobioError> {
        if !self.index_path.exists() || !self.metadata_path.exists() {
            debug!("No index artifact found");
            *self.write_state()? = None;
            return Ok(false);
        }

        let blob = match std::fs::read(&self.index_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to read index blob; starting without an index");
                *self.write_state()? = None;
                return Ok(false);
            }
        };

        let index = match FlatIndex::from_bytes(&blob) {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "Index blob rejected; starting without an index");
                *self.write_state()? = None;
                return Ok(false);
            }
        };

        let metadata: IndexMetadata = match std::fs::read_to_string(&self.metadata_path)
            .map_err(ExobioError::from)
            .and_then(|content| serde_json::from_str(&content).map_err(ExobioError::from))
        {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(error = %e, "Index metadata rejected; starting without an index");
                *self.write_state()? = None;
                return Ok(false);
            }
        };

        if metadata.count != metadata.document_ids.len()
            || metadata.count != index.len()
            || metadata.dimension != index.dimensions()
        {
            warn!(
                metadata_count = metadata.count,
                id_count = metadata.document_ids.len(),
                index_count = index.len(),
                "Index artifact inconsistent; starting without an index"
            );
            *self.write_state()? = None;
            return Ok(false);
        }

        if metadata.dimension != self.encoder.dimensions() {
            warn!(
                artifact_dimension = metadata.dimension,
                encoder_dimension = self.encoder.dimensions(),
                "Index artifact dimension does not match encoder; starting without an index"
            );
            *self.write_state()? = None;
            return Ok(false);
        }

        let count = metadata.count;
        *self.write_state()? = Some(IndexState {
            index,
            document_ids: metadata.document_ids,
        });

        info!(documents = count, "Index artifact loaded");
        Ok(true)
    }

    /// Encode text, substituting a zero vector on failure or timeout.
    async fn encode_or_zero(&self, text: &str) -> (Vec<f32>, DocumentStatus) {
        let dimensions = self.encoder.dimensions();

        match tokio::time::timeout(self.encode_timeout, self.encoder.encode_boxed(text)).await {
            Ok(Ok(vector)) if vector.len() == dimensions => (vector, DocumentStatus::Embedded),
            Ok(Ok(vector)) => (
                vec![0.0; dimensions],
                DocumentStatus::Degraded {
                    reason: format!(
                        "encoder returned dimension {} (expected {})",
                        vector.len(),
                        dimensions
                    ),
                },
            ),
            Ok(Err(e)) => (
                vec![0.0; dimensions],
                DocumentStatus::Degraded {
                    reason: e.to_string(),
                },
            ),
            Err(_) => (
                vec![0.0; dimensions],
                DocumentStatus::Degraded {
                    reason: format!("encoding timed out after {:?}", self.encode_timeout),
                },
            ),
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, Option<IndexState>>, ExobioError> {
        self.state
            .read()
            .map_err(|e| ExobioError::Index(format!("index lock poisoned: {}", e)))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, Option<IndexState>>, ExobioError> {
        self.state
            .write()
            .map_err(|e| ExobioError::Index(format!("index lock poisoned: {}", e)))
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("index_path", &self.index_path)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Scale a vector to unit L2 norm in place. Zero vectors stay zero.
fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Write bytes to a temporary sibling path, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExobioError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::HashEncoder;
    use exobio_core::error::ExobioError;
    use std::path::Path;

    fn make_manager(dir: &Path) -> SearchIndex {
        SearchIndex::new(
            HashEncoder::new(),
            dir.join("vector_index.bin"),
            dir.join("vector_metadata.json"),
        )
    }

    /// The four sample publications, reduced to their indexable slice.
    fn sample_documents() -> Vec<IndexDocument> {
        vec![
            IndexDocument {
                id: 1,
                title: "Effects of Microgravity on Plant Cell Walls and Growth Patterns"
                    .to_string(),
                abstract_text: "This study investigates how microgravity conditions aboard the \
                    International Space Station affect plant cell wall composition and growth \
                    patterns in Arabidopsis thaliana."
                    .to_string(),
            },
            IndexDocument {
                id: 2,
                title: "Bone Density Changes in Astronauts During Long-Duration Spaceflight"
                    .to_string(),
                abstract_text: "Comprehensive analysis of bone mineral density changes in \
                    astronauts during 6-month missions."
                    .to_string(),
            },
            IndexDocument {
                id: 3,
                title: "Microbial Community Dynamics in Closed-Loop Life Support Systems"
                    .to_string(),
                abstract_text: "Investigation of microbial ecosystem stability and succession \
                    patterns in spacecraft environmental control systems."
                    .to_string(),
            },
            IndexDocument {
                id: 4,
                title: "Radiation Effects on DNA Repair Mechanisms in Human Cells".to_string(),
                abstract_text: "Analysis of DNA damage and repair pathway efficiency in human \
                    cells exposed to space radiation."
                    .to_string(),
            },
        ]
    }

    /// Encoder that always fails, for exercising the zero-vector fallback.
    #[derive(Debug, Clone)]
    struct FailingEncoder;

    impl TextEncoder for FailingEncoder {
        async fn encode(&self, _text: &str) -> Result<Vec<f32>, ExobioError> {
            Err(ExobioError::Encoding("model unavailable".to_string()))
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    /// Encoder that never completes within a short timeout.
    #[derive(Debug, Clone)]
    struct SlowEncoder;

    impl TextEncoder for SlowEncoder {
        async fn encode(&self, _text: &str) -> Result<Vec<f32>, ExobioError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![0.0; 8])
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    #[tokio::test]
    async fn test_search_cold_start_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        let hits = manager.search("microgravity", 10).await.unwrap();
        assert!(hits.is_empty());
        assert!(!manager.is_ready());
    }

    #[tokio::test]
    async fn test_build_empty_collection_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        assert!(manager.build_index(&[]).await.is_err());
        assert!(!manager.is_ready());
    }

    #[tokio::test]
    async fn test_build_failure_preserves_prior_index() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        manager.build_index(&sample_documents()).await.unwrap();
        assert!(manager.is_ready());

        assert!(manager.build_index(&[]).await.is_err());
        assert!(manager.is_ready());

        let hits = manager.search("bone density astronauts", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, 2);
    }

    #[tokio::test]
    async fn test_self_similarity_tops_results() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        let documents = sample_documents();
        manager.build_index(&documents).await.unwrap();

        for document in &documents {
            let hits = manager.search(&document.embedding_text(), 4).await.unwrap();
            assert!(!hits.is_empty());
            assert_eq!(
                hits[0].document_id, document.id,
                "document {} should top a search for its own text",
                document.id
            );
            assert!((hits[0].similarity_score - 1.0).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn test_scenario_plant_growth_query() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        manager.build_index(&sample_documents()).await.unwrap();

        let hits = manager
            .search("plant growth microgravity cell walls", 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id, 1);
    }

    #[tokio::test]
    async fn test_top_k_bound() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        manager.build_index(&sample_documents()).await.unwrap();

        let hits = manager.search("space biology", 10).await.unwrap();
        assert!(hits.len() <= 4);

        let hits = manager.search("space biology", 2).await.unwrap();
        assert!(hits.len() <= 2);
    }

    #[tokio::test]
    async fn test_search_determinism() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        manager.build_index(&sample_documents()).await.unwrap();

        let first = manager.search("radiation DNA repair", 4).await.unwrap();
        let second = manager.search("radiation DNA repair", 4).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_index() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        let documents = sample_documents();
        manager.build_index(&documents).await.unwrap();
        manager.build_index(&documents[..2]).await.unwrap();

        let hits = manager.search("microbial life support", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.document_id == 1 || h.document_id == 2));
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        manager.build_index(&sample_documents()).await.unwrap();
        let before = manager
            .search("plant growth microgravity cell walls", 4)
            .await
            .unwrap();

        // A fresh manager over the same artifact paths must reproduce the
        // exact same results after load.
        let restored = make_manager(dir.path());
        assert!(restored.load().unwrap());
        let after = restored
            .search("plant growth microgravity cell walls", 4)
            .await
            .unwrap();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_load_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        assert!(!manager.load().unwrap());
        assert!(!manager.is_ready());
        assert!(manager.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_rejects_metadata_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());
        manager.build_index(&sample_documents()).await.unwrap();

        // Rewrite the metadata with a count that disagrees with the blob.
        let metadata_path = dir.path().join("vector_metadata.json");
        std::fs::write(
            &metadata_path,
            r#"{"dimension":384,"count":99,"document_ids":[1,2,3,4]}"#,
        )
        .unwrap();

        let restored = make_manager(dir.path());
        assert!(!restored.load().unwrap());
        assert!(!restored.is_ready());
        assert!(restored.search("plant growth", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_rejects_id_list_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());
        manager.build_index(&sample_documents()).await.unwrap();

        let metadata_path = dir.path().join("vector_metadata.json");
        std::fs::write(
            &metadata_path,
            r#"{"dimension":384,"count":4,"document_ids":[1,2]}"#,
        )
        .unwrap();

        let restored = make_manager(dir.path());
        assert!(!restored.load().unwrap());
        assert!(!restored.is_ready());
    }

    #[tokio::test]
    async fn test_load_rejects_garbage_blob() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());
        manager.build_index(&sample_documents()).await.unwrap();

        std::fs::write(dir.path().join("vector_index.bin"), b"not an index").unwrap();

        let restored = make_manager(dir.path());
        assert!(!restored.load().unwrap());
        assert!(!restored.is_ready());
    }

    #[tokio::test]
    async fn test_load_only_one_artifact_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());
        manager.build_index(&sample_documents()).await.unwrap();

        std::fs::remove_file(dir.path().join("vector_metadata.json")).unwrap();

        let restored = make_manager(dir.path());
        assert!(!restored.load().unwrap());
        assert!(!restored.is_ready());
    }

    #[tokio::test]
    async fn test_failed_encoding_degrades_to_zero_vector() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SearchIndex::new(
            FailingEncoder,
            dir.path().join("vector_index.bin"),
            dir.path().join("vector_metadata.json"),
        );

        let report = manager.build_index(&sample_documents()).await.unwrap();
        assert_eq!(report.indexed(), 4);
        assert_eq!(report.degraded(), 4);
        assert!(manager.is_ready());

        // Zero vectors score 0 against everything, but search still works.
        let hits = manager.search("plant growth", 4).await.unwrap();
        assert_eq!(hits.len(), 4);
        assert!(hits.iter().all(|h| h.similarity_score == 0.0));
    }

    #[tokio::test]
    async fn test_one_bad_document_does_not_abort_build() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(dir.path());

        let mut documents = sample_documents();
        documents.push(IndexDocument {
            id: 5,
            title: String::new(),
            abstract_text: String::new(),
        });

        let report = manager.build_index(&documents).await.unwrap();
        assert_eq!(report.indexed(), 5);
        assert_eq!(report.degraded(), 1);
        assert!(matches!(
            report.statuses[4],
            (5, DocumentStatus::Degraded { .. })
        ));

        let hits = manager
            .search("plant growth microgravity cell walls", 1)
            .await
            .unwrap();
        assert_eq!(hits[0].document_id, 1);
    }

    #[tokio::test]
    async fn test_encoding_timeout_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SearchIndex::new(
            SlowEncoder,
            dir.path().join("vector_index.bin"),
            dir.path().join("vector_metadata.json"),
        )
        .with_encode_timeout(Duration::from_millis(50));

        let report = manager
            .build_index(&sample_documents()[..1])
            .await
            .unwrap();
        assert_eq!(report.degraded(), 1);
        assert!(matches!(
            &report.statuses[0].1,
            DocumentStatus::Degraded { reason } if reason.contains("timed out")
        ));
    }

    #[test]
    fn test_build_report_counts() {
        let report = BuildReport {
            statuses: vec![
                (1, DocumentStatus::Embedded),
                (
                    2,
                    DocumentStatus::Degraded {
                        reason: "x".to_string(),
                    },
                ),
                (3, DocumentStatus::Embedded),
            ],
        };
        assert_eq!(report.indexed(), 3);
        assert_eq!(report.degraded(), 1);
    }
}
