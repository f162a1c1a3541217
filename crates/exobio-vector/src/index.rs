//! Flat inner-product similarity index.
//!
//! Stores normalized embeddings as positionally-addressed rows and answers
//! top-k queries with an exact inner-product scan. All query work is O(n),
//! which is acceptable for publication corpora of moderate size.
//!
//! Callers are responsible for L2-normalizing both index rows and query
//! vectors before they reach this type; the inner product then equals
//! cosine similarity.

use exobio_core::error::ExobioError;

/// Magic bytes identifying a serialized index blob.
const MAGIC: [u8; 4] = *b"XBVI";

/// Current serialization format version.
const FORMAT_VERSION: u32 = 1;

/// Size of the serialized header: magic + version + dimension + count.
const HEADER_LEN: usize = 16;

/// Exact nearest-neighbor index over a fixed set of embedding rows.
///
/// Built in one shot from a complete embedding matrix; there is no
/// incremental insertion. Row order is the build order, and positions
/// returned by [`FlatIndex::query`] refer back to it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    // Row-major [count x dimensions] matrix.
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from an ordered sequence of embedding vectors.
    ///
    /// Rejects an empty sequence (there is no valid index over zero
    /// vectors) and any row whose dimension differs from the first.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self, ExobioError> {
        let first = vectors
            .first()
            .ok_or_else(|| ExobioError::Index("cannot build an index over zero vectors".to_string()))?;

        let dimensions = first.len();
        if dimensions == 0 {
            return Err(ExobioError::Index(
                "cannot build an index over zero-dimensional vectors".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(vectors.len() * dimensions);
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimensions {
                return Err(ExobioError::Index(format!(
                    "vector at position {} has dimension {} (expected {})",
                    position,
                    vector.len(),
                    dimensions
                )));
            }
            data.extend_from_slice(vector);
        }

        Ok(Self { dimensions, data })
    }

    /// Return the k rows with the highest inner product against the query.
    ///
    /// Results are ordered by descending score; ties break by ascending
    /// insertion position so that repeated queries are reproducible. At
    /// most `min(k, len)` results are returned.
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, ExobioError> {
        if query.len() != self.dimensions {
            return Err(ExobioError::Index(format!(
                "query has dimension {} (expected {})",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .rows()
            .map(|row| row.iter().zip(query.iter()).map(|(a, b)| a * b).sum())
            .enumerate()
            .collect();

        scored.sort_by(|(pos_a, score_a), (pos_b, score_b)| {
            score_b.total_cmp(score_a).then(pos_a.cmp(pos_b))
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Number of vectors in the index.
    pub fn len(&self) -> usize {
        self.data.len() / self.dimensions
    }

    /// True if the index holds no vectors. Never the case for a built
    /// index, but kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Dimensionality of the indexed vectors.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Serialize the index into a self-describing binary blob.
    ///
    /// Layout: 4-byte magic, u32 format version, u32 dimension, u32 count,
    /// then `count * dimension` f32 values, all little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimensions as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Reconstruct an index from a blob produced by [`FlatIndex::to_bytes`].
    ///
    /// Validates the magic, format version, and that the payload length
    /// matches the dimension and count recorded in the header. Vector data
    /// round-trips bit-exactly.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExobioError> {
        if bytes.len() < HEADER_LEN {
            return Err(ExobioError::Index(format!(
                "index blob too short: {} bytes",
                bytes.len()
            )));
        }

        if bytes[0..4] != MAGIC {
            return Err(ExobioError::Index("index blob has invalid magic".to_string()));
        }

        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap_or_default());
        if version != FORMAT_VERSION {
            return Err(ExobioError::Index(format!(
                "unsupported index format version {}",
                version
            )));
        }

        let dimensions = u32::from_le_bytes(bytes[8..12].try_into().unwrap_or_default()) as usize;
        let count = u32::from_le_bytes(bytes[12..16].try_into().unwrap_or_default()) as usize;

        if dimensions == 0 || count == 0 {
            return Err(ExobioError::Index(
                "index blob declares an empty index".to_string(),
            ));
        }

        let expected_len = HEADER_LEN + count * dimensions * 4;
        if bytes.len() != expected_len {
            return Err(ExobioError::Index(format!(
                "index blob length {} does not match header ({} vectors of dimension {})",
                bytes.len(),
                count,
                dimensions
            )));
        }

        let data = bytes[HEADER_LEN..]
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap_or_default()))
            .collect();

        Ok(Self { dimensions, data })
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimensions)
    }
}
