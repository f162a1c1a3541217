//! Exobio Vector crate - similarity index, text encoder, and index manager.
//!
//! Provides the semantic search core: an ONNX-backed text encoder with a
//! deterministic hash fallback, a flat inner-product index over normalized
//! embeddings, and a manager that builds, queries, and persists the
//! index/document-id pair as a unit.

pub mod encoder;
pub mod index;
pub mod manager;

pub use encoder::{DynTextEncoder, HashEncoder, OnnxTextEncoder, TextEncoder};
pub use index::FlatIndex;
pub use manager::{BuildReport, DocumentStatus, SearchHit, SearchIndex};
