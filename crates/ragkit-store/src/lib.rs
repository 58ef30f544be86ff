//! # RagKit Vector Store
//!
//! Durable nearest-neighbor search over ingested passages.
//!
//! ## Design
//! - **Two files, parallel order** — `passages.jsonl` (one JSON record per
//!   line: id, text, metadata, timestamp) and `vectors.bin` (dense f32
//!   matrix in insertion order). Matching record counts are a load-time
//!   integrity invariant.
//! - **Append-only** — records are immutable once written; nothing shrinks
//!   through this interface.
//! - **Full in-memory scan** — cosine similarity against every stored
//!   vector, parallelized across rows. No ANN index; corpora here are
//!   thousands of chunks, not millions.
//! - **Snapshot swap** — ingestion builds and persists a new snapshot, then
//!   swaps it in under the write lock, so a search never observes a
//!   half-written matrix.

pub mod matrix;
pub mod store;

pub use matrix::VectorMatrix;
pub use store::{StoredPassage, VectorStore};
