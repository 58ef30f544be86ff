//! # RagKit Core
//!
//! Shared foundation for the RagKit retrieval engine: error taxonomy,
//! configuration, passage/query types, degradation-aware outcomes, and the
//! capability traits (`ChatModel`, `Embedder`, `Reranker`) that the provider
//! and retrieval crates plug into.

pub mod config;
pub mod error;
pub mod outcome;
pub mod traits;
pub mod types;

pub use config::RagKitConfig;
pub use error::{RagKitError, Result};
pub use outcome::{Degradation, Retrieved};
pub use types::{QueryPlan, RankedDoc, ScoredPassage};
