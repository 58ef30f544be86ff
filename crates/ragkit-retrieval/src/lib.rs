//! # RagKit Retrieval
//!
//! The retrieve-and-rank pipeline: turn one user query into a ranked set of
//! supporting passages.
//!
//! ```text
//! query ──► QueryTransformer ──► variants (rewrite, expansion, mirror, HyDE)
//!              │                        │
//!              │              concurrent embed + search per variant
//!              │                        │
//!              └──────────► merge / dedup / sort ──► prefilter
//!                                       │
//!                          (optional) rerank against the original query
//!                                       │
//!                                  top-k passages
//! ```
//!
//! Every network-backed stage degrades instead of failing: a lost variant,
//! an unparseable expansion, or a dead reranker narrows the result but the
//! call still answers, and the fallback is reported in the returned
//! [`Retrieved`](ragkit_core::Retrieved) tag.

pub mod context;
pub mod engine;
pub mod transform;

pub use context::format_context;
pub use engine::RetrievalEngine;
pub use transform::QueryTransformer;
