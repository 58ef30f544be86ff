//! Capability traits at the engine's external seams.
//!
//! Everything network-backed hides behind one of these, so the retrieval
//! pipeline can be exercised with in-process mocks.

pub mod chat;
pub mod embedder;
pub mod reranker;

pub use chat::ChatModel;
pub use embedder::Embedder;
pub use reranker::Reranker;
