#![deny(missing_docs)]

//! Core library for the Rusty Paper question-answering server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and the Mistral adapter.
pub mod embedding;
/// Summary and vector indexes with their query engines.
pub mod index;
/// Upload storage, PDF loading, and chunking.
pub mod ingestion;
/// Text generation client abstraction and the Mistral adapter.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Indexing and query metrics helpers.
pub mod metrics;
/// Construction of the remote model clients.
pub mod models;
/// Query routing between the summary and vector engines.
pub mod routing;
/// Session-scoped RAG service.
pub mod service;
/// Per-session document and history state.
pub mod session;

#[cfg(test)]
mod testing;
