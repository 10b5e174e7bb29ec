//! Markov chain sentence generation library.
//!
//! This crate provides:
//! - A weighted token-adjacency chain built incrementally from token sequences
//! - Sentence generation by walking the chain backward and forward from a seed
//! - Tokenizers turning raw text into (optionally windowed) tokens
//! - Parallel loading of text corpora
//!
//! The chain lives in memory only. Ingestion needs `&mut MarkovChain` and
//! generation `&MarkovChain`, so the two never overlap on the same chain.

/// Error type and result alias.
pub mod error;

/// Chain store, walker and generator.
pub mod model;

/// Tokenizers and window merging.
pub mod tokenizer;

/// Corpus file helpers (listing, normalizing folders).
pub mod io;

pub use error::{ChainError, Result};
