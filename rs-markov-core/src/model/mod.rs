//! Top-level module of the Markov chain generator.
//!
//! - Weighted adjacency of a node in one direction (`Transitions`)
//! - Chain nodes, sentinel keys and source references (`ChainNode`, `ChainKey`, `Reference`)
//! - The chain store and builder (`MarkovChain`)
//! - Directed random walks (`walker`)
//! - Generation parameters (`GenerateOptions`) and the bidirectional generator

/// The chain store: ingestion, bulk loading, merging and read-only snapshots.
pub mod chain;

/// Sentence generation from two concurrent walks.
pub mod generator;

/// Chain node and key types.
pub mod node;

/// Generation parameters: seed, retries, time limit, acceptance predicate.
pub mod options;

/// Source metadata attached to tokens.
pub mod reference;

/// Ordered, weighted neighbors with roulette-wheel sampling.
pub mod transitions;

/// One directed walk over a chain snapshot.
pub mod walker;

pub use chain::{ChainConfig, ChainStats, Corpus, MarkovChain};
pub use generator::GeneratedSentence;
pub use node::{Boundary, ChainKey, ChainNode};
pub use options::GenerateOptions;
pub use reference::{IngestionId, Metadata, Reference, Refs};
pub use walker::{Direction, Termination, WalkOutcome};
