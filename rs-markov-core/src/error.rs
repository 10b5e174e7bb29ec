//! Error type shared by every fallible chain operation.
//!
//! Walk terminations (boundary, dead end, repetition, timeout) are not
//! errors; they are reported through [`crate::model::walker::Termination`].

use std::io;

use thiserror::Error;

/// Errors surfaced by the chain builder, the generator and the loaders.
#[derive(Error, Debug)]
pub enum ChainError {
	/// Rejected input: empty sequence, blank token or out-of-range option.
	/// The chain is left untouched.
	#[error("Invalid input: {0}")]
	InvalidInput(String),

	/// Generation was requested on a chain without any start word.
	#[error("Chain is empty, nothing to generate from")]
	EmptyChain,

	/// Every attempt failed the acceptance predicate.
	#[error("Could not generate sentence after {attempts} attempts")]
	GenerationExhausted { attempts: usize },

	/// A tokenizer pattern failed to compile.
	#[error("Pattern error: {0}")]
	Pattern(String),

	/// Corpus file access.
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ChainError>;

impl ChainError {
	/// Creates an [`ChainError::InvalidInput`] from any message.
	pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
		ChainError::InvalidInput(msg.into())
	}
}
