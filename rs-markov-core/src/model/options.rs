use std::fmt;
use std::time::Duration;

use crate::error::{ChainError, Result};

use super::generator::GeneratedSentence;
use super::walker::DEFAULT_TIME_LIMIT;

/// Predicate deciding whether a generated sentence is returned or retried.
pub type Acceptance = Box<dyn Fn(&GeneratedSentence) -> bool + Send + Sync>;

/// Default number of attempts before giving up.
pub const DEFAULT_MAX_RETRIES: usize = 20;

/// Parameters of one `MarkovChain::generate` call.
///
/// # Responsibilities
/// - Carry the optional seed text and the per-walk time limit
/// - Bound the number of attempts (always positive)
/// - Hold the acceptance predicate (default: at least two words)
pub struct GenerateOptions {
	/// Text whose first known token seeds the walks. A random start word
	/// is drawn on each attempt when absent or unresolved.
	pub seed: Option<String>,

	/// Wall-clock budget of each walk before a boundary word is forced.
	pub time_limit: Duration,

	max_retries: usize,

	acceptance: Acceptance,
}

impl GenerateOptions {
	pub fn new() -> Self {
		Self {
			seed: None,
			time_limit: DEFAULT_TIME_LIMIT,
			max_retries: DEFAULT_MAX_RETRIES,
			acceptance: Box::new(|sentence| sentence.word_count() >= 2),
		}
	}

	/// Options seeded with `seed`.
	pub fn seeded<S: Into<String>>(seed: S) -> Self {
		Self { seed: Some(seed.into()), ..Self::new() }
	}

	pub fn max_retries(&self) -> usize {
		self.max_retries
	}

	/// Sets the number of attempts.
	///
	/// # Errors
	/// Returns an error if `max_retries` is 0.
	pub fn set_max_retries(&mut self, max_retries: usize) -> Result<()> {
		if max_retries == 0 {
			return Err(ChainError::invalid_input("max_retries must be > 0"));
		}
		self.max_retries = max_retries;
		Ok(())
	}

	/// Replaces the acceptance predicate.
	pub fn set_acceptance<F>(&mut self, acceptance: F)
	where
		F: Fn(&GeneratedSentence) -> bool + Send + Sync + 'static,
	{
		self.acceptance = Box::new(acceptance);
	}

	/// Accepts sentences of at least `min_words` words.
	pub fn set_min_words(&mut self, min_words: usize) {
		self.set_acceptance(move |sentence| sentence.word_count() >= min_words);
	}

	pub fn accepts(&self, sentence: &GeneratedSentence) -> bool {
		(self.acceptance)(sentence)
	}
}

impl Default for GenerateOptions {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for GenerateOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GenerateOptions")
			.field("seed", &self.seed)
			.field("time_limit", &self.time_limit)
			.field("max_retries", &self.max_retries)
			.finish_non_exhaustive()
	}
}
