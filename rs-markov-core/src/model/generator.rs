use std::thread;
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::error::{ChainError, Result};

use super::chain::MarkovChain;
use super::options::GenerateOptions;
use super::reference::{Refs, merge_refs};
use super::walker::{self, Direction, WalkOutcome};

/// A sentence produced by [`MarkovChain::generate`].
#[derive(Serialize, Debug, Clone)]
pub struct GeneratedSentence {
	pub text: String,
	/// Visited tokens from start to end, before overlap resolution.
	pub tokens: Vec<String>,
	/// References of every token of the sentence, keyed by ingestion.
	pub refs: Refs,
	/// 1-based attempt that produced this sentence.
	pub attempts: usize,
}

impl GeneratedSentence {
	pub fn word_count(&self) -> usize {
		self.text.split_whitespace().count()
	}
}

impl MarkovChain {
	/// Generates a sentence by walking the chain both ways from a seed.
	///
	/// # Behavior
	/// - Resolves the seed: the first token of `options.seed` known to the
	///   chain, otherwise a random start word drawn anew on each attempt.
	/// - Runs the backward and forward walks concurrently on a read-only
	///   view of the chain and waits for both.
	/// - Resolves window overlap and returns the first sentence accepted by
	///   the options' predicate.
	///
	/// # Errors
	/// - `EmptyChain` if the chain has no start word.
	/// - `GenerationExhausted` once `max_retries` attempts were rejected.
	///   A walker that panics only fails its own attempt.
	pub fn generate(&self, options: &GenerateOptions) -> Result<GeneratedSentence> {
		if self.start_words().next().is_none() {
			return Err(ChainError::EmptyChain);
		}

		let resolved = options.seed.as_deref().and_then(|input| self.resolve_seed(input));
		debug!("Generating, input: {:?}, seed: {:?}", options.seed, resolved);

		let mut rng = rand::rng();
		for attempt in 1..=options.max_retries() {
			let seed = match resolved {
				Some(seed) => seed,
				None => self
					.corpus()
					.random_boundary_word(Direction::Backward, &mut rng)
					.ok_or(ChainError::EmptyChain)?,
			};

			let Some((backward, forward)) = self.walk_both_ways(seed, options.time_limit) else {
				warn!("Attempt {attempt}: a walker failed, retrying");
				continue;
			};

			let sentence = self.assemble(seed, backward, forward, attempt);
			if options.accepts(&sentence) {
				return Ok(sentence);
			}
			debug!("Attempt {attempt} rejected: {:?}", sentence.text);
		}

		Err(ChainError::GenerationExhausted { attempts: options.max_retries() })
	}

	/// First token of `input` (tokenized and windowed like ingested text)
	/// present in the chain.
	pub fn resolve_seed(&self, input: &str) -> Option<&str> {
		self.config()
			.tokens(input)
			.iter()
			.find_map(|token| self.key_of(token))
	}

	/// Runs both walks on their own threads over the same snapshot.
	/// Returns `None` if either walk panicked.
	fn walk_both_ways(&self, seed: &str, time_limit: Duration) -> Option<(WalkOutcome, WalkOutcome)> {
		let corpus = self.corpus();
		thread::scope(|scope| {
			let backward = scope.spawn(move || walker::walk(corpus, seed, Direction::Backward, time_limit));
			let forward = scope.spawn(move || walker::walk(corpus, seed, Direction::Forward, time_limit));
			match (backward.join(), forward.join()) {
				(Ok(backward), Ok(forward)) => Some((backward, forward)),
				_ => None,
			}
		})
	}

	fn assemble(&self, seed: &str, backward: WalkOutcome, forward: WalkOutcome, attempts: usize) -> GeneratedSentence {
		let mut tokens = backward.visited;
		tokens.push(seed.to_owned());
		tokens.extend(forward.visited);

		let mut refs = Refs::new();
		if let Some(node) = self.word(seed) {
			merge_refs(&mut refs, node.refs());
		}
		merge_refs(&mut refs, &backward.refs);
		merge_refs(&mut refs, &forward.refs);

		GeneratedSentence { text: self.resolve_overlap(&tokens), tokens, refs, attempts }
	}

	/// Flattens consecutive tokens back into text.
	///
	/// With a window size of 1 the tokens are joined whole. Otherwise each
	/// window but the last contributes its leading token and the last one
	/// is kept whole: `["the quick", "quick fox"]` gives `"the quick fox"`.
	pub fn resolve_overlap(&self, tokens: &[String]) -> String {
		let Some((last, init)) = tokens.split_last() else {
			return String::new();
		};
		let corpus = self.corpus();
		init.iter()
			.map(|token| corpus.lead(token))
			.chain(std::iter::once(last.as_str()))
			.collect::<Vec<_>>()
			.join(" ")
	}
}
