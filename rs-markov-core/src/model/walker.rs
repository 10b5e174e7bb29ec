use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::warn;
use rand::Rng;

use super::chain::Corpus;
use super::node::ChainNode;
use super::reference::{Refs, merge_refs};
use super::transitions::Transitions;

/// Default wall-clock budget of one walk.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(6);

/// Side a walk moves toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
	/// Predecessors, toward the start of a sentence.
	Backward,
	/// Successors, toward the end of a sentence.
	Forward,
}

impl Direction {
	fn neighbors(self, node: &ChainNode) -> &Transitions {
		match self {
			Direction::Backward => node.previous_words(),
			Direction::Forward => node.next_words(),
		}
	}

	/// `text` grown by `word` on this direction's side.
	fn extend(self, text: &str, word: &str) -> String {
		match self {
			Direction::Backward => format!("{word} {text}"),
			Direction::Forward => format!("{text} {word}"),
		}
	}
}

/// Why a walk stopped. None of these is an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
	/// The last token began (backward) or ended (forward) an ingested sequence.
	Boundary,
	/// No neighbor, or the token is unknown to the chain.
	DeadEnd,
	/// Going on would repeat the text or loop on a short cycle.
	Repetition,
	/// Time ran out and a boundary word was forced in.
	Timeout,
}

/// Result of one walk.
#[derive(Clone, Debug)]
pub struct WalkOutcome {
	/// Visited tokens as text (leading token of each window), with a
	/// separator on the seed side.
	pub text: String,
	/// Visited tokens in sentence order, the seed excluded.
	pub visited: Vec<String>,
	/// References of every visited token.
	pub refs: Refs,
	pub termination: Termination,
}

/// Walks from `seed` in `direction` until a boundary, a repetition or the
/// time limit stops it.
pub fn walk(corpus: Corpus<'_>, seed: &str, direction: Direction, time_limit: Duration) -> WalkOutcome {
	walk_with_rng(corpus, seed, direction, time_limit, &mut rand::rng())
}

/// [`walk`] drawing from the given random source.
pub fn walk_with_rng<R: Rng>(
	corpus: Corpus<'_>,
	seed: &str,
	direction: Direction,
	time_limit: Duration,
	rng: &mut R,
) -> WalkOutcome {
	let started = Instant::now();
	let mut text = String::new();
	let mut visited: Vec<String> = Vec::new();
	let mut picked: HashSet<&str> = HashSet::new();
	let mut refs = Refs::new();
	let mut current = seed;

	let termination = loop {
		let Some(node) = corpus.word(current) else {
			break Termination::DeadEnd;
		};

		if started.elapsed() >= time_limit {
			if let Some(forced) = corpus.random_boundary_word(direction, rng) {
				warn!("Markov took too long ({:?}). Forcing: {:?}", text.trim(), forced);
				text = direction.extend(&text, corpus.lead(forced));
				visited.push(forced.to_owned());
				if let Some(forced_node) = corpus.word(forced) {
					merge_refs(&mut refs, forced_node.refs());
				}
			}
			break Termination::Timeout;
		}

		let Some(next) = direction.neighbors(node).pick(current, rng) else {
			break if corpus.is_boundary_word(current, direction) {
				Termination::Boundary
			} else {
				Termination::DeadEnd
			};
		};

		let grown = direction.extend(&text, corpus.lead(next));
		if is_repetition(&grown) {
			break Termination::Repetition;
		}
		if !picked.is_empty() && visited.len() > picked.len() * 2 {
			break Termination::Repetition;
		}

		text = grown;
		picked.insert(next);
		visited.push(next.to_owned());
		if let Some(next_node) = corpus.word(next) {
			merge_refs(&mut refs, next_node.refs());
		}
		current = next;
	};

	if direction == Direction::Backward {
		visited.reverse();
	}

	WalkOutcome { text, visited, refs, termination }
}

/// True when `text` is a repetition of one of its proper prefixes,
/// e.g. `" a b a b"`.
fn is_repetition(text: &str) -> bool {
	let Some(first) = text.chars().next() else {
		return false;
	};
	let doubled = format!("{text}{text}");
	let skip = first.len_utf8();
	doubled[skip..]
		.find(text)
		.is_some_and(|position| position + skip < text.len())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::chain::MarkovChain;
	use crate::model::reference::Metadata;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn chain_of(lines: &[&str]) -> MarkovChain {
		let mut chain = MarkovChain::default();
		for line in lines {
			chain.add_string(line, Metadata::new()).unwrap();
		}
		chain
	}

	#[test]
	fn test_is_repetition() {
		assert!(!is_repetition(""));
		assert!(!is_repetition(" a"));
		assert!(!is_repetition(" a b"));
		assert!(!is_repetition(" b a b"));
		assert!(is_repetition(" a a"));
		assert!(is_repetition(" b a b a"));
		assert!(is_repetition("é ü é ü "));
		assert!(!is_repetition("é ü "));
	}

	#[test]
	fn test_forward_walk_reaches_end() {
		let chain = chain_of(&["a b c d"]);
		let mut rng = StdRng::seed_from_u64(3);
		let outcome = walk_with_rng(chain.corpus(), "b", Direction::Forward, DEFAULT_TIME_LIMIT, &mut rng);

		assert_eq!(outcome.text, " c d");
		assert_eq!(outcome.visited, vec!["c", "d"]);
		assert_eq!(outcome.termination, Termination::Boundary);
		assert_eq!(outcome.refs.len(), 1);
	}

	#[test]
	fn test_backward_walk_is_in_sentence_order() {
		let chain = chain_of(&["a b c d"]);
		let mut rng = StdRng::seed_from_u64(3);
		let outcome = walk_with_rng(chain.corpus(), "c", Direction::Backward, DEFAULT_TIME_LIMIT, &mut rng);

		assert_eq!(outcome.text, "a b ");
		assert_eq!(outcome.visited, vec!["a", "b"]);
		assert_eq!(outcome.termination, Termination::Boundary);
	}

	#[test]
	fn test_unknown_seed_is_dead_end() {
		let chain = chain_of(&["a b"]);
		let outcome = walk(chain.corpus(), "zzz", Direction::Forward, DEFAULT_TIME_LIMIT);
		assert!(outcome.visited.is_empty());
		assert_eq!(outcome.termination, Termination::DeadEnd);
	}

	#[test]
	fn test_cycle_stops_on_repetition() {
		let chain = chain_of(&["a b a b a b"]);
		let outcome = walk(chain.corpus(), "a", Direction::Forward, DEFAULT_TIME_LIMIT);

		assert_eq!(outcome.termination, Termination::Repetition);
		assert_eq!(outcome.visited, vec!["b", "a", "b"]);
	}

	#[test]
	fn test_timeout_forces_boundary_word() {
		let chain = chain_of(&["a b c"]);
		let corpus = chain.corpus();

		let forward = walk(corpus, "b", Direction::Forward, Duration::ZERO);
		assert_eq!(forward.termination, Termination::Timeout);
		assert_eq!(forward.visited, vec!["c"]);
		assert_eq!(forward.text, " c");
		assert_eq!(forward.refs.len(), 1);

		let backward = walk(corpus, "b", Direction::Backward, Duration::ZERO);
		assert_eq!(backward.termination, Termination::Timeout);
		assert_eq!(backward.visited, vec!["a"]);
		assert_eq!(backward.text, "a ");
	}

	#[test]
	fn test_window_walk_keeps_full_tokens() {
		let mut chain = MarkovChain::new(crate::model::chain::ChainConfig::new(2).unwrap());
		chain.add_string("the quick brown fox", Metadata::new()).unwrap();
		let outcome = walk(chain.corpus(), "the quick", Direction::Forward, DEFAULT_TIME_LIMIT);

		assert_eq!(outcome.visited, vec!["quick brown", "brown fox"]);
		assert_eq!(outcome.text, " quick brown");
	}

	#[test]
	fn test_multi_word_tokens_stay_whole() {
		let mut chain = MarkovChain::default();
		chain.ingest(&["new york", "is", "big"], Metadata::new()).unwrap();

		let backward = walk(chain.corpus(), "is", Direction::Backward, DEFAULT_TIME_LIMIT);
		assert_eq!(backward.text, "new york ");
		assert_eq!(backward.termination, Termination::Boundary);
	}

	#[test]
	fn test_ratio_guard_counts_tokens_not_words() {
		let mut chain = MarkovChain::default();
		chain.ingest(&["a", "x y z w", "b", "v u t s", "c"], Metadata::new()).unwrap();

		let outcome = walk(chain.corpus(), "a", Direction::Forward, DEFAULT_TIME_LIMIT);
		assert_eq!(outcome.visited, vec!["x y z w", "b", "v u t s", "c"]);
		assert_eq!(outcome.termination, Termination::Boundary);
	}
}
