use std::collections::HashMap;

use rand::Rng;

/// Weighted adjacency of one chain node in one direction.
///
/// Conceptually, these are the outgoing (or incoming) edges of a node in
/// a Markov chain, weighted by how many times each neighbor was observed.
///
/// ## Responsibilities:
/// - Accumulate occurrences during ingestion
/// - Pick a neighbor using roulette-wheel sampling
/// - Merge with the transitions of the same node from another chain
///
/// ## Invariants
/// - `total` equals the sum of all counts, maintained on every update
/// - Every count is strictly positive
/// - Neighbors keep their first-observed order
#[derive(Clone, Debug, Default)]
pub struct Transitions {
	/// Neighbors and their counts, in first-observed order.
	/// Example: [("quick", 42), ("lazy", 3)]
	entries: Vec<(String, usize)>,
	/// Position of each neighbor in `entries`.
	index: HashMap<String, usize>,
	total: usize,
}

impl Transitions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records `count` more occurrences of `token`.
	///
	/// - If the neighbor already exists, its count is increased.
	/// - Otherwise, it is appended with the given count.
	pub fn add(&mut self, token: &str, count: usize) {
		if count == 0 {
			return;
		}
		match self.index.get(token) {
			Some(&i) => self.entries[i].1 += count,
			None => {
				self.index.insert(token.to_owned(), self.entries.len());
				self.entries.push((token.to_owned(), count));
			}
		}
		self.total += count;
	}

	/// Sum of all counts.
	pub fn total(&self) -> usize {
		self.total
	}

	/// Count recorded for `token`, 0 if never observed.
	pub fn count(&self, token: &str) -> usize {
		self.index.get(token).map_or(0, |&i| self.entries[i].1)
	}

	pub fn contains(&self, token: &str) -> bool {
		self.index.contains_key(token)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Neighbors with their counts, in first-observed order.
	pub fn entries(&self) -> &[(String, usize)] {
		&self.entries
	}

	pub fn tokens(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(token, _)| token.as_str())
	}

	/// Picks a neighbor with probability proportional to its count.
	///
	/// A value `r` is drawn in `[0, total)` and an accumulator starting at
	/// `total` is decreased by each count in first-observed order; the first
	/// neighbor bringing the accumulator to `r` or below is picked.
	/// `current` is never picked as its own neighbor unless it is the only one.
	///
	/// Returns `None` if there is no neighbor (dead end).
	pub fn pick<R: Rng>(&self, current: &str, rng: &mut R) -> Option<&str> {
		if self.entries.is_empty() || self.total == 0 {
			return None;
		}
		if self.entries.len() == 1 {
			return Some(self.entries[0].0.as_str());
		}

		let r = rng.random_range(0..self.total);
		let mut accumulator = self.total;
		for (token, count) in &self.entries {
			accumulator -= count;
			if accumulator <= r && token != current {
				return Some(token.as_str());
			}
		}

		// The drawn bucket was `current` itself: first other neighbor
		self.tokens().find(|token| *token != current)
	}

	/// Adds every count of `other` into this one, preserving the order of
	/// already known neighbors and appending the new ones.
	pub fn merge(&mut self, other: &Self) {
		for (token, count) in &other.entries {
			self.add(token, *count);
		}
	}
}
