use std::sync::Arc;

use super::reference::{Reference, Refs, merge_refs};
use super::transitions::Transitions;

/// One of the two reserved boundary nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Boundary {
	Start,
	End,
}

/// Key of a node in the chain: a boundary sentinel or a token.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChainKey {
	Boundary(Boundary),
	Word(String),
}

/// Per-token record of weighted neighbors and source references.
///
/// # Invariants
/// - `nw()` is the sum of `next_words()` counts, `pw()` the sum of
///   `previous_words()` counts
/// - Sentinel nodes never carry references
#[derive(Clone, Debug, Default)]
pub struct ChainNode {
	next_words: Transitions,
	previous_words: Transitions,
	refs: Refs,
	/// First tokenizer token of a multi-token window.
	head: Option<String>,
}

impl ChainNode {
	pub fn new() -> Self {
		Self::default()
	}

	/// Successors, in first-observed order.
	pub fn next_words(&self) -> &Transitions {
		&self.next_words
	}

	/// Predecessors, in first-observed order.
	pub fn previous_words(&self) -> &Transitions {
		&self.previous_words
	}

	/// Total successor occurrences.
	pub fn nw(&self) -> usize {
		self.next_words.total()
	}

	/// Total predecessor occurrences.
	pub fn pw(&self) -> usize {
		self.previous_words.total()
	}

	pub fn refs(&self) -> &Refs {
		&self.refs
	}

	/// Leading token of the window this node stands for, if it was built
	/// from text with a window size above 1.
	pub fn head(&self) -> Option<&str> {
		self.head.as_deref()
	}

	pub(crate) fn set_head(&mut self, head: &str) {
		if self.head.is_none() {
			self.head = Some(head.to_owned());
		}
	}

	pub(crate) fn add_next(&mut self, token: &str, count: usize) {
		self.next_words.add(token, count);
	}

	pub(crate) fn add_previous(&mut self, token: &str, count: usize) {
		self.previous_words.add(token, count);
	}

	pub(crate) fn add_ref(&mut self, reference: &Arc<Reference>) {
		self.refs.entry(reference.id).or_insert_with(|| Arc::clone(reference));
	}

	/// Sums neighbor counts and unions references of `other` into this node.
	pub(crate) fn merge(&mut self, other: &Self) {
		self.next_words.merge(&other.next_words);
		self.previous_words.merge(&other.previous_words);
		merge_refs(&mut self.refs, &other.refs);
		if let Some(head) = &other.head {
			self.set_head(head);
		}
	}
}
