use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, mpsc};
use std::thread;

use log::{debug, info, warn};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ChainError, Result};
use crate::io::{get_filename, list_files, normalize_folder, read_file};
use crate::tokenizer::{Tokenizer, WhitespaceTokenizer, to_windows};

use super::node::{Boundary, ChainKey, ChainNode};
use super::reference::{IngestionId, Metadata, Reference};
use super::walker::Direction;

/// How raw text becomes chain tokens.
#[derive(Clone, Debug)]
pub struct ChainConfig {
	/// Number of consecutive words merged into one token (>= 1).
	window_size: usize,
	tokenizer: Arc<dyn Tokenizer>,
}

impl ChainConfig {
	/// Creates a configuration with the whitespace tokenizer.
	///
	/// # Errors
	/// Returns an error if `window_size` is 0.
	pub fn new(window_size: usize) -> Result<Self> {
		if window_size == 0 {
			return Err(ChainError::invalid_input("window size must be >= 1"));
		}
		Ok(Self { window_size, tokenizer: Arc::new(WhitespaceTokenizer::new()) })
	}

	/// Replaces the tokenizer used by `add_string` and seed resolution.
	pub fn with_tokenizer<T: Tokenizer + 'static>(mut self, tokenizer: T) -> Self {
		self.tokenizer = Arc::new(tokenizer);
		self
	}

	pub fn window_size(&self) -> usize {
		self.window_size
	}

	pub fn tokenizer(&self) -> &dyn Tokenizer {
		self.tokenizer.as_ref()
	}

	/// Tokenizes `text` and merges the tokens into windows.
	pub fn tokens(&self, text: &str) -> Vec<String> {
		to_windows(&self.tokenizer.tokenize(text), self.window_size)
	}
}

impl Default for ChainConfig {
	fn default() -> Self {
		Self { window_size: 1, tokenizer: Arc::new(WhitespaceTokenizer::new()) }
	}
}

/// Summary counters of a chain.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainStats {
	pub words: usize,
	pub start_words: usize,
	pub end_words: usize,
	/// Sum of successor counts over all tokens.
	pub transitions: usize,
	/// Distinct ingestions referenced by the tokens.
	pub references: usize,
}

/// Weighted token adjacency graph with its two boundary sentinels.
///
/// This struct manages:
/// - `words`: one `ChainNode` per token, created on first occurrence
/// - `start` / `end`: sentinel nodes; `start.next_words` is the start-word
///   index and `end.previous_words` the end-word index
/// - `corpus_names`: names of the files the chain was loaded from
///
/// # Invariants
/// - Every token referenced by a node's neighbors is itself a node
/// - A token is a start (end) word iff it was first (last) in some ingestion,
///   and its sentinel count is then exactly 1
#[derive(Clone, Debug, Default)]
pub struct MarkovChain {
	config: ChainConfig,
	start: ChainNode,
	end: ChainNode,
	words: HashMap<String, ChainNode>,
	corpus_names: Vec<String>,
}

impl MarkovChain {
	/// Creates an empty chain holding only the two sentinels.
	pub fn new(config: ChainConfig) -> Self {
		Self {
			config,
			start: ChainNode::new(),
			end: ChainNode::new(),
			words: HashMap::new(),
			corpus_names: Vec::new(),
		}
	}

	pub fn config(&self) -> &ChainConfig {
		&self.config
	}

	/// Adds one ordered token sequence to the chain.
	///
	/// Every token of the call shares one fresh ingestion id, and `metadata`
	/// is recorded under that id on each touched node.
	///
	/// # Errors
	/// Returns `InvalidInput` if the sequence is empty or holds a blank token.
	/// The chain is not modified in that case.
	pub fn ingest<S: AsRef<str>>(&mut self, tokens: &[S], metadata: Metadata) -> Result<IngestionId> {
		if tokens.is_empty() {
			warn!("Cannot index an empty sequence");
			return Err(ChainError::invalid_input("empty token sequence"));
		}
		if let Some(position) = tokens.iter().position(|t| t.as_ref().trim().is_empty()) {
			warn!("Cannot index blank token at position {position}");
			return Err(ChainError::invalid_input(format!("blank token at position {position}")));
		}

		let reference = Arc::new(Reference::new(metadata));
		let last = tokens.len() - 1;

		for (i, token) in tokens.iter().map(AsRef::as_ref).enumerate() {
			let node = self.words.entry(token.to_owned()).or_default();
			node.add_ref(&reference);

			if i > 0 {
				node.add_previous(tokens[i - 1].as_ref(), 1);
			}
			if i < last {
				node.add_next(tokens[i + 1].as_ref(), 1);
			}

			if i == 0 && !self.start.next_words().contains(token) {
				self.start.add_next(token, 1);
			}
			if i == last && !self.end.previous_words().contains(token) {
				self.end.add_previous(token, 1);
			}
		}

		Ok(reference.id)
	}

	/// Tokenizes `text` with the configured tokenizer and window size,
	/// then ingests the result.
	///
	/// # Errors
	/// Returns `InvalidInput` when the text yields no token.
	pub fn add_string(&mut self, text: &str, metadata: Metadata) -> Result<IngestionId> {
		let parts = self.config.tokenizer.tokenize(text);
		let tokens = to_windows(&parts, self.config.window_size);
		if tokens.is_empty() {
			warn!("Nothing to index in {:?} ({} tokenizer)", text, self.config.tokenizer.name());
			return Err(ChainError::invalid_input("text yields no token"));
		}

		let id = self.ingest(&tokens, metadata)?;
		// Window i starts with tokenizer token i
		if self.config.window_size > 1 {
			for (window, head) in tokens.iter().zip(&parts) {
				if let Some(node) = self.words.get_mut(window) {
					node.set_head(head);
				}
			}
		}
		Ok(id)
	}

	/// Adds every text of `texts`, skipping (and logging) the ones rejected.
	///
	/// Returns the number of texts ingested.
	pub fn add_strings<I, S>(&mut self, texts: I, metadata: &Metadata) -> usize
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		texts
			.into_iter()
			.filter(|text| self.add_string(text.as_ref(), metadata.clone()).is_ok())
			.count()
	}

	/// Builds a chain from lines in parallel.
	///
	/// # Behavior
	/// - Splits the lines into chunks (based on CPU cores * factor).
	/// - Spawns threads to build a partial chain for each chunk.
	/// - Merges all partial chains as they arrive.
	///
	/// Each line is one sequence; its metadata is `metadata` plus its
	/// 1-based `"line"` number. Blank lines are skipped.
	pub fn from_lines(lines: Vec<String>, config: ChainConfig, metadata: &Metadata) -> Result<Self> {
		let mut final_chain = MarkovChain::new(config.clone());
		if lines.is_empty() {
			return Ok(final_chain);
		}

		let numbered: Vec<(usize, String)> = lines
			.into_iter()
			.enumerate()
			.filter(|(_, line)| !line.trim().is_empty())
			.map(|(i, line)| (i + 1, line))
			.collect();

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = numbered.len().div_ceil(chunks).max(1);

		let (tx, rx) = mpsc::channel();
		for chunk in numbered.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk = chunk.to_vec();
			let config = config.clone();
			let metadata = metadata.clone();

			thread::spawn(move || {
				let mut partial_chain = MarkovChain::new(config);
				let mut skipped = 0;
				for (number, line) in chunk {
					let mut line_metadata = metadata.clone();
					line_metadata.insert("line".to_owned(), Value::from(number));
					if partial_chain.add_string(&line, line_metadata).is_err() {
						skipped += 1;
					}
				}
				if skipped > 0 {
					debug!("Skipped {skipped} lines yielding no token");
				}
				if tx.send(partial_chain).is_err() {
					warn!("Partial chain dropped, receiver is gone");
				}
			});
		}
		drop(tx);

		for partial_chain in rx.iter() {
			final_chain.merge(&partial_chain)?;
		}

		Ok(final_chain)
	}

	/// Builds a chain from a text file, one sequence per line.
	///
	/// Lines carry `{"source": <file stem>, "line": <n>}` as metadata.
	pub fn from_file<P: AsRef<Path>>(filepath: P, config: ChainConfig) -> Result<Self> {
		let name = get_filename(&filepath)?;
		let lines = read_file(&filepath)?;

		let mut metadata = Metadata::new();
		metadata.insert("source".to_owned(), Value::from(name.clone()));

		let mut chain = Self::from_lines(lines, config, &metadata)?;
		chain.corpus_names.push(name);
		Ok(chain)
	}

	/// Builds a chain from the named corpora (`<folder>/<name>.txt`).
	pub fn from_corpora<P, S>(folder: P, names: &[S], config: ChainConfig) -> Result<Self>
	where
		P: AsRef<Path>,
		S: AsRef<str>,
	{
		let folder = folder.as_ref();
		let mut chain = MarkovChain::new(config.clone());
		for name in names {
			let path = folder.join(format!("{}.txt", name.as_ref()));
			let partial_chain = Self::from_file(&path, config.clone())?;
			chain.merge(&partial_chain)?;
		}
		info!("Loaded {} corpora, {} tokens", chain.corpus_names.len(), chain.len());
		Ok(chain)
	}

	/// Builds a chain from every `.txt` file of a directory.
	///
	/// # Errors
	/// - Returns an error if the path is not a directory.
	/// - Returns an error if a file fails to load.
	///
	/// # Notes
	/// - Both `"folder"` and `"folder/"` are accepted, `"."` is the working directory.
	/// - Subdirectories are ignored.
	pub fn from_folder<P: AsRef<Path>>(folder: P, config: ChainConfig) -> Result<Self> {
		let folder = normalize_folder(&folder.as_ref().to_string_lossy());
		if !folder.is_dir() {
			return Err(ChainError::invalid_input(format!("Expected a directory, got: {}", folder.display())));
		}

		let names: Vec<String> = list_files(&folder, "txt")?
			.iter()
			.map(get_filename)
			.collect::<std::io::Result<_>>()?;
		if names.is_empty() {
			warn!("No corpus found in {}", folder.display());
		}
		Self::from_corpora(&folder, &names, config)
	}

	/// Merges another chain into this one.
	///
	/// Neighbor counts are summed and references unioned. A sentinel count is
	/// only taken for tokens new to this chain's boundary indices, so merging
	/// partial chains gives the same counts as ingesting sequentially.
	///
	/// # Errors
	/// Returns an error if the window sizes differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.config.window_size != other.config.window_size {
			return Err(ChainError::invalid_input(format!(
				"Window size mismatch: self={}, other={}",
				self.config.window_size, other.config.window_size
			)));
		}

		for (token, node) in &other.words {
			self.words.entry(token.clone()).or_default().merge(node);
		}
		for (token, count) in other.start.next_words().entries() {
			if !self.start.next_words().contains(token) {
				self.start.add_next(token, *count);
			}
		}
		for (token, count) in other.end.previous_words().entries() {
			if !self.end.previous_words().contains(token) {
				self.end.add_previous(token, *count);
			}
		}
		for name in &other.corpus_names {
			if !self.corpus_names.contains(name) {
				self.corpus_names.push(name.clone());
			}
		}

		Ok(())
	}

	/// Node for `key`, sentinels included.
	pub fn node(&self, key: &ChainKey) -> Option<&ChainNode> {
		match key {
			ChainKey::Boundary(Boundary::Start) => Some(&self.start),
			ChainKey::Boundary(Boundary::End) => Some(&self.end),
			ChainKey::Word(token) => self.words.get(token),
		}
	}

	/// Node of an ordinary token.
	pub fn word(&self, token: &str) -> Option<&ChainNode> {
		self.words.get(token)
	}

	/// The chain's own copy of `token`, if known.
	pub(crate) fn key_of(&self, token: &str) -> Option<&str> {
		self.words.get_key_value(token).map(|(key, _)| key.as_str())
	}

	pub fn contains(&self, token: &str) -> bool {
		self.words.contains_key(token)
	}

	/// Every ordinary token with its node, in no particular order.
	pub fn nodes(&self) -> impl Iterator<Item = (&str, &ChainNode)> {
		self.words.iter().map(|(token, node)| (token.as_str(), node))
	}

	/// Tokens that began at least one ingested sequence, first seen first.
	pub fn start_words(&self) -> impl Iterator<Item = &str> {
		self.start.next_words().tokens()
	}

	/// Tokens that ended at least one ingested sequence, first seen first.
	pub fn end_words(&self) -> impl Iterator<Item = &str> {
		self.end.previous_words().tokens()
	}

	/// Number of tokens, sentinels excluded.
	pub fn len(&self) -> usize {
		self.words.len()
	}

	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}

	/// Names of the corpora the chain was loaded from.
	pub fn corpus_names(&self) -> &[String] {
		&self.corpus_names
	}

	pub fn stats(&self) -> ChainStats {
		let references: HashSet<IngestionId> =
			self.words.values().flat_map(|node| node.refs().keys().copied()).collect();

		ChainStats {
			words: self.words.len(),
			start_words: self.start.next_words().len(),
			end_words: self.end.previous_words().len(),
			transitions: self.words.values().map(ChainNode::nw).sum(),
			references: references.len(),
		}
	}

	/// Read-only view handed to the walkers.
	pub fn corpus(&self) -> Corpus<'_> {
		Corpus { chain: self }
	}
}

/// Immutable snapshot of a chain shared by concurrent walks.
///
/// It only exposes reads, and the borrow it holds keeps the chain from
/// being modified while any walk is running.
#[derive(Clone, Copy, Debug)]
pub struct Corpus<'a> {
	chain: &'a MarkovChain,
}

impl<'a> Corpus<'a> {
	pub fn word(&self, token: &str) -> Option<&'a ChainNode> {
		self.chain.words.get(token)
	}

	/// Boundary index a walk in `direction` heads to: start words when
	/// walking backward, end words when walking forward.
	pub fn boundary_words(&self, direction: Direction) -> &'a [(String, usize)] {
		match direction {
			Direction::Backward => self.chain.start.next_words().entries(),
			Direction::Forward => self.chain.end.previous_words().entries(),
		}
	}

	pub fn is_boundary_word(&self, token: &str, direction: Direction) -> bool {
		match direction {
			Direction::Backward => self.chain.start.next_words().contains(token),
			Direction::Forward => self.chain.end.previous_words().contains(token),
		}
	}

	/// Text `token` contributes when another window follows it: the whole
	/// token with a window size of 1, otherwise the leading token of its
	/// window.
	pub fn lead<'t>(&self, token: &'t str) -> &'t str
	where
		'a: 't,
	{
		if self.chain.config.window_size <= 1 {
			return token;
		}
		match self.word(token).and_then(ChainNode::head) {
			Some(head) => head,
			None => leading_word(token),
		}
	}

	/// Uniformly random token of the boundary index toward `direction`.
	pub fn random_boundary_word<R: Rng>(&self, direction: Direction, rng: &mut R) -> Option<&'a str> {
		self.boundary_words(direction).choose(rng).map(|(token, _)| token.as_str())
	}
}

/// First word of a window ingested as an already joined string.
fn leading_word(token: &str) -> &str {
	token.split_whitespace().next().unwrap_or(token)
}
