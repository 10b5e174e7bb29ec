//! End-to-end tests of chain building and sentence generation.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use rs_markov_core::model::{Boundary, ChainConfig, ChainKey, GenerateOptions, MarkovChain, Metadata};
use rs_markov_core::tokenizer::PatternTokenizer;
use rs_markov_core::{ChainError, Result};

fn chain_of(lines: &[&str]) -> MarkovChain {
	let mut chain = MarkovChain::default();
	for line in lines {
		chain.add_string(line, Metadata::new()).unwrap();
	}
	chain
}

#[test]
fn test_invariants_hold_after_random_ingestion() {
	let vocabulary = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
	let mut rng = StdRng::seed_from_u64(2024);
	let mut chain = MarkovChain::default();
	let mut firsts = HashSet::new();
	let mut lasts = HashSet::new();

	for _ in 0..200 {
		let len = rng.random_range(1..8);
		let sentence: Vec<&str> = (0..len).map(|_| vocabulary[rng.random_range(0..vocabulary.len())]).collect();
		firsts.insert(sentence[0]);
		lasts.insert(sentence[len - 1]);
		chain.ingest(&sentence, Metadata::new()).unwrap();
	}

	for (token, node) in chain.nodes() {
		let next_sum: usize = node.next_words().entries().iter().map(|(_, c)| c).sum();
		let previous_sum: usize = node.previous_words().entries().iter().map(|(_, c)| c).sum();
		assert_eq!(node.nw(), next_sum, "nw of {token}");
		assert_eq!(node.pw(), previous_sum, "pw of {token}");
		for neighbor in node.next_words().tokens().chain(node.previous_words().tokens()) {
			assert!(chain.contains(neighbor), "dangling {neighbor}");
		}
	}

	assert_eq!(chain.start_words().collect::<HashSet<_>>(), firsts);
	assert_eq!(chain.end_words().collect::<HashSet<_>>(), lasts);
	let start = chain.node(&ChainKey::Boundary(Boundary::Start)).unwrap();
	assert_eq!(start.nw(), firsts.len());
}

#[test]
fn test_generate_on_empty_chain() {
	let chain = MarkovChain::default();
	assert!(matches!(chain.generate(&GenerateOptions::new()), Err(ChainError::EmptyChain)));
}

#[test]
fn test_generate_whole_sentence_from_seed() -> Result<()> {
	let chain = chain_of(&["the cat sat on a mat"]);
	let sentence = chain.generate(&GenerateOptions::seeded("cat"))?;

	assert_eq!(sentence.text, "the cat sat on a mat");
	assert_eq!(sentence.tokens.len(), 6);
	assert_eq!(sentence.refs.len(), 1);
	assert_eq!(sentence.attempts, 1);
	Ok(())
}

#[test]
fn test_unknown_seed_falls_back_to_start_words() -> Result<()> {
	let chain = chain_of(&["hello world"]);
	let sentence = chain.generate(&GenerateOptions::seeded("nothing known here"))?;
	assert_eq!(sentence.text, "hello world");
	Ok(())
}

#[test]
fn test_seed_resolves_first_known_token() {
	let chain = chain_of(&["hello world"]);
	assert_eq!(chain.resolve_seed("oh world hello"), Some("world"));
	assert_eq!(chain.resolve_seed("nope"), None);
}

#[test]
fn test_window_overlap_is_resolved() -> Result<()> {
	let mut chain = MarkovChain::new(ChainConfig::new(2)?);
	chain.add_string("the quick fox", Metadata::new())?;
	assert_eq!(chain.word("the quick").unwrap().next_words().count("quick fox"), 1);

	let sentence = chain.generate(&GenerateOptions::seeded("the quick"))?;
	assert_eq!(sentence.tokens, vec!["the quick", "quick fox"]);
	assert_eq!(sentence.text, "the quick fox");
	Ok(())
}

#[test]
fn test_multi_word_tokens_are_kept_whole() -> Result<()> {
	let mut chain = MarkovChain::default();
	chain.ingest(&["new york", "is", "big"], Metadata::new())?;

	let sentence = chain.generate(&GenerateOptions::seeded("is"))?;
	assert_eq!(sentence.tokens, vec!["new york", "is", "big"]);
	assert_eq!(sentence.text, "new york is big");
	Ok(())
}

#[test]
fn test_spoiler_tokens_survive_generation() -> Result<()> {
	for window_size in [1, 2] {
		let config = ChainConfig::new(window_size)?.with_tokenizer(PatternTokenizer::new()?);
		let mut chain = MarkovChain::new(config);
		chain.add_string("the || secret plot || ends here", Metadata::new())?;

		let sentence = chain.generate(&GenerateOptions::new())?;
		assert_eq!(sentence.text, "the || secret plot || ends here", "window size {window_size}");
	}
	Ok(())
}

#[test]
fn test_successor_choice_follows_weights() -> Result<()> {
	let mut chain = MarkovChain::default();
	for _ in 0..9 {
		chain.add_string("a b", Metadata::new())?;
	}
	chain.add_string("a c", Metadata::new())?;

	let options = GenerateOptions::seeded("a");
	let mut b = 0;
	let mut c = 0;
	for _ in 0..1000 {
		match chain.generate(&options)?.text.as_str() {
			"a b" => b += 1,
			"a c" => c += 1,
			other => panic!("unexpected sentence {other:?}"),
		}
	}
	assert_eq!(b + c, 1000);
	assert!((820..=980).contains(&b), "b chosen {b} times");
	Ok(())
}

#[test]
fn test_rejected_sentences_exhaust_retries() {
	let chain = chain_of(&["a b"]);
	let calls = Arc::new(AtomicUsize::new(0));

	let mut options = GenerateOptions::new();
	options.set_max_retries(7).unwrap();
	let counter = Arc::clone(&calls);
	options.set_acceptance(move |sentence| {
		counter.fetch_add(1, Ordering::SeqCst);
		sentence.word_count() >= 5
	});

	match chain.generate(&options) {
		Err(ChainError::GenerationExhausted { attempts }) => assert_eq!(attempts, 7),
		other => panic!("expected exhaustion, got {other:?}"),
	}
	assert_eq!(calls.load(Ordering::SeqCst), 7);
}

#[test]
fn test_timeout_forces_boundaries() -> Result<()> {
	let chain = chain_of(&["a b c"]);
	let mut options = GenerateOptions::seeded("b");
	options.time_limit = Duration::ZERO;

	let sentence = chain.generate(&options)?;
	assert_eq!(sentence.text, "a b c");
	Ok(())
}

#[test]
fn test_dense_cycles_terminate() {
	let vocabulary = ["a", "b", "c", "d"];
	let mut chain = MarkovChain::default();
	for x in vocabulary {
		for y in vocabulary {
			chain.ingest(&[x, y, x, y], Metadata::new()).unwrap();
		}
	}

	let mut options = GenerateOptions::new();
	options.time_limit = Duration::from_millis(100);
	options.set_max_retries(5).unwrap();

	let started = Instant::now();
	for _ in 0..20 {
		match chain.generate(&options) {
			Ok(sentence) => assert!(sentence.word_count() >= 2),
			Err(ChainError::GenerationExhausted { attempts }) => assert_eq!(attempts, 5),
			Err(e) => panic!("unexpected error {e}"),
		}
	}
	assert!(started.elapsed() < Duration::from_secs(30));
}

#[test]
fn test_refs_cover_the_sentence() -> Result<()> {
	let mut chain = MarkovChain::default();
	let mut first = Metadata::new();
	first.insert("author".into(), Value::from("ann"));
	let mut second = Metadata::new();
	second.insert("author".into(), Value::from("bob"));

	let ann = chain.add_string("red fish", first)?;
	let bob = chain.add_string("fish swims", second)?;

	let sentence = chain.generate(&GenerateOptions::seeded("red"))?;
	assert_eq!(sentence.text, "red fish swims");
	assert_eq!(sentence.refs.keys().copied().collect::<Vec<_>>(), vec![ann, bob]);
	assert_eq!(sentence.refs[&bob].metadata["author"], "bob");
	Ok(())
}

#[test]
fn test_pattern_tokenizer_chain() -> Result<()> {
	let config = ChainConfig::new(1)?.with_tokenizer(PatternTokenizer::new()?);
	let mut chain = MarkovChain::new(config);
	chain.add_string("Hello, world! How are you?", Metadata::new())?;

	assert_eq!(chain.start_words().collect::<Vec<_>>(), vec!["Hello"]);
	assert_eq!(chain.end_words().collect::<Vec<_>>(), vec!["you?"]);
	assert!(chain.contains("world!"));
	Ok(())
}

#[test]
fn test_from_folder_loads_every_corpus() -> Result<()> {
	let dir = tempfile::tempdir()?;
	fs::write(dir.path().join("poems.txt"), "the cat sat\n\nthe dog ran\n")?;
	fs::write(dir.path().join("songs.txt"), "la la land\n")?;
	fs::write(dir.path().join("readme.md"), "ignored words\n")?;

	let chain = MarkovChain::from_folder(dir.path(), ChainConfig::default())?;
	assert_eq!(chain.corpus_names(), &["poems".to_string(), "songs".to_string()]);
	assert!(chain.contains("dog"));
	assert!(!chain.contains("ignored"));

	let cat = chain.word("cat").unwrap();
	let reference = cat.refs().values().next().unwrap();
	assert_eq!(reference.metadata["source"], "poems");
	assert_eq!(reference.metadata["line"], 1);
	let dog = chain.word("dog").unwrap();
	assert_eq!(dog.refs().values().next().unwrap().metadata["line"], 3);

	let stats = chain.stats();
	assert_eq!(stats.references, 3);
	assert_eq!(stats.start_words, 2);
	Ok(())
}

#[test]
fn test_from_folder_rejects_files() {
	let dir = tempfile::tempdir().unwrap();
	let file = dir.path().join("corpus.txt");
	fs::write(&file, "a b").unwrap();
	assert!(matches!(MarkovChain::from_folder(&file, ChainConfig::default()), Err(ChainError::InvalidInput(_))));
}
