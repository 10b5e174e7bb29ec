//! Tokenizers feeding the chain builder and the seed resolution.
//!
//! The chain only ever sees an ordered list of token strings. A tokenizer
//! that cannot make sense of its input returns an empty list, which the
//! chain treats as "nothing to ingest" or "no seed".

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use regex::Regex;

use crate::error::{ChainError, Result};

/// Converts raw text into an ordered sequence of tokens.
pub trait Tokenizer: Send + Sync + Debug {
	/// Splits `text` into tokens. Never fails: unusable input yields an empty vector.
	fn tokenize(&self, text: &str) -> Vec<String>;

	/// Short identifier, used in logs.
	fn name(&self) -> &'static str;
}

/// Splits on whitespace, keeping punctuation attached to its word.
#[derive(Clone, Debug, Default)]
pub struct WhitespaceTokenizer;

impl WhitespaceTokenizer {
	pub fn new() -> Self {
		WhitespaceTokenizer
	}
}

impl Tokenizer for WhitespaceTokenizer {
	fn tokenize(&self, text: &str) -> Vec<String> {
		text.split_whitespace().map(str::to_owned).collect()
	}

	fn name(&self) -> &'static str {
		"whitespace"
	}
}

/// Kind of a token matched by the chat pattern, named after its capture group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
	EmojiId,
	UserId,
	ChannelId,
	Url,
	Number,
	Word,
	Apostrophe,
	Spoiler,
}

impl TokenKind {
	/// Every kind, in pattern order.
	pub const ALL: [TokenKind; 8] = [
		TokenKind::EmojiId,
		TokenKind::UserId,
		TokenKind::ChannelId,
		TokenKind::Url,
		TokenKind::Number,
		TokenKind::Word,
		TokenKind::Apostrophe,
		TokenKind::Spoiler,
	];

	/// Capture group name in the pattern.
	pub fn group_name(self) -> &'static str {
		match self {
			TokenKind::EmojiId => "emojiID",
			TokenKind::UserId => "userID",
			TokenKind::ChannelId => "channelID",
			TokenKind::Url => "url",
			TokenKind::Number => "number",
			TokenKind::Word => "word",
			TokenKind::Apostrophe => "apostrophe",
			TokenKind::Spoiler => "spoiler",
		}
	}
}

/// One match of a [`PatternTokenizer`] with the group that produced it.
/// `kind` is `None` for patterns without the known group names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMatch {
	pub text: String,
	pub kind: Option<TokenKind>,
}

/// Chat-aware pattern. Alternatives are tried left to right at each position.
const CHAT_PATTERN: &str = concat!(
	// custom emoji <:name:id>
	r"(?P<emojiID><a?:[a-zA-Z0-9_]{2,}:[0-9]{17,20}>)",
	// user mention <@id>
	r"|(?P<userID><@!?[0-9]{17,20}>)",
	// channel mention <#id>
	r"|(?P<channelID><#[0-9]{17,20}>)",
	// url, scheme optional
	r"|(?P<url>(?:https?://)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b[-a-zA-Z0-9()@:%_+.~#?&/=]*)",
	// number, with optional decimal or thousands separator
	r"|(?P<number>\d+(?:[.,]\d+)?)",
	// word with trailing sentence punctuation
	r#"|(?P<word>[^,./#!?$%^&*;:{}=\-_`~()\[\]\s|"'\d]+[.!?]*)"#,
	// apostrophe suffix, only valid right after a letter
	r"|(?P<apostrophe>'[a-zA-Z]+)",
	// spoiler
	r"|(?P<spoiler>\|\|[^|]*\|\|)",
);

/// Regex-driven tokenizer recognizing mentions, emoji tags, URLs, numbers,
/// words, apostrophe suffixes and spoilers.
#[derive(Clone, Debug)]
pub struct PatternTokenizer {
	pattern: Arc<Regex>,
}

impl PatternTokenizer {
	/// Creates a tokenizer with the built-in chat pattern.
	pub fn new() -> Result<Self> {
		Self::with_pattern(CHAT_PATTERN)
	}

	/// Creates a tokenizer extracting every match of `pattern`.
	pub fn with_pattern(pattern: &str) -> Result<Self> {
		let regex = Regex::new(pattern)
			.map_err(|e| ChainError::Pattern(format!("Invalid regex pattern: {e}")))?;

		Ok(PatternTokenizer { pattern: Arc::new(regex) })
	}

	/// Get the regex pattern used by this tokenizer.
	pub fn pattern(&self) -> &str {
		self.pattern.as_str()
	}

	/// Every match of the pattern, classified by capture group.
	///
	/// An apostrophe suffix not preceded by an ASCII letter is skipped and
	/// matching resumes on the next character, so `'word'` yields `word`.
	pub fn tokenize_groups(&self, text: &str) -> Vec<TokenMatch> {
		let mut matches = Vec::new();
		let mut position = 0;

		while let Some(captures) = self.pattern.captures_at(text, position) {
			let Some(whole) = captures.get(0) else {
				break;
			};
			let kind = TokenKind::ALL
				.into_iter()
				.find(|kind| captures.name(kind.group_name()).is_some());

			let after_letter = text[..whole.start()]
				.chars()
				.next_back()
				.is_some_and(|c| c.is_ascii_alphabetic());
			if kind == Some(TokenKind::Apostrophe) && !after_letter {
				position = whole.start() + 1;
				continue;
			}

			matches.push(TokenMatch { text: whole.as_str().to_owned(), kind });
			position = if whole.is_empty() {
				next_char_boundary(text, whole.end())
			} else {
				whole.end()
			};
			if position > text.len() {
				break;
			}
		}

		matches
	}
}

impl Tokenizer for PatternTokenizer {
	fn tokenize(&self, text: &str) -> Vec<String> {
		self.tokenize_groups(text)
			.into_iter()
			.map(|m| m.text)
			.collect()
	}

	fn name(&self) -> &'static str {
		"pattern"
	}
}

/// Buckets classified tokens by kind, keeping their order of appearance.
/// Matches without a kind are left out.
pub fn group_tokens(matches: &[TokenMatch]) -> BTreeMap<TokenKind, Vec<String>> {
	let mut groups: BTreeMap<TokenKind, Vec<String>> = BTreeMap::new();
	for token in matches {
		if let Some(kind) = token.kind {
			groups.entry(kind).or_default().push(token.text.clone());
		}
	}
	groups
}

fn next_char_boundary(text: &str, index: usize) -> usize {
	text[index..].chars().next().map_or(index + 1, |c| index + c.len_utf8())
}

/// Merges tokens into overlapping windows of `window_size` tokens.
///
/// `["a", "b", "c"]` with a size of 2 gives `["a b", "b c"]`.
/// A size of 0 or 1 returns the tokens unchanged; a sequence shorter
/// than the window yields nothing.
pub fn to_windows(tokens: &[String], window_size: usize) -> Vec<String> {
	if window_size <= 1 {
		return tokens.to_vec();
	}
	tokens.windows(window_size).map(|w| w.join(" ")).collect()
}
