use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{Map, Value};

/// Identifier shared by every node touched by one ingestion.
pub type IngestionId = u64;

/// Caller-supplied metadata, stored and merged as-is.
pub type Metadata = Map<String, Value>;

/// References gathered from nodes, keyed by ingestion.
pub type Refs = BTreeMap<IngestionId, Arc<Reference>>;

static LAST_INGESTION_ID: AtomicU64 = AtomicU64::new(0);

/// Source record of one ingested sequence.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Reference {
	pub id: IngestionId,
	/// Milliseconds since the Unix epoch.
	pub timestamp: u64,
	pub metadata: Metadata,
}

impl Reference {
	/// Stamps `metadata` with a fresh ingestion id and the current time.
	pub fn new(metadata: Metadata) -> Self {
		let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
		Self {
			id: next_ingestion_id(now.as_micros() as u64),
			timestamp: now.as_millis() as u64,
			metadata,
		}
	}
}

/// Process-wide, strictly increasing ids: the current time in microseconds,
/// bumped past the previous id when two ingestions share a tick.
fn next_ingestion_id(now: u64) -> IngestionId {
	let previous = LAST_INGESTION_ID
		.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
		.unwrap_or_else(|last| last);
	now.max(previous + 1)
}

/// Copies every reference of `from` into `into`; on id collision, `from` wins.
pub fn merge_refs(into: &mut Refs, from: &Refs) {
	for (id, reference) in from {
		into.insert(*id, Arc::clone(reference));
	}
}
