//! Persistent perceptual-hash cache.
//!
//! Stored as `phashes.json` at the template root: `{ set: { card: hex } }`.
//! The file is derived data. A missing or malformed file reads as empty and a
//! failed write is only logged; both just cost a recompute on the next load.
//! Entries are trusted as-is: there is no check against the source image.
//! Entries for cards that are no longer in the corpus are dropped on load.

use std::{
	collections::BTreeMap,
	fs::File,
	io::{BufReader, BufWriter, Write},
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{CardId, PerceptualHash};

pub const FILE_NAME: &str = "phashes.json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashCache {
	entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl HashCache {
	pub fn path(root: &Path) -> PathBuf {
		root.join(FILE_NAME)
	}

	/// Read the cache next to `root`, falling back to an empty cache.
	pub fn load_or_default(root: &Path) -> Self {
		let path = Self::path(root);
		if !path.exists() {
			return Self::default();
		}
		match Self::load(&path) {
			Ok(cache) => cache,
			Err(err) => {
				tracing::warn!(error = %format!("{err:#}"), "ignoring unreadable hash cache");
				Self::default()
			}
		}
	}

	fn load(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("Open hash cache {}", path.display()))?;
		let reader = BufReader::new(file);
		let entries = serde_json::from_reader(reader).with_context(|| format!("Parse hash cache {}", path.display()))?;
		Ok(Self { entries })
	}

	/// Write the whole cache, replacing the previous file.
	pub fn save(&self, root: &Path) -> Result<()> {
		let path = Self::path(root);
		let tmp = path.with_extension("json.tmp");
		let file = File::create(&tmp).with_context(|| format!("Write hash cache temp {}", tmp.display()))?;
		let mut writer = BufWriter::new(file);
		serde_json::to_writer_pretty(&mut writer, &self.entries).context("Serialize hash cache")?;
		writer.flush().context("Flush hash cache")?;
		drop(writer);

		// Replace existing file (Windows-friendly).
		if std::fs::rename(&tmp, &path).is_err() {
			let _ = std::fs::remove_file(&path);
			std::fs::rename(&tmp, &path).with_context(|| format!("Persist hash cache {}", path.display()))?;
		}
		Ok(())
	}

	/// A cached hash, if present and well-formed.
	pub fn get(&self, id: &CardId) -> Option<PerceptualHash> {
		let hex = self.entries.get(&id.set_id)?.get(&id.card_code)?;
		match hex.parse() {
			Ok(hash) => Some(hash),
			Err(_) => {
				tracing::warn!(set = %id.set_id, card = %id.card_code, %hex, "malformed cached hash; recomputing");
				None
			}
		}
	}

	pub fn insert(&mut self, id: &CardId, hash: PerceptualHash) {
		self.entries
			.entry(id.set_id.clone())
			.or_default()
			.insert(id.card_code.clone(), hash.to_string());
	}

	/// Keep only the entries `keep` accepts. Returns how many were removed.
	pub fn retain(&mut self, mut keep: impl FnMut(&CardId) -> bool) -> usize {
		let before = self.len();
		for (set_id, cards) in self.entries.iter_mut() {
			cards.retain(|card_code, _| keep(&CardId::new(set_id.as_str(), card_code.as_str())));
		}
		self.entries.retain(|_, cards| !cards.is_empty());
		before - self.len()
	}

	pub fn len(&self) -> usize {
		self.entries.values().map(BTreeMap::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
