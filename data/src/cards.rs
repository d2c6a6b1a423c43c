use std::{
	collections::HashMap,
	fs::File,
	io::{BufReader, BufWriter, Read, Write},
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use recog::{CardId, NameResolver};

use crate::{
	schema::{self, CardEntry},
	sets::normalize_set_code,
};

/// Display label for a database rarity code.
pub fn rarity_label(code: &str) -> Option<&'static str> {
	Some(match code {
		"C" => "Common",
		"U" => "Uncommon",
		"R" => "Rare",
		"RR" => "Double Rare",
		"AR" | "S" => "Illustration Rare",
		"SR" | "SAR" | "SSR" => "Super / Special Rare",
		"IM" => "Immersive",
		"UR" => "Crown Rare",
		_ => return None,
	})
}

/// Card display names keyed by card code (`<set>_<number>`).
#[derive(Debug, Clone, Default)]
pub struct CardNames {
	names: HashMap<String, String>,
}

impl CardNames {
	pub fn from_entries(entries: impl IntoIterator<Item = CardEntry>) -> Self {
		let names = entries
			.into_iter()
			.map(|entry| {
				let code = format!("{}_{}", normalize_set_code(&entry.set), entry.number);
				let name = entry.name.replace("â€™", "'");
				let rarity = match rarity_label(&entry.rarity) {
					Some(label) => label,
					None => entry.rarity.as_str(),
				};
				(code, format!("{name} ({rarity})"))
			})
			.collect();
		Self { names }
	}

	pub fn from_reader(reader: impl Read) -> Result<Self> {
		let entries: Vec<CardEntry> = serde_json::from_reader(reader).context("Decode card database JSON")?;
		Ok(Self::from_entries(entries))
	}

	/// Read a local copy of the card database.
	pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let file = File::open(path).with_context(|| format!("Open card database {}", path.display()))?;
		Self::from_reader(BufReader::new(file)).with_context(|| format!("Parse card database {}", path.display()))
	}

	fn cache_path() -> Option<PathBuf> {
		dirs::cache_dir().map(|p| p.join("cardcounter").join("cards.json"))
	}

	/// Fetch the card database from `url`; if it fails, fall back to the cached copy.
	pub fn fetch(url: &str) -> Result<Self> {
		let cache = Self::cache_path().context("No cache_dir available")?;
		Self::fetch_cached(url, &cache)
	}

	/// Fetch the public card database with the default cache location.
	pub fn fetch_default() -> Result<Self> {
		Self::fetch(schema::URL)
	}

	/// Like [`CardNames::fetch`], with an explicit cache file.
	pub fn fetch_cached(url: &str, cache: &Path) -> Result<Self> {
		match fetch_remote(url) {
			Ok(entries) => {
				if let Err(err) = save_cache(cache, &entries) {
					tracing::warn!(error = %format!("{err:#}"), "failed to write card database cache");
				}
				Ok(Self::from_entries(entries))
			}
			Err(err) => match Self::from_json(cache) {
				Ok(cached) => {
					tracing::warn!(error = %format!("{err:#}"), cache = %cache.display(), "using cached card database due to network error");
					Ok(cached)
				}
				Err(_) => Err(err),
			},
		}
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	/// Display name for a card, trying `card_code` as-is and then as a number
	/// within `set_id`.
	pub fn get(&self, set_id: &str, card_code: &str) -> Option<&str> {
		self.names
			.get(card_code)
			.or_else(|| self.names.get(&format!("{set_id}_{card_code}")))
			.map(String::as_str)
	}
}

impl NameResolver for CardNames {
	fn display_name(&self, card: &CardId) -> Option<String> {
		self.get(&card.set_id, &card.card_code).map(str::to_owned)
	}
}

fn fetch_remote(url: &str) -> Result<Vec<CardEntry>> {
	let mut res = ureq::get(url)
		.call()
		.with_context(|| format!("GET {url}"))?;
	res.body_mut()
		.with_config()
		.limit(64 * 1024 * 1024)
		.read_json::<Vec<CardEntry>>()
		.context("Decode card database JSON")
}

fn save_cache(path: &Path, entries: &[CardEntry]) -> Result<()> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).with_context(|| format!("Create cache dir {}", parent.display()))?;
	}

	let tmp = path.with_extension("json.tmp");
	let file = File::create(&tmp).with_context(|| format!("Write cache temp {}", tmp.display()))?;
	let mut writer = BufWriter::new(file);
	serde_json::to_writer(&mut writer, entries).context("Serialize cache")?;
	writer.flush().context("Flush cache")?;
	drop(writer);

	// Replace existing file (Windows-friendly).
	if std::fs::rename(&tmp, path).is_err() {
		let _ = std::fs::remove_file(path);
		std::fs::rename(&tmp, path).with_context(|| format!("Persist cache {}", path.display()))?;
	}
	Ok(())
}
