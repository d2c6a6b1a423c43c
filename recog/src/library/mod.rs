//! Reference card corpus.
//!
//! Templates live in `<root>/<set id>/<card code>.<ext>`. Each one is reduced
//! to a perceptual hash and a normalized color vector at load time; the
//! decoded art is dropped right after and the search index keeps the only
//! copy of the rest. Hashes are cached in `<root>/phashes.json` so only new
//! cards pay for hashing.

pub mod cache;
pub mod index;

use std::{
	collections::BTreeSet,
	fmt,
	path::{Path, PathBuf},
};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

pub use cache::HashCache;
pub use index::{SearchIndex, SetMatrix};

use crate::{Error, Image, MatchConfig, OwnedImage, PerceptualHash, Result};

pub const TEMPLATE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// A card within a set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId {
	pub set_id: String,
	pub card_code: String,
}

impl CardId {
	pub fn new(set_id: impl Into<String>, card_code: impl Into<String>) -> Self {
		Self {
			set_id: set_id.into(),
			card_code: card_code.into(),
		}
	}
}

impl fmt::Display for CardId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.set_id, self.card_code)
	}
}

#[derive(Debug, Clone)]
pub struct CardTemplate {
	pub id: CardId,
	pub hash: PerceptualHash,
	/// Zero-mean, unit-norm RGB vector at the configured feature size.
	pub features: Array1<f32>,
}

impl CardTemplate {
	pub fn from_image(id: CardId, image: Image, config: &MatchConfig) -> Result<Self> {
		Ok(Self {
			id,
			hash: PerceptualHash::of(image)?,
			features: feature_vector(image, config.feature_width, config.feature_height)?,
		})
	}
}

/// Resize to `width`x`height` and flatten into a zero-mean, unit-norm vector.
///
/// A dot product of two such vectors is their normalized cross-correlation.
/// A flat image has no variance and yields the zero vector.
pub fn feature_vector(image: Image, width: u32, height: u32) -> Result<Array1<f32>> {
	let resized = image.resized(width, height)?;
	let mut v = resized
		.as_image()
		.get_bytes()
		.into_iter()
		.map(f32::from)
		.collect::<Array1<f32>>();

	let mean = v.mean().unwrap_or(0.0);
	v -= mean;
	let norm = v.dot(&v).sqrt();
	if norm > f32::EPSILON {
		v /= norm;
	}
	Ok(v)
}

pub struct TemplateLibrary {
	root: PathBuf,
	index: SearchIndex,
}

impl TemplateLibrary {
	/// Load every template under `root` and build the search index.
	///
	/// Unreadable images are skipped with a warning. Fails with
	/// [`Error::NoTemplates`] if nothing usable was found.
	pub fn load(root: impl AsRef<Path>, config: &MatchConfig) -> Result<Self> {
		let root = root.as_ref();
		tracing::info!(root = %root.display(), "loading card templates");

		let mut cache = HashCache::load_or_default(root);
		let mut seen = BTreeSet::new();
		let mut computed = 0usize;
		let mut templates = Vec::new();

		for (set_id, set_dir) in sorted_dirs(root)? {
			for (card_code, path) in sorted_images(&set_dir) {
				let id = CardId::new(&set_id, card_code);
				seen.insert(id.clone());
				match load_template(id, &path, &cache, config) {
					Ok((template, fresh)) => {
						if fresh {
							cache.insert(&template.id, template.hash);
							computed += 1;
						}
						templates.push(template);
					}
					Err(err) => tracing::warn!(error = %err, path = %path.display(), "skipping unreadable template"),
				}
			}
		}

		let pruned = cache.retain(|id| seen.contains(id));
		if computed > 0 || pruned > 0 {
			tracing::info!(computed, pruned, "updating hash cache");
			if let Err(err) = cache.save(root) {
				tracing::warn!(error = %format!("{err:#}"), "failed to write hash cache");
			}
		}

		let library = Self::from_templates(root, templates)?;
		tracing::info!(templates = library.template_count(), sets = library.index.set_ids().count(), "card templates loaded");
		Ok(library)
	}

	/// Build a library from already prepared templates.
	pub fn from_templates(root: impl Into<PathBuf>, mut templates: Vec<CardTemplate>) -> Result<Self> {
		let root = root.into();
		if templates.is_empty() {
			return Err(Error::NoTemplates { root });
		}
		templates.sort_by(|a, b| a.id.cmp(&b.id));
		templates.dedup_by(|a, b| a.id == b.id);
		let index = SearchIndex::build(&templates);
		Ok(Self { root, index })
	}

	/// Replace the whole library with the templates under `root`.
	///
	/// On error the current templates and index are kept.
	pub fn reload(&mut self, root: impl AsRef<Path>, config: &MatchConfig) -> Result<()> {
		*self = Self::load(root, config)?;
		Ok(())
	}

	/// Regenerate the search index from the templates it holds.
	pub fn rebuild(&mut self) {
		self.index = SearchIndex::build(&self.index.templates());
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn index(&self) -> &SearchIndex {
		&self.index
	}

	/// Copies of the loaded templates, sorted by card id.
	pub fn templates(&self) -> Vec<CardTemplate> {
		self.index.templates()
	}

	pub fn template_count(&self) -> usize {
		self.index.rows().len()
	}

	pub fn set_ids(&self) -> impl Iterator<Item = &str> {
		self.index.set_ids()
	}

	pub fn card_ids(&self) -> impl Iterator<Item = &CardId> {
		self.index.rows().iter()
	}
}

/// The template at `path`, and whether its hash had to be computed.
fn load_template(id: CardId, path: &Path, cache: &HashCache, config: &MatchConfig) -> Result<(CardTemplate, bool)> {
	let image = OwnedImage::open(path)?;
	let features = feature_vector(image.as_image(), config.feature_width, config.feature_height)?;
	let (hash, fresh) = match cache.get(&id) {
		Some(hash) => (hash, false),
		None => (PerceptualHash::of(image.as_image())?, true),
	};
	Ok((CardTemplate { id, hash, features }, fresh))
}

/// Immediate subdirectories of `root` as `(set id, path)`, sorted by name.
fn sorted_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>> {
	let entries = std::fs::read_dir(root).map_err(|source| Error::TemplateDir {
		root: root.to_path_buf(),
		source,
	})?;

	let mut dirs = entries
		.flatten()
		.map(|e| e.path())
		.filter(|p| p.is_dir())
		.filter_map(|p| Some((p.file_name()?.to_str()?.to_string(), p)))
		.collect::<Vec<_>>();
	dirs.sort();
	Ok(dirs)
}

/// Template images in `dir` as `(card code, path)`, sorted by name.
fn sorted_images(dir: &Path) -> Vec<(String, PathBuf)> {
	let entries = match std::fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(err) => {
			tracing::warn!(error = %err, dir = %dir.display(), "skipping unreadable set directory");
			return vec![];
		}
	};

	let mut images = entries
		.flatten()
		.map(|e| e.path())
		.filter(|p| p.is_file() && has_template_extension(p))
		.filter_map(|p| Some((p.file_stem()?.to_str()?.to_string(), p)))
		.collect::<Vec<_>>();
	images.sort();
	images
}

fn has_template_extension(path: &Path) -> bool {
	path.extension()
		.and_then(|e| e.to_str())
		.is_some_and(|e| TEMPLATE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}
