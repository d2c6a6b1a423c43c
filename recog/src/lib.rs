mod config;
pub use config::*;
mod error;
pub use error::{Error, Result};
mod hash;
pub use hash::PerceptualHash;
mod image;
pub use self::image::*;
pub mod layout;
pub use layout::{CardRegion, PositionDetector, Rect};
pub mod library;
pub use library::{CardId, CardTemplate, TemplateLibrary};
mod matcher;
pub use matcher::{CardMatcher, MatchOptions, MatchResult, MatchStage};
pub mod pack;
pub use pack::{DetectedCard, NameResolver, RawCodes};

use std::path::Path;

/// Card recognition for pack screenshots.
///
/// Holds the template library read-only; `process_*` take `&self` and can run
/// concurrently. Reloading templates needs `&mut self`.
pub struct Recognizer {
	library: TemplateLibrary,
	detector: PositionDetector,
	config: MatchConfig,
	names: Box<dyn NameResolver + Send + Sync>,
}

impl Recognizer {
	pub fn try_new(template_root: impl AsRef<Path>, config: MatchConfig, layout: LayoutConfig) -> Result<Self> {
		let library = TemplateLibrary::load(template_root, &config)?;
		Ok(Self::with_library(library, config, layout))
	}

	pub fn with_library(library: TemplateLibrary, config: MatchConfig, layout: LayoutConfig) -> Self {
		Self {
			library,
			detector: PositionDetector::new(layout),
			config,
			names: Box::new(RawCodes),
		}
	}

	pub fn with_names(mut self, names: impl NameResolver + Send + Sync + 'static) -> Self {
		self.names = Box::new(names);
		self
	}

	pub fn library(&self) -> &TemplateLibrary {
		&self.library
	}

	pub fn config(&self) -> &MatchConfig {
		&self.config
	}

	/// Replace the template library. On error the previous one stays in use.
	pub fn reload_templates(&mut self, template_root: impl AsRef<Path>) -> Result<()> {
		self.library.reload(template_root, &self.config)
	}

	pub fn matcher(&self) -> CardMatcher<'_> {
		CardMatcher::new(&self.library, &self.config)
	}

	pub fn detect_regions(&self, screenshot: Image) -> Vec<CardRegion> {
		self.detector.detect(screenshot)
	}

	/// Recognize the cards in a screenshot file.
	///
	/// An unreadable or undecodable file yields no cards.
	pub fn process_screenshot(&self, path: impl AsRef<Path>) -> Vec<DetectedCard> {
		let path = path.as_ref();
		tracing::info!(path = %path.display(), "processing screenshot");

		let screenshot = match OwnedImage::open(path) {
			Ok(img) => img,
			Err(err) => {
				tracing::warn!(error = %err, path = %path.display(), "failed to load screenshot");
				return vec![];
			}
		};

		let cards = self.process_image(screenshot.as_image());
		tracing::info!(path = %path.display(), found = cards.len(), "screenshot processed");
		cards
	}

	pub fn process_image(&self, screenshot: Image) -> Vec<DetectedCard> {
		let regions = self.detect_regions(screenshot);
		tracing::debug!(regions = regions.len(), "detected card positions");
		pack::resolve_pack(screenshot, &regions, &self.matcher(), &self.config, self.names.as_ref())
	}
}
