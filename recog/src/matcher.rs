//! Two-stage card matching for a single cropped slot.
//!
//! Stage 1 scores the crop's perceptual hash against every allowed template
//! in one batched pass. A near-certain hash match is returned as-is. Otherwise
//! stage 2 correlates the crop's feature vector against the full matrices of
//! the few best-scoring sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
	CardId, Image, MatchConfig, PerceptualHash, TemplateLibrary, hash::confidence_from_distance,
	library::feature_vector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
	Coarse,
	Fine,
}

/// Best template for one region.
///
/// `confidence` is in `[0, 1]` for coarse matches. Fine matches carry the raw
/// correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
	pub card: CardId,
	pub confidence: f32,
	pub stage: MatchStage,
}

/// Restrictions on which sets a match may come from.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions<'a> {
	/// Only consider this set. Takes precedence over `exclude_sets`.
	pub force_set: Option<&'a str>,
	pub exclude_sets: &'a [String],
	/// Always run stage 2, even after a confident stage 1.
	pub force_detailed: bool,
}

impl<'a> MatchOptions<'a> {
	pub fn only(set_id: &'a str) -> Self {
		Self {
			force_set: Some(set_id),
			..Default::default()
		}
	}

	pub fn excluding(sets: &'a [String]) -> Self {
		Self {
			exclude_sets: sets,
			..Default::default()
		}
	}

	pub fn detailed(mut self) -> Self {
		self.force_detailed = true;
		self
	}

	fn allows(&self, set_id: &str) -> bool {
		match self.force_set {
			Some(only) => only == set_id,
			None => !self.exclude_sets.iter().any(|s| s == set_id),
		}
	}
}

/// Borrows the library read-only for the duration of matching.
pub struct CardMatcher<'a> {
	library: &'a TemplateLibrary,
	config: &'a MatchConfig,
}

impl<'a> CardMatcher<'a> {
	pub fn new(library: &'a TemplateLibrary, config: &'a MatchConfig) -> Self {
		Self { library, config }
	}

	/// Best allowed template for `region`.
	///
	/// A correlation result at or below `low_floor` is no match. The hash result
	/// is only used when correlation could not run.
	pub fn find_best(&self, region: Image, options: &MatchOptions) -> Option<MatchResult> {
		if region.is_empty() {
			return None;
		}

		let coarse = match self.coarse(region, options) {
			Ok(coarse) => coarse,
			Err(err) => {
				tracing::warn!(error = %err, "cannot hash region");
				return None;
			}
		};

		if let Some(best) = &coarse.best {
			if !options.force_detailed && best.confidence >= self.config.early_exit {
				tracing::debug!(card = %best.card, confidence = best.confidence, "confident hash match; skipping correlation");
				return Some(best.clone());
			}
		}

		let candidates = match options.force_set {
			Some(set_id) => vec![set_id.to_string()],
			None => candidate_sets(&coarse.set_scores, self.config),
		};
		tracing::debug!(?candidates, "correlation search");

		match self.fine(region, &candidates) {
			Some(fine) if fine.confidence > self.config.low_floor => Some(fine),
			Some(fine) => {
				tracing::debug!(card = %fine.card, confidence = fine.confidence, "correlation below floor; no match");
				None
			}
			None => coarse.best.filter(|m| m.confidence > self.config.low_floor),
		}
	}

	fn coarse(&self, region: Image, options: &MatchOptions) -> crate::Result<Coarse> {
		let index = self.library.index();
		let hash = PerceptualHash::of(region)?;
		let distances = index.hash_distances(hash);

		let mut best: Option<(usize, f32)> = None;
		let mut set_scores: BTreeMap<String, f32> = BTreeMap::new();
		for (row, (id, &distance)) in index.rows().iter().zip(distances.iter()).enumerate() {
			if !options.allows(&id.set_id) {
				continue;
			}

			let confidence = confidence_from_distance(distance);
			if best.is_none_or(|(_, c)| confidence > c) {
				best = Some((row, confidence));
			}
			let entry = set_scores.entry(id.set_id.clone()).or_insert(confidence);
			if confidence > *entry {
				*entry = confidence;
			}
		}

		let best = best.map(|(row, confidence)| MatchResult {
			card: index.rows()[row].clone(),
			confidence,
			stage: MatchStage::Coarse,
		});
		if let Some(b) = &best {
			tracing::debug!(card = %b.card, confidence = b.confidence, "hash search");
		}
		Ok(Coarse { best, set_scores })
	}

	fn fine(&self, region: Image, candidates: &[String]) -> Option<MatchResult> {
		let query = match feature_vector(region, self.config.feature_width, self.config.feature_height) {
			Ok(query) => query,
			Err(err) => {
				tracing::warn!(error = %err, "cannot extract region features");
				return None;
			}
		};

		let mut best: Option<MatchResult> = None;
		for set_id in candidates {
			let Some(set) = self.library.index().set(set_id) else {
				continue;
			};
			let scores = match set.correlate(query.view()) {
				Ok(scores) => scores,
				Err(err) => {
					tracing::warn!(error = %err, set = %set_id, "skipping set in correlation search");
					continue;
				}
			};

			for (card_code, &score) in set.cards().iter().zip(scores.iter()) {
				if best.as_ref().is_none_or(|b| score > b.confidence) {
					best = Some(MatchResult {
						card: CardId::new(set_id, card_code),
						confidence: score,
						stage: MatchStage::Fine,
					});
				}
			}
		}

		if let Some(b) = &best {
			tracing::debug!(card = %b.card, confidence = b.confidence, "correlation search");
		}
		best
	}
}

struct Coarse {
	best: Option<MatchResult>,
	/// Best stage-1 confidence per allowed set.
	set_scores: BTreeMap<String, f32>,
}

/// Sets to correlate against, best first.
///
/// Every set within `set_margin` of the top score is taken, capped at
/// `max_candidate_sets`; the list is topped up with the next best sets until it
/// holds `min_candidate_sets`.
fn candidate_sets(set_scores: &BTreeMap<String, f32>, config: &MatchConfig) -> Vec<String> {
	let mut ranked = set_scores.iter().collect::<Vec<_>>();
	ranked.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));

	let Some(&(_, &top)) = ranked.first() else {
		return vec![];
	};
	ranked
		.into_iter()
		.enumerate()
		.take_while(|&(i, (_, &score))| {
			i < config.max_candidate_sets && (i < config.min_candidate_sets || score >= top - config.set_margin)
		})
		.map(|(_, (set_id, _))| set_id.clone())
		.collect()
}
