//! Pack-level resolution.
//!
//! Every card of one pack belongs to the same set. Slots are matched
//! independently first, the pack's set is voted from the confident matches, and
//! any slot that disagrees (or found nothing) is matched again inside that set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CardId, CardMatcher, CardRegion, Image, MatchConfig, MatchOptions, MatchResult};

/// Display-name lookup for matched cards.
pub trait NameResolver {
	/// `None` falls back to the raw card code.
	fn display_name(&self, card: &CardId) -> Option<String>;
}

impl<F> NameResolver for F
where
	F: Fn(&CardId) -> Option<String>,
{
	fn display_name(&self, card: &CardId) -> Option<String> {
		self(card)
	}
}

/// Resolves every card to its raw code.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodes;

impl NameResolver for RawCodes {
	fn display_name(&self, _card: &CardId) -> Option<String> {
		None
	}
}

/// A recognized card in a pack screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedCard {
	/// 1-based slot index in detection order.
	pub position: usize,
	pub card_code: String,
	pub display_name: String,
	pub set_id: String,
	pub confidence: f32,
	pub bounding_box: CardRegion,
}

/// Set constraint implied by the number of slots in the pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackConstraint {
	None,
	/// 4-card packs only exist for one set.
	Only(String),
	/// 5 and 6-card packs never belong to that set.
	Excluding(Vec<String>),
}

impl PackConstraint {
	pub fn for_slot_count(slots: usize, special_set: &str) -> Self {
		match slots {
			4 => Self::Only(special_set.to_string()),
			5 | 6 => Self::Excluding(vec![special_set.to_string()]),
			_ => Self::None,
		}
	}

	pub fn options(&self) -> MatchOptions<'_> {
		match self {
			Self::None => MatchOptions::default(),
			Self::Only(set_id) => MatchOptions::only(set_id),
			Self::Excluding(sets) => MatchOptions::excluding(sets),
		}
	}
}

struct Slot {
	region: CardRegion,
	result: Option<MatchResult>,
}

/// The set with the highest summed confidence over matches above `floor`.
///
/// Ties go to the first set id in sort order.
pub fn majority_set<'a>(results: impl IntoIterator<Item = Option<&'a MatchResult>>, floor: f32) -> Option<String> {
	let mut totals: BTreeMap<&str, f32> = BTreeMap::new();
	for m in results.into_iter().flatten() {
		if m.confidence > floor {
			*totals.entry(m.card.set_id.as_str()).or_default() += m.confidence;
		}
	}

	totals
		.into_iter()
		.fold(None, |best: Option<(&str, f32)>, (set_id, total)| match best {
			Some((_, t)) if t >= total => best,
			_ => Some((set_id, total)),
		})
		.map(|(set_id, _)| set_id.to_string())
}

/// Match every region of one screenshot and resolve them as a single pack.
pub fn resolve_pack(
	screenshot: Image,
	regions: &[CardRegion],
	matcher: &CardMatcher,
	config: &MatchConfig,
	names: &dyn NameResolver,
) -> Vec<DetectedCard> {
	let constraint = PackConstraint::for_slot_count(regions.len(), &config.special_set);
	tracing::debug!(slots = regions.len(), ?constraint, "resolving pack");

	let options = constraint.options();
	let mut slots = regions
		.iter()
		.enumerate()
		.map(|(i, &region)| {
			let result = matcher.find_best(region.crop(screenshot), &options);
			match &result {
				Some(m) => tracing::debug!(position = i + 1, card = %m.card, confidence = m.confidence, "initial match"),
				None => tracing::debug!(position = i + 1, "no initial match"),
			}
			Slot { region, result }
		})
		.collect::<Vec<_>>();

	let majority = majority_set(slots.iter().map(|s| s.result.as_ref()), config.low_floor);
	if let Some(majority) = &majority {
		tracing::info!(set = %majority, "majority set");
		let rescan = MatchOptions::only(majority).detailed();

		for (i, slot) in slots.iter_mut().enumerate() {
			let is_outlier = slot.result.as_ref().is_none_or(|m| &m.card.set_id != majority);
			if !is_outlier {
				continue;
			}

			tracing::info!(position = i + 1, previous = ?slot.result.as_ref().map(|m| m.card.to_string()), "rescanning outlier in majority set");
			if let Some(found) = matcher.find_best(slot.region.crop(screenshot), &rescan) {
				slot.result = Some(found);
			}
		}
	}

	slots
		.into_iter()
		.enumerate()
		.filter_map(|(i, slot)| {
			let position = i + 1;
			let m = match slot.result {
				Some(m) if m.confidence > config.low_floor => m,
				_ => {
					tracing::info!(position, "no card match");
					return None;
				}
			};

			let display_name = names
				.display_name(&m.card)
				.unwrap_or_else(|| m.card.card_code.clone());
			tracing::info!(position, card = %m.card, name = %display_name, confidence = m.confidence, "card identified");

			Some(DetectedCard {
				position,
				card_code: m.card.card_code,
				display_name,
				set_id: m.card.set_id,
				confidence: m.confidence,
				bounding_box: slot.region,
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::MatchStage;

	fn hit(set: &str, confidence: f32) -> MatchResult {
		MatchResult {
			card: CardId::new(set, "1"),
			confidence,
			stage: MatchStage::Coarse,
		}
	}

	#[test]
	fn summed_confidence_beats_single_strong_match() {
		let a = hit("X", 0.95);
		let b = hit("Y", 0.99);
		let c = hit("X", 0.5);

		assert_eq!(majority_set([Some(&a), Some(&b)], 0.2).as_deref(), Some("Y"));
		assert_eq!(majority_set([Some(&a), Some(&b), Some(&c)], 0.2).as_deref(), Some("X"));
	}

	#[test]
	fn weak_and_missing_matches_do_not_vote() {
		let weak = hit("Y", 0.2);
		let ok = hit("X", 0.3);
		assert_eq!(majority_set([Some(&weak), None, Some(&ok)], 0.2).as_deref(), Some("X"));
		assert_eq!(majority_set([Some(&weak), None], 0.2), None);
	}

	#[test]
	fn slot_count_sets_the_constraint() {
		assert_eq!(PackConstraint::for_slot_count(4, "A4b"), PackConstraint::Only("A4b".into()));
		assert_eq!(PackConstraint::for_slot_count(5, "A4b"), PackConstraint::Excluding(vec!["A4b".into()]));
		assert_eq!(PackConstraint::for_slot_count(6, "A4b"), PackConstraint::Excluding(vec!["A4b".into()]));
		assert_eq!(PackConstraint::for_slot_count(3, "A4b"), PackConstraint::None);
	}

	#[test]
	fn closures_resolve_names() {
		let names = |card: &CardId| (card.set_id == "A1").then(|| format!("Card {}", card.card_code));
		assert_eq!(names.display_name(&CardId::new("A1", "7")).as_deref(), Some("Card 7"));
		assert_eq!(names.display_name(&CardId::new("A2", "7")), None);
		assert_eq!(RawCodes.display_name(&CardId::new("A1", "7")), None);
	}
}
