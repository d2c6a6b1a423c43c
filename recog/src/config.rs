use serde::{Deserialize, Serialize};

use crate::layout::Rect;

/// Thresholds and sizes used by the two-stage matcher and the pack resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
	/// Every template and region is resized to this before correlation.
	pub feature_width: u32,
	pub feature_height: u32,

	/// Stage-1 confidence at or above which stage 2 is skipped.
	pub early_exit: f32,

	/// Matches at or below this confidence are treated as no match.
	pub low_floor: f32,

	/// Sets whose stage-1 best is within this of the top set join stage 2.
	pub set_margin: f32,
	pub min_candidate_sets: usize,
	pub max_candidate_sets: usize,

	/// The only set that ships 4-card packs; 5 and 6-card packs never contain it.
	pub special_set: String,
}

impl Default for MatchConfig {
	fn default() -> Self {
		Self {
			feature_width: 92,
			feature_height: 128,
			early_exit: 0.90,
			low_floor: 0.2,
			set_margin: 0.05,
			min_candidate_sets: 3,
			max_candidate_sets: 5,
			special_set: "A4b".to_string(),
		}
	}
}

/// Fixed card-slot geometry at the reference resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	pub reference_width: u32,
	pub reference_height: u32,

	pub card_width: u32,
	pub card_height: u32,
	pub top_row_y: u32,
	pub bottom_row_y: u32,

	/// Left edges of the slots in a 3-card row.
	pub three_card_x: Vec<u32>,
	/// Left edges of the slots in a 2-card row.
	pub two_card_x: Vec<u32>,

	/// Sampled to tell a 2-card row (background) from a 3-card row (card art).
	pub top_probe: Rect,
	pub bottom_probe: Rect,

	/// Mean luma above which a probe counts as background (#e7f0f7 ~ 238).
	pub background_threshold: f32,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			reference_width: 240,
			reference_height: 227,
			card_width: 75,
			card_height: 106,
			top_row_y: 5,
			bottom_row_y: 121,
			three_card_x: vec![0, 81, 164],
			two_card_x: vec![39, 124],
			top_probe: Rect::new(0, 8, 30, 50),
			bottom_probe: Rect::new(0, 124, 30, 50),
			background_threshold: 235.0,
		}
	}
}
