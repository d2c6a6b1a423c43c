//! Card-slot detection for pack screenshots.
//!
//! Pack screens use one fixed layout, scaled uniformly with the capture. Slot
//! boxes are defined at a reference resolution and scaled per axis. Each row
//! holds either 2 or 3 cards; a probe at the left edge of the row tells the two
//! apart, since a 2-card row leaves that area showing the pale background.

use serde::{Deserialize, Serialize};

use crate::{Image, LayoutConfig};

/// Axis-aligned rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

/// One card slot in screenshot pixel coordinates.
pub type CardRegion = Rect;

impl Rect {
	pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
		Self { x, y, width, height }
	}

	pub fn right(&self) -> u32 {
		self.x + self.width
	}

	pub fn bottom(&self) -> u32 {
		self.y + self.height
	}

	pub fn fits_within(&self, width: u32, height: u32) -> bool {
		self.right() <= width && self.bottom() <= height
	}

	pub fn crop<'a>(&self, image: Image<'a>) -> Image<'a> {
		image.sub_image(self.x, self.y, self.width, self.height)
	}

	/// Scale every coordinate by the matching axis, rounding each independently.
	fn scaled(&self, sx: f64, sy: f64) -> Self {
		Self {
			x: px(self.x, sx),
			y: px(self.y, sy),
			width: px(self.width, sx),
			height: px(self.height, sy),
		}
	}
}

#[inline]
fn px(base: u32, s: f64) -> u32 {
	(base as f64 * s).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayout {
	Two,
	Three,
}

pub struct PositionDetector {
	config: LayoutConfig,
}

impl Default for PositionDetector {
	fn default() -> Self {
		Self::new(LayoutConfig::default())
	}
}

impl PositionDetector {
	pub fn new(config: LayoutConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	/// Slot boxes ordered top row first, each row left to right.
	///
	/// Returns 4, 5 or 6 boxes. All boxes are clipped to the image bounds.
	/// If either row's sample rectangle falls outside the image, both rows use
	/// the default layout (3 top, 2 bottom), whatever the other row reads.
	pub fn detect(&self, image: Image) -> Vec<CardRegion> {
		let (width, height) = (image.width(), image.height());
		let sx = width as f64 / self.config.reference_width as f64;
		let sy = height as f64 / self.config.reference_height as f64;

		let (top, bottom) = match (
			self.row_layout(image, self.config.top_probe, sx, sy),
			self.row_layout(image, self.config.bottom_probe, sx, sy),
		) {
			(Some(top), Some(bottom)) => (top, bottom),
			_ => {
				tracing::debug!(width, height, "layout probe out of bounds; using default layout");
				(RowLayout::Three, RowLayout::Two)
			}
		};
		tracing::debug!(?top, ?bottom, width, height, "resolved pack layout");

		self.row(top, self.config.top_row_y)
			.chain(self.row(bottom, self.config.bottom_row_y))
			.map(|r| clip(r.scaled(sx, sy), width, height))
			.collect()
	}

	/// `None` when the scaled probe does not fit inside the image.
	fn row_layout(&self, image: Image, probe: Rect, sx: f64, sy: f64) -> Option<RowLayout> {
		let probe = probe.scaled(sx, sy);
		if probe.width == 0 || probe.height == 0 || !probe.fits_within(image.width(), image.height()) {
			return None;
		}

		let brightness = probe.crop(image).average_luma();
		if brightness > self.config.background_threshold {
			Some(RowLayout::Two)
		} else {
			Some(RowLayout::Three)
		}
	}

	fn row(&self, layout: RowLayout, y: u32) -> impl Iterator<Item = Rect> + '_ {
		let xs = match layout {
			RowLayout::Two => &self.config.two_card_x,
			RowLayout::Three => &self.config.three_card_x,
		};
		xs.iter()
			.map(move |&x| Rect::new(x, y, self.config.card_width, self.config.card_height))
	}
}

fn clip(r: Rect, width: u32, height: u32) -> Rect {
	let x = r.x.min(width);
	let y = r.y.min(height);
	Rect {
		x,
		y,
		width: r.width.min(width - x),
		height: r.height.min(height - y),
	}
}
