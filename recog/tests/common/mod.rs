// Shared fixtures: synthetic card art, template corpora and pack screenshots.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;

pub const CARD_W: u32 = 75;
pub const CARD_H: u32 = 106;
pub const BACKGROUND: Rgb<u8> = Rgb([0xe7, 0xf0, 0xf7]);

const THREE_X: [u32; 3] = [0, 81, 164];
const TWO_X: [u32; 2] = [39, 124];
const TOP_Y: u32 = 5;
const BOTTOM_Y: u32 = 121;

/// Temporary directory removed on drop.
pub struct TempDir(PathBuf);

impl TempDir {
	pub fn new(name: &str) -> Self {
		let dir = std::env::temp_dir().join(format!("recog-{name}-{}", std::process::id()));
		let _ = std::fs::remove_dir_all(&dir);
		std::fs::create_dir_all(&dir).unwrap();
		Self(dir)
	}

	pub fn path(&self) -> &Path {
		&self.0
	}
}

impl Drop for TempDir {
	fn drop(&mut self) {
		let _ = std::fs::remove_dir_all(&self.0);
	}
}

struct Lcg(u64);

impl Lcg {
	fn next(&mut self) -> u32 {
		self.0 = self
			.0
			.wrapping_mul(6364136223846793005)
			.wrapping_add(1442695040888963407);
		(self.0 >> 33) as u32
	}

	fn range(&mut self, lo: u32, hi: u32) -> u32 {
		lo + self.next() % (hi - lo)
	}

	fn color(&mut self) -> Rgb<u8> {
		Rgb([self.range(0, 256) as u8, self.range(0, 256) as u8, self.range(0, 256) as u8])
	}
}

/// Card-sized art that is distinct per seed and never as pale as the background.
pub fn card_art(seed: u64) -> RgbImage {
	let mut rng = Lcg(seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ 0xabcdef);
	let base = Rgb([
		rng.range(20, 180) as u8,
		rng.range(20, 180) as u8,
		rng.range(20, 180) as u8,
	]);
	let mut img = RgbImage::from_pixel(CARD_W, CARD_H, base);

	for _ in 0..7 {
		let x = rng.range(0, CARD_W - 10) as i32;
		let y = rng.range(0, CARD_H - 10) as i32;
		let w = rng.range(8, 40);
		let h = rng.range(8, 50);
		let color = rng.color();
		draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), color);
	}
	for _ in 0..3 {
		let center = (rng.range(0, CARD_W) as i32, rng.range(0, CARD_H) as i32);
		let radius = rng.range(5, 20) as i32;
		let color = rng.color();
		draw_filled_circle_mut(&mut img, center, radius, color);
	}
	img
}

/// Write `<root>/<set>/<code>.png` for every `(set, code, seed)`.
pub fn write_corpus(root: &Path, cards: &[(&str, &str, u64)]) {
	for &(set, code, seed) in cards {
		let dir = root.join(set);
		std::fs::create_dir_all(&dir).unwrap();
		card_art(seed).save(dir.join(format!("{code}.png"))).unwrap();
	}
}

/// `(set, code, seed)` for `count` cards numbered from 1, seeds offset by `base`.
pub fn numbered(set: &'static str, count: u64, base: u64) -> Vec<(&'static str, String, u64)> {
	(1..=count).map(|i| (set, i.to_string(), base + i)).collect()
}

pub fn write_numbered(root: &Path, sets: &[(&'static str, u64, u64)]) {
	for &(set, count, base) in sets {
		let cards = numbered(set, count, base);
		let refs = cards
			.iter()
			.map(|(s, c, seed)| (*s, c.as_str(), *seed))
			.collect::<Vec<_>>();
		write_corpus(root, &refs);
	}
}

/// A reference-size (240x227) pack screenshot.
///
/// Cards fill the top row first. 2 or 3 top cards are chosen so that the
/// remaining cards fit the bottom row: 4 = 2+2, 5 = 3+2, 6 = 3+3.
pub fn pack_screenshot(cards: &[RgbImage]) -> RgbImage {
	let (top, bottom): (&[u32], &[u32]) = match cards.len() {
		4 => (&TWO_X, &TWO_X),
		5 => (&THREE_X, &TWO_X),
		6 => (&THREE_X, &THREE_X),
		n => panic!("unsupported pack size {n}"),
	};

	let mut shot = RgbImage::from_pixel(240, 227, BACKGROUND);
	let slots = top
		.iter()
		.map(|&x| (x, TOP_Y))
		.chain(bottom.iter().map(|&x| (x, BOTTOM_Y)));
	for (card, (x, y)) in cards.iter().zip(slots) {
		image::imageops::replace(&mut shot, card, x as i64, y as i64);
	}
	shot
}

pub fn save_screenshot(dir: &Path, name: &str, shot: &RgbImage) -> PathBuf {
	let path = dir.join(name);
	shot.save(&path).unwrap();
	path
}
