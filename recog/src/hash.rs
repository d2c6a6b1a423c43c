//! DCT-based perceptual hash.
//!
//! The crop is reduced to a 32x32 luma grid, transformed with a 2-D DCT-II and
//! the top-left 8x8 low-frequency block is thresholded against its median.
//! Bits are stored row-major with the first coefficient in the most
//! significant position, so the hex form reads in grid order.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::{Error, Image, Result};

const SAMPLE: usize = 32;
const GRID: usize = 8;

/// `COSINES[k][n] = cos(pi / 32 * (n + 0.5) * k)` for the low-frequency rows.
static COSINES: LazyLock<[[f64; SAMPLE]; GRID]> = LazyLock::new(|| {
	let mut table = [[0.0; SAMPLE]; GRID];
	for (k, row) in table.iter_mut().enumerate() {
		for (n, v) in row.iter_mut().enumerate() {
			*v = (PI / SAMPLE as f64 * (n as f64 + 0.5) * k as f64).cos();
		}
	}
	table
});

/// 64-bit perceptual fingerprint (logically an 8x8 bit grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PerceptualHash(pub u64);

impl PerceptualHash {
	pub const BITS: u32 = 64;

	pub fn of(image: Image) -> Result<Self> {
		let luma = image.resized_luma(SAMPLE as u32, SAMPLE as u32)?;
		Ok(Self::from_luma(&luma))
	}

	/// Hash a 32x32 row-major luma grid.
	fn from_luma(luma: &[u8]) -> Self {
		debug_assert_eq!(luma.len(), SAMPLE * SAMPLE);
		let cos = &*COSINES;

		// Rows first: 32 rows x 8 horizontal frequencies.
		let mut rows = [[0.0f64; GRID]; SAMPLE];
		for (y, out) in rows.iter_mut().enumerate() {
			let line = &luma[y * SAMPLE..(y + 1) * SAMPLE];
			for (k, v) in out.iter_mut().enumerate() {
				*v = line.iter().zip(&cos[k]).map(|(&p, c)| p as f64 * c).sum();
			}
		}

		// Then columns: 8 vertical x 8 horizontal frequencies.
		let mut block = [0.0f64; GRID * GRID];
		for ky in 0..GRID {
			for kx in 0..GRID {
				block[ky * GRID + kx] = (0..SAMPLE).map(|y| rows[y][kx] * cos[ky][y]).sum();
			}
		}

		let median = median(&block);
		let bits = block
			.iter()
			.fold(0u64, |acc, &v| (acc << 1) | u64::from(v > median));
		Self(bits)
	}

	/// The 64 bits as 0/1 bytes, row-major over the 8x8 grid.
	pub fn bits(&self) -> [u8; 64] {
		let mut out = [0u8; 64];
		for (i, bit) in out.iter_mut().enumerate() {
			*bit = ((self.0 >> (63 - i)) & 1) as u8;
		}
		out
	}

	#[inline]
	pub fn distance(&self, other: &Self) -> u32 {
		(self.0 ^ other.0).count_ones()
	}

	/// `1 - hamming / 64`.
	#[inline]
	pub fn confidence(&self, other: &Self) -> f32 {
		confidence_from_distance(self.distance(other))
	}
}

#[inline]
pub(crate) fn confidence_from_distance(distance: u32) -> f32 {
	1.0 - distance as f32 / PerceptualHash::BITS as f32
}

fn median(values: &[f64]) -> f64 {
	let mut sorted = values.to_vec();
	sorted.sort_by(f64::total_cmp);
	let mid = sorted.len() / 2;
	if sorted.len() % 2 == 0 {
		(sorted[mid - 1] + sorted[mid]) / 2.0
	} else {
		sorted[mid]
	}
}

impl fmt::Display for PerceptualHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:016x}", self.0)
	}
}

impl FromStr for PerceptualHash {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let s = s.trim();
		if s.is_empty() || s.len() > 16 {
			return Err(Error::InvalidHash(s.to_string()));
		}
		u64::from_str_radix(s, 16)
			.map(Self)
			.map_err(|_| Error::InvalidHash(s.to_string()))
	}
}
