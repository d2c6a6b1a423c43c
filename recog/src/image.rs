//! Image primitives and utilities.
//!
//! Screenshots and template art are decoded once into a lightweight owned RGB
//! image (`OwnedImage`). Card slots are cropped as borrowed views (`Image<'a>`)
//! so the per-region matching path never copies the full screenshot.
//!
//! Resizing goes through `fast_image_resize`; the matcher only ever shrinks
//! crops to a small fixed size, so a convolution filter is used throughout.

use std::path::Path;

use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};

use crate::{Error, Result};

/// Owned RGB image (no alpha).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
	width: u32,
	height: u32,
	data: Vec<Color>,
}

impl OwnedImage {
	/// Build an `OwnedImage` from tightly packed RGB bytes.
	pub fn from_rgb(width: u32, height: u32, bytes: &[u8]) -> Self {
		let data = bytes
			.chunks_exact(3)
			.map(|v| Color::new(v[0], v[1], v[2]))
			.collect::<Vec<_>>();
		debug_assert_eq!(data.len(), (width * height) as usize);

		Self { width, height, data }
	}

	/// A `width`x`height` image filled with one color.
	pub fn filled(width: u32, height: u32, color: Color) -> Self {
		Self {
			width,
			height,
			data: vec![color; (width * height) as usize],
		}
	}

	pub fn from_dynamic(img: &image::DynamicImage) -> Self {
		let rgb = img.to_rgb8();
		let (width, height) = rgb.dimensions();
		Self::from_rgb(width, height, rgb.as_raw())
	}

	/// Decode an image file. RGBA and grayscale inputs are flattened to RGB.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let img = image::open(path).map_err(|source| Error::Decode {
			path: path.to_path_buf(),
			source,
		})?;
		Ok(Self::from_dynamic(&img))
	}

	#[inline(always)]
	pub fn width(&self) -> u32 {
		self.width
	}

	#[inline(always)]
	pub fn height(&self) -> u32 {
		self.height
	}

	/// Copy `src` into this image with its top-left corner at (`x`, `y`).
	///
	/// Pixels falling outside this image are dropped.
	pub fn paste(&mut self, src: Image, x: u32, y: u32) {
		for sy in 0..src.height() {
			let ty = y + sy;
			if ty >= self.height {
				break;
			}
			for sx in 0..src.width() {
				let tx = x + sx;
				if tx >= self.width {
					break;
				}
				self.data[(tx + ty * self.width) as usize] = *src.pixel(src.x1 + sx, src.y1 + sy);
			}
		}
	}

	/// Create a borrowed view of this entire image.
	pub fn as_image<'a>(&'a self) -> Image<'a> {
		Image {
			x1: 0,
			y1: 0,
			x2: self.width,
			y2: self.height,
			true_width: self.width,
			data: &self.data,
		}
	}
}

// ----------

/// Borrowed image view into an `OwnedImage`.
#[derive(Clone, Copy)]
pub struct Image<'a> {
	x1: u32,
	y1: u32,
	x2: u32,
	y2: u32,
	true_width: u32,
	data: &'a [Color],
}

impl<'a> Image<'a> {
	#[inline(always)]
	pub fn width(&self) -> u32 {
		self.x2 - self.x1
	}

	#[inline(always)]
	pub fn height(&self) -> u32 {
		self.y2 - self.y1
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.width() == 0 || self.height() == 0
	}

	#[inline(always)]
	fn pixel(&self, x: u32, y: u32) -> &Color {
		&self.data[(x + y * self.true_width) as usize]
	}

	pub fn to_owned_image(self) -> OwnedImage {
		let mut data = Vec::with_capacity((self.width() * self.height()) as usize);
		for y in self.y1..self.y2 {
			for x in self.x1..self.x2 {
				data.push(*self.pixel(x, y));
			}
		}

		OwnedImage {
			width: self.width(),
			height: self.height(),
			data,
		}
	}

	pub fn get_bytes(&self) -> Vec<u8> {
		let mut bytes = vec![0; (self.width() * self.height() * 3) as usize];
		let mut i = 0;
		for y in self.y1..self.y2 {
			for x in self.x1..self.x2 {
				let clr = self.pixel(x, y);
				bytes[i] = clr.r;
				bytes[i + 1] = clr.g;
				bytes[i + 2] = clr.b;
				i += 3;
			}
		}
		bytes
	}

	/// One luma byte per pixel, row-major.
	pub fn get_luma_bytes(&self) -> Vec<u8> {
		let mut bytes = Vec::with_capacity((self.width() * self.height()) as usize);
		for y in self.y1..self.y2 {
			for x in self.x1..self.x2 {
				bytes.push(self.pixel(x, y).luma());
			}
		}
		bytes
	}

	/// Create an arbitrary subimage (relative coordinates), clipped to this view.
	pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
		let x = x.min(self.width());
		let y = y.min(self.height());
		let width = width.min(self.width() - x);
		let height = height.min(self.height() - y);

		Self {
			x1: self.x1 + x,
			y1: self.y1 + y,
			x2: self.x1 + x + width,
			y2: self.y1 + y + height,
			true_width: self.true_width,
			data: self.data,
		}
	}

	/// Mean grayscale brightness on a 0-255 scale. Empty views read as black.
	pub fn average_luma(&self) -> f32 {
		if self.is_empty() {
			return 0.0;
		}

		let mut sum = 0.0f64;
		for y in self.y1..self.y2 {
			for x in self.x1..self.x2 {
				sum += self.pixel(x, y).luma_f32() as f64;
			}
		}
		(sum / (self.width() * self.height()) as f64) as f32
	}

	/// Resize to exactly `width`x`height` RGB, ignoring aspect ratio.
	pub fn resized(&self, width: u32, height: u32) -> Result<OwnedImage> {
		let bytes = resize_bytes(self.get_bytes(), self.width(), self.height(), width, height, PixelType::U8x3)?;
		Ok(OwnedImage::from_rgb(width, height, &bytes))
	}

	/// Resize to exactly `width`x`height` and return one luma byte per pixel.
	pub fn resized_luma(&self, width: u32, height: u32) -> Result<Vec<u8>> {
		resize_bytes(self.get_luma_bytes(), self.width(), self.height(), width, height, PixelType::U8)
	}
}

fn resize_bytes(
	src: Vec<u8>,
	src_width: u32,
	src_height: u32,
	width: u32,
	height: u32,
	pixel_type: PixelType,
) -> Result<Vec<u8>> {
	if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
		return Err(Error::EmptyImage {
			width: src_width.min(width),
			height: src_height.min(height),
		});
	}

	let src = fast_image_resize::images::Image::from_vec_u8(src_width, src_height, src, pixel_type)?;
	if src_width == width && src_height == height {
		return Ok(src.into_vec());
	}

	let mut dst = fast_image_resize::images::Image::new(width, height, pixel_type);
	let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
	Resizer::new().resize(&src, &mut dst, &options)?;
	Ok(dst.into_vec())
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Color {
	pub const WHITE: Self = Self::new(255, 255, 255);
	pub const BLACK: Self = Self::new(0, 0, 0);

	#[inline]
	pub const fn new(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b }
	}

	/// Compute luma (grayscale intensity).
	pub fn luma(&self) -> u8 {
		let r = self.r as u32;
		let g = self.g as u32;
		let b = self.b as u32;
		((299 * r + 587 * g + 114 * b) / 1000) as u8
	}

	pub fn luma_f32(&self) -> f32 {
		0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32
	}
}
