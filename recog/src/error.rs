use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The template root held no readable card images.
	#[error("no card templates found under {}", root.display())]
	NoTemplates { root: PathBuf },

	#[error("cannot read template directory {}", root.display())]
	TemplateDir {
		root: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("cannot decode image {}", path.display())]
	Decode {
		path: PathBuf,
		#[source]
		source: image::ImageError,
	},

	#[error("image has no pixels ({width}x{height})")]
	EmptyImage { width: u32, height: u32 },

	#[error("resize failed")]
	Resize(#[from] fast_image_resize::ResizeError),

	#[error("invalid image buffer")]
	Buffer(#[from] fast_image_resize::ImageBufferError),

	/// Stage-2 feature vector length does not match a set matrix.
	#[error("feature length mismatch: expected {expected}, found {found}")]
	FeatureShape { expected: usize, found: usize },

	#[error("invalid perceptual hash {0:?}")]
	InvalidHash(String),
}
