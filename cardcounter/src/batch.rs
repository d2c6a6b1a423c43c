//! Batch processing of a screenshot directory.

use std::{
	path::{Path, PathBuf},
	sync::{
		LazyLock,
		atomic::{AtomicUsize, Ordering},
	},
};

use anyhow::{Context, Result};
use rayon::prelude::*;
use recog::{DetectedCard, Recognizer};
use serde::Serialize;

pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "bmp", "gif"];

/// Captures smaller than this are blank and not worth decoding.
pub const BLANK_FILE_BYTES: u64 = 1024;

const PROGRESS_EVERY: usize = 5;

/// `<timestamp>_<id>_<Pack_Name>`
static PACK_FILE_NAME: LazyLock<Option<regex::Regex>> =
	LazyLock::new(|| regex::Regex::new(r"^\d{12,}_[^_]*_(?<pack>.+)$").ok());

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
	pub file_name: String,
	pub pack_type: String,
	pub set_name: String,
	pub blank: bool,
	pub cards: Vec<DetectedCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
	pub directory: PathBuf,
	pub total_files: usize,
	pub with_results: usize,
	pub without_results: usize,
	pub files: Vec<FileReport>,
}

/// Screenshot files directly inside `dir`, sorted by name.
pub fn scan(dir: &Path) -> Result<Vec<PathBuf>> {
	let entries = std::fs::read_dir(dir).with_context(|| format!("Read screenshot directory {}", dir.display()))?;
	let mut files = entries
		.flatten()
		.map(|e| e.path())
		.filter(|p| p.is_file() && has_image_extension(p))
		.collect::<Vec<_>>();
	files.sort();
	Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
	path.extension()
		.and_then(|e| e.to_str())
		.is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Pack name encoded in a screenshot file name.
///
/// `20251206235802_1_Tradeable_11_packs.png` and `Tradeable_11_packs.png` both
/// give `"Tradeable 11 packs"`.
pub fn pack_type(file_name: &str) -> String {
	let stem = Path::new(file_name)
		.file_stem()
		.and_then(|s| s.to_str())
		.unwrap_or(file_name);
	let name = PACK_FILE_NAME
		.as_ref()
		.and_then(|re| re.captures(stem))
		.and_then(|c| c.name("pack"))
		.map_or(stem, |m| m.as_str());
	name.replace('_', " ").trim().to_string()
}

/// Name of the most frequent set among `cards`; the earliest seen wins ties.
pub fn dominant_set(cards: &[DetectedCard]) -> String {
	let mut counts: Vec<(&str, usize)> = Vec::new();
	for card in cards {
		match counts.iter_mut().find(|(set, _)| *set == card.set_id) {
			Some((_, n)) => *n += 1,
			None => counts.push((card.set_id.as_str(), 1)),
		}
	}

	counts
		.into_iter()
		.fold(None, |best: Option<(&str, usize)>, (set, n)| match best {
			Some((_, m)) if m >= n => best,
			_ => Some((set, n)),
		})
		.map_or_else(|| "Unknown".to_string(), |(set, _)| data::set_name(set).to_string())
}

pub fn process_file(recognizer: &Recognizer, path: &Path) -> FileReport {
	let file_name = path
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_default();

	let size = std::fs::metadata(path).map(|m| m.len()).ok();
	let blank = size.is_some_and(|size| size < BLANK_FILE_BYTES);
	let cards = if blank {
		tracing::info!(file = %file_name, size = ?size, "blank image; skipping");
		vec![]
	} else {
		recognizer.process_screenshot(path)
	};
	if !blank && cards.is_empty() {
		tracing::info!(file = %file_name, "no cards detected");
	}

	FileReport {
		pack_type: pack_type(&file_name),
		set_name: dominant_set(&cards),
		file_name,
		blank,
		cards,
	}
}

/// Process every file on a pool of `workers` threads. Reports keep the input order.
pub fn run(recognizer: &Recognizer, dir: &Path, files: &[PathBuf], workers: usize) -> Result<BatchReport> {
	let pool = rayon::ThreadPoolBuilder::new()
		.num_threads(workers)
		.thread_name(|i| format!("cardcounter-{i}"))
		.build()
		.context("Build worker pool")?;
	tracing::info!(files = files.len(), workers, "processing screenshots");

	let total = files.len();
	let done = AtomicUsize::new(0);
	let reports = pool.install(|| {
		files
			.par_iter()
			.map(|path| {
				let report = process_file(recognizer, path);
				let n = done.fetch_add(1, Ordering::Relaxed) + 1;
				if n % PROGRESS_EVERY == 0 || n == total {
					tracing::info!("processed {n} of {total} images");
				}
				report
			})
			.collect::<Vec<_>>()
	});

	let with_results = reports.iter().filter(|r| !r.cards.is_empty()).count();
	tracing::info!(total, with_results, "successfully processed {total} screenshots ({with_results} with results)");

	Ok(BatchReport {
		directory: dir.to_path_buf(),
		total_files: total,
		with_results,
		without_results: total - with_results,
		files: reports,
	})
}
